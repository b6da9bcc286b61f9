//! 测试辅助工具模块
//! Test utilities module

#![cfg(test)]

use crate::timer::{EventSink, SinkError, TimerEvent};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tick_pool=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// A sink that records every event together with the instant it arrived.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<(TimerEvent, Instant)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick counts received for `index`, in arrival order.
    pub fn counts_for(&self, index: usize) -> Vec<u64> {
        self.stamps_for(index).into_iter().map(|(count, _)| count).collect()
    }

    pub fn stamps_for(&self, index: usize) -> Vec<(u64, Instant)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event, _)| event.index == index)
            .map(|(event, at)| (event.count, *at))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Polls until `index` has received at least `count` ticks or `timeout` passes.
    pub fn wait_for_ticks(&self, index: usize, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.counts_for(index).len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

impl EventSink for RecordingSink {
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push((event, Instant::now()));
        Ok(())
    }
}
