//! tests/common/harness.rs
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};
use tick_pool::{EventSink, SinkError, TimerEvent};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "tick_pool=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Records every tick with its arrival time on the monotonic clock.
#[derive(Debug, Clone, Default)]
pub struct StampingSink {
    events: Arc<Mutex<Vec<(TimerEvent, Instant)>>>,
}

impl StampingSink {
    pub fn stamps_for(&self, index: usize) -> Vec<(u64, Instant)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event, _)| event.index == index)
            .map(|(event, at)| (event.count, *at))
            .collect()
    }

    pub fn indices_in_order(&self) -> Vec<usize> {
        self.events.lock().unwrap().iter().map(|(e, _)| e.index).collect()
    }
}

impl EventSink for StampingSink {
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push((event, Instant::now()));
        Ok(())
    }
}

/// Largest lateness of tick `k` relative to `first + (k - 1) * period`.
///
/// Ticks never fire early, so lateness is the signed error clamped at zero.
pub fn max_lateness(stamps: &[(u64, Instant)], period: Duration) -> Duration {
    let Some(&(_, first)) = stamps.first() else {
        return Duration::ZERO;
    };
    stamps
        .iter()
        .map(|&(count, at)| {
            let scheduled = first + period * (count as u32 - 1);
            at.saturating_duration_since(scheduled)
        })
        .max()
        .unwrap_or(Duration::ZERO)
}
