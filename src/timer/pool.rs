//! 定时器池
//! Timer pool
//!
//! 固定大小、按整数索引寻址的定时器注册表。所有槽位在创建时预分配并处于停止状态，
//! 每个槽位任何时刻最多只有一个活跃的执行上下文。
//!
//! A fixed-size registry of timers addressed by integer index. All slots are
//! pre-allocated in the stopped state, and every slot has at most one active
//! execution context at any time.

use super::{
    schedule::{TimerCount, period_from_secs},
    sink::EventSink,
    slot::Slot,
};
use crate::{
    config::PoolConfig,
    error::{Result, TimerError},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, trace, warn};

/// 槽位对外可见的状态
/// Pool-visible state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    Stopped,
    Running,
}

/// 启动请求的结果
/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// 新的运行已经开始
    /// A new run has begun
    Started,
    /// 槽位已在运行，请求没有任何效果
    /// The slot was already running; the request had no effect
    AlreadyRunning,
}

/// 停止请求的结果
/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

/// 槽位快照
/// Slot snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerStatus {
    pub index: usize,
    pub state: TimerState,
    /// 成功启动的次数（创建执行上下文失败的启动不计入）
    /// Number of successful starts (a start whose context failed to spawn is
    /// not counted)
    pub generation: u64,
    /// 最近一次运行已完成的触发次数
    /// Ticks completed by the most recent run
    pub current_count: u64,
    /// 最近一次运行的目标次数，从未启动时为 `None`
    /// Target of the most recent run, `None` if never started
    pub target: Option<TimerCount>,
    pub period_nanos: Option<u64>,
}

/// 定时器池
/// Timer pool
pub struct TimerPool {
    slots: Box<[Arc<Slot>]>,
    sink: Arc<dyn EventSink>,
    config: PoolConfig,
}

impl TimerPool {
    /// 创建定时器池，所有槽位处于停止状态
    /// Create a timer pool with every slot stopped
    pub fn new<S: EventSink>(sink: S, config: PoolConfig) -> Self {
        let slots = (0..config.capacity)
            .map(|index| Arc::new(Slot::new(index)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        debug!(capacity = config.capacity, "Timer pool initialized");
        Self {
            slots,
            sink: Arc::new(sink),
            config,
        }
    }

    /// 使用默认配置创建定时器池
    /// Create a timer pool with the default configuration
    pub fn with_sink<S: EventSink>(sink: S) -> Self {
        Self::new(sink, PoolConfig::default())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn slot(&self, index: i64, operation: &'static str) -> Result<&Arc<Slot>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.slots.get(i))
            .ok_or_else(|| {
                warn!(
                    index,
                    capacity = self.slots.len(),
                    operation,
                    "Invalid timer index"
                );
                TimerError::InvalidIndex {
                    index,
                    capacity: self.slots.len(),
                }
            })
    }

    /// 以 `period_secs` 为周期启动槽位 `index` 上的定时器，`count` 为负数表示无限次
    /// Start the timer in slot `index` with period `period_secs`; a negative
    /// `count` runs forever
    ///
    /// 槽位已在运行时返回 [`StartOutcome::AlreadyRunning`]，不会重启或修改参数。
    /// 执行上下文无法创建时返回 [`TimerError::Spawn`]，槽位保持停止。
    ///
    /// A running slot yields [`StartOutcome::AlreadyRunning`] and is neither
    /// restarted nor reconfigured. If the execution context cannot be created
    /// [`TimerError::Spawn`] is returned and the slot stays stopped.
    pub fn start(&self, index: i64, period_secs: f64, count: i64) -> Result<StartOutcome> {
        let slot = self.slot(index, "start")?;
        let period_nanos = period_from_secs(period_secs).inspect_err(|_| {
            warn!(index, period_secs, "Invalid timer period");
        })?;
        slot.start(
            period_nanos,
            TimerCount::from_raw(count),
            &self.sink,
            &self.config,
        )
    }

    /// 停止槽位 `index` 上的定时器
    /// Stop the timer in slot `index`
    ///
    /// 从其他线程调用时，返回前执行上下文已经退出，此后不会再有该次运行的事件。
    ///
    /// When called from any other thread the execution context has exited by
    /// the time this returns, and no further event of that run is posted.
    pub fn stop(&self, index: i64) -> Result<StopOutcome> {
        let outcome = self.slot(index, "stop")?.stop()?;
        if outcome == StopOutcome::AlreadyStopped {
            trace!(index, "Timer already stopped, stop ignored");
        }
        Ok(outcome)
    }

    /// 阻塞直到槽位 `index` 当前运行的执行线程退出（自然完成或被停止）
    /// Block until the execution thread of the current run of slot `index`
    /// has exited (completed or stopped)
    pub fn wait(&self, index: i64) -> Result<()> {
        self.slot(index, "wait")?.wait()
    }

    /// 与 [`wait`](Self::wait) 相同，但最多等待 `timeout`；超时返回 `Ok(false)`
    /// Like [`wait`](Self::wait) but bounded by `timeout`; returns `Ok(false)`
    /// if the timer is still running at the deadline
    pub fn wait_timeout(&self, index: i64, timeout: Duration) -> Result<bool> {
        self.slot(index, "wait_timeout")?.wait_timeout(timeout)
    }

    pub fn status(&self, index: i64) -> Result<TimerStatus> {
        Ok(self.slot(index, "status")?.status())
    }

    pub fn is_running(&self, index: i64) -> Result<bool> {
        Ok(self.slot(index, "is_running")?.state() == TimerState::Running)
    }

    pub fn running_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state() == TimerState::Running)
            .count()
    }

    /// 停止所有运行中的定时器，池之后仍可使用
    /// Stop every running timer; the pool stays usable afterwards
    ///
    /// 返回遇到的第一个错误，但会尝试停止所有槽位。
    /// Returns the first error encountered, but attempts every slot.
    pub fn shutdown(&self) -> Result<()> {
        let mut first_error = None;
        let mut stopped = 0usize;
        for slot in self.slots.iter() {
            match slot.stop() {
                Ok(StopOutcome::Stopped) => stopped += 1,
                Ok(StopOutcome::AlreadyStopped) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        info!(stopped, "Timer pool shutdown completed");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for TimerPool {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            slot.abandon();
        }
    }
}

impl std::fmt::Debug for TimerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerPool")
            .field("capacity", &self.slots.len())
            .field("running", &self.running_count())
            .field("config", &self.config)
            .finish()
    }
}
