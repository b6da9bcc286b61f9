//! 定时器池槽位
//! Timer pool slot
//!
//! 每个槽位有两把锁：`control` 串行化同一槽位上的 start/stop（包括等待旧线程退出），
//! `inner` 保护状态标志、代数和运行句柄，只会被短暂持有。执行线程自己的计数器
//! 不在锁内，池只通过原子变量读取。
//!
//! Each slot has two locks: `control` serializes start/stop on the slot
//! (including joining the previous thread), and `inner` guards the state flag,
//! generation and run handle and is only ever held briefly. The execution
//! thread's own counter lives outside the locks; the pool only reads it through
//! an atomic.

use super::{
    pool::{StartOutcome, StopOutcome, TimerState, TimerStatus},
    runner::{self, ThreadOptions, TimerRun},
    schedule::TimerCount,
    sink::EventSink,
};
use crate::{
    config::PoolConfig,
    error::{Result, TimerError},
};
use std::{
    cell::Cell,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError,
        atomic::{AtomicU64, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

thread_local! {
    /// 当前线程所服务的槽位地址（0 表示不是定时器线程）
    /// Address of the slot the current thread serves (0 for non-timer threads)
    static CURRENT_SLOT: Cell<usize> = const { Cell::new(0) };
}

/// 槽位内的锁在任何用户回调运行前都已处于一致状态，因此可以忽略中毒
/// Slot state is consistent before any user callback runs, so poisoning is
/// safe to ignore
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 当前运行的句柄
/// Handle of the active run
struct ActiveRun {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
}

/// 最近一次运行的参数
/// Parameters of the most recent run
#[derive(Clone)]
struct RunInfo {
    period_nanos: u64,
    target: TimerCount,
    progress: Arc<AtomicU64>,
}

struct SlotInner {
    state: TimerState,
    generation: u64,
    active: Option<ActiveRun>,
    last_run: Option<RunInfo>,
    /// 执行线程尚未退出的运行代数
    /// Generations whose execution thread has not exited yet
    live: Vec<u64>,
}

pub(crate) struct Slot {
    index: usize,
    control: Mutex<()>,
    inner: Mutex<SlotInner>,
    finished: Condvar,
}

impl Slot {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            control: Mutex::new(()),
            inner: Mutex::new(SlotInner {
                state: TimerState::Stopped,
                generation: 0,
                active: None,
                last_run: None,
                live: Vec::new(),
            }),
            finished: Condvar::new(),
        }
    }

    fn address(&self) -> usize {
        self as *const Slot as usize
    }

    /// 将当前线程标记为该槽位的执行线程
    /// Mark the current thread as this slot's execution thread
    pub(crate) fn enter_context(&self) {
        CURRENT_SLOT.with(|current| current.set(self.address()));
    }

    /// 当前线程是否是该槽位（任意一代）的执行线程
    /// Whether the current thread is an execution thread of this slot (any
    /// generation)
    pub(crate) fn is_current_context(&self) -> bool {
        CURRENT_SLOT.with(|current| current.get()) == self.address()
    }

    pub(crate) fn state(&self) -> TimerState {
        lock(&self.inner).state
    }

    pub(crate) fn start(
        self: &Arc<Self>,
        period_nanos: u64,
        target: TimerCount,
        sink: &Arc<dyn EventSink>,
        config: &PoolConfig,
    ) -> Result<StartOutcome> {
        let _control = if self.is_current_context() {
            // 另一个调用者可能正在等待本线程退出
            // Another caller may be joining this very thread
            match self.control.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    return Err(TimerError::Busy { index: self.index });
                }
            }
        } else {
            lock(&self.control)
        };

        let mut inner = lock(&self.inner);
        if inner.state == TimerState::Running {
            debug!(index = self.index, "Timer already running, start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        }

        inner.generation += 1;
        let generation = inner.generation;
        let progress = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();
        let run = TimerRun {
            index: self.index,
            generation,
            period_nanos,
            target,
            progress: progress.clone(),
            cancel: cancel.clone(),
            sink: sink.clone(),
            realtime_priority: config.realtime_priority,
        };
        let options = ThreadOptions {
            name_prefix: &config.thread_name_prefix,
            stack_size: config.thread_stack_size,
        };

        // 持有 inner 直到运行句柄就位，结束的线程只能在之后看到它
        // inner stays locked until the handle is installed, so a finishing
        // thread can only observe it afterwards
        let thread = match runner::spawn(self.clone(), run, options) {
            Ok(thread) => thread,
            Err(source) => {
                // 失败的线程从未接触槽位，代数可以回退
                // A failed thread never touches the slot, so the generation can roll back
                inner.generation -= 1;
                error!(index = self.index, error = %source, "Failed to spawn timer execution context");
                return Err(TimerError::Spawn {
                    index: self.index,
                    source,
                });
            }
        };

        inner.state = TimerState::Running;
        inner.live.push(generation);
        inner.active = Some(ActiveRun { cancel, thread });
        inner.last_run = Some(RunInfo {
            period_nanos,
            target,
            progress,
        });
        info!(
            index = self.index,
            generation,
            period_ns = period_nanos,
            count = ?target,
            "Timer started"
        );
        Ok(StartOutcome::Started)
    }

    /// 标记为停止并取出运行句柄；等待者只在线程真正退出时被唤醒
    /// Mark stopped and take the run handle; waiters are only woken once the
    /// thread has actually exited
    fn retire(&self, inner: &mut SlotInner) -> Option<ActiveRun> {
        inner.state = TimerState::Stopped;
        inner.active.take()
    }

    pub(crate) fn stop(&self) -> Result<StopOutcome> {
        if self.is_current_context() {
            return Ok(self.stop_from_own_context());
        }

        let _control = lock(&self.control);
        let active = {
            let mut inner = lock(&self.inner);
            if inner.state == TimerState::Stopped {
                return Ok(StopOutcome::AlreadyStopped);
            }
            self.retire(&mut inner)
        };

        let Some(active) = active else {
            return Ok(StopOutcome::Stopped);
        };
        active.cancel.cancel();
        // inner 已释放；线程在挂起点立即观察到取消
        // inner is released; the thread observes the cancel at its suspension point
        if active.thread.join().is_err() {
            error!(index = self.index, "Timer execution context panicked");
            return Err(TimerError::Join { index: self.index });
        }
        info!(index = self.index, "Timer stopped");
        Ok(StopOutcome::Stopped)
    }

    /// 从定时器自身线程（例如事件回调中）停止：只取消，不等待自身退出
    /// Stop from the timer's own thread (e.g. inside a sink callback): cancel
    /// only, never join itself
    fn stop_from_own_context(&self) -> StopOutcome {
        let mut inner = lock(&self.inner);
        if inner.state == TimerState::Stopped {
            return StopOutcome::AlreadyStopped;
        }
        if let Some(active) = self.retire(&mut inner) {
            active.cancel.cancel();
        }
        info!(index = self.index, "Timer stopped from its own context");
        StopOutcome::Stopped
    }

    /// 取消但不等待（用于池被丢弃时）
    /// Cancel without joining (used when the pool is dropped)
    pub(crate) fn abandon(&self) {
        let mut inner = lock(&self.inner);
        if inner.state == TimerState::Running {
            if let Some(active) = self.retire(&mut inner) {
                active.cancel.cancel();
            }
        }
    }

    /// 执行线程退出时调用，只有代数匹配时才会修改槽位状态
    /// Called when an execution thread exits; only touches the slot state if
    /// the generation still matches
    pub(crate) fn finish(&self, generation: u64) {
        let mut inner = lock(&self.inner);
        inner.live.retain(|&live| live != generation);
        if inner.generation == generation && inner.state == TimerState::Running {
            // 线程正在退出，丢弃 JoinHandle 即可分离
            // The thread is exiting, dropping the JoinHandle detaches it
            drop(self.retire(&mut inner));
        }
        self.finished.notify_all();
    }

    pub(crate) fn wait(&self) -> Result<()> {
        if self.is_current_context() {
            return Err(TimerError::WaitOnSelf { index: self.index });
        }
        let mut inner = lock(&self.inner);
        let generation = inner.generation;
        while inner.live.contains(&generation) {
            inner = self
                .finished
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }

    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        if self.is_current_context() {
            return Err(TimerError::WaitOnSelf { index: self.index });
        }
        let deadline = Instant::now() + timeout;
        let mut inner = lock(&self.inner);
        let generation = inner.generation;
        while inner.live.contains(&generation) {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            inner = self
                .finished
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(true)
    }

    pub(crate) fn status(&self) -> TimerStatus {
        let inner = lock(&self.inner);
        let last_run = inner.last_run.clone();
        TimerStatus {
            index: self.index,
            state: inner.state,
            generation: inner.generation,
            current_count: last_run
                .as_ref()
                .map_or(0, |run| run.progress.load(Ordering::Acquire)),
            target: last_run.as_ref().map(|run| run.target),
            period_nanos: last_run.as_ref().map(|run| run.period_nanos),
        }
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("state", &self.state())
            .finish()
    }
}

