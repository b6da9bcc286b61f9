//! 定时器执行循环
//! Timer execution loop
//!
//! 每个运行中的定时器在独立的操作系统线程上执行，线程内持有一个单线程 tokio
//! 运行时。循环只在绝对截止时间处挂起，取消令牌在同一挂起点被检查。
//!
//! Each running timer executes on a dedicated OS thread that owns a
//! current-thread tokio runtime. The loop suspends only at the absolute
//! deadline, and the cancellation token is raised at that same suspension
//! point.

use super::{
    event::TimerEvent,
    priority,
    schedule::{Schedule, TimerCount},
    sink::EventSink,
    slot::Slot,
};
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
        mpsc as std_mpsc,
    },
    thread::{self, JoinHandle},
};
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// 一次运行的全部参数
/// All parameters of a single run
pub(crate) struct TimerRun {
    pub index: usize,
    pub generation: u64,
    pub period_nanos: u64,
    pub target: TimerCount,
    /// 只由执行线程写入
    /// Written only by the execution thread
    pub progress: Arc<AtomicU64>,
    pub cancel: CancellationToken,
    pub sink: Arc<dyn EventSink>,
    pub realtime_priority: bool,
}

/// 执行循环的终止方式
/// How the execution loop terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed { ticks: u64 },
    Cancelled { ticks: u64 },
}

/// 线程参数
/// Thread parameters
pub(crate) struct ThreadOptions<'a> {
    pub name_prefix: &'a str,
    pub stack_size: Option<usize>,
}

/// 为一次运行启动执行线程，并等待线程完成初始化
/// Spawn the execution thread for a run and wait until it finished setting up
///
/// 返回时线程已经拥有可用的运行时；任何初始化失败都会作为错误返回。
/// On return the thread owns a working runtime; any setup failure is returned
/// as an error.
pub(crate) fn spawn(
    slot: Arc<Slot>,
    run: TimerRun,
    options: ThreadOptions<'_>,
) -> io::Result<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(format!("{}-{}", options.name_prefix, run.index));
    if let Some(size) = options.stack_size {
        builder = builder.stack_size(size);
    }

    let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
    let handle = builder.spawn(move || thread_main(slot, run, ready_tx))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(io::Error::other("timer thread exited during startup")),
    }
}

/// 无论正常结束还是 panic，都把槽位交还给池
/// Hands the slot back to the pool on normal exit as well as on panic
struct CompletionGuard {
    slot: Arc<Slot>,
    generation: u64,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.slot.finish(self.generation);
    }
}

fn thread_main(slot: Arc<Slot>, run: TimerRun, ready_tx: std_mpsc::SyncSender<io::Result<()>>) {
    slot.enter_context();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    if run.realtime_priority {
        match priority::elevate_current_thread() {
            Ok(priority) => debug!(index = run.index, priority, "Timer thread running at real-time priority"),
            Err(err) => warn!(
                index = run.index,
                error = %err,
                "Failed to elevate timer thread priority, running at default priority"
            ),
        }
    }

    if ready_tx.send(Ok(())).is_err() {
        return;
    }
    // 握手成功后槽位才登记了本线程
    // The slot only registers this thread once the handshake succeeded
    let _guard = CompletionGuard {
        slot,
        generation: run.generation,
    };

    let outcome = runtime.block_on(tick_loop(&run));
    drop(runtime);
    match outcome {
        RunOutcome::Completed { ticks } => {
            debug!(index = run.index, generation = run.generation, ticks, "Timer completed")
        }
        RunOutcome::Cancelled { ticks } => {
            debug!(index = run.index, generation = run.generation, ticks, "Timer cancelled")
        }
    }
}

/// 触发循环：计数、投递、推进截止时间、挂起到截止时间
/// Tick loop: count, post, advance the deadline, suspend until the deadline
async fn tick_loop(run: &TimerRun) -> RunOutcome {
    let mut schedule = Schedule::start_now(run.period_nanos);
    let mut ticks = 0u64;

    while !run.target.is_exhausted(ticks) {
        if run.cancel.is_cancelled() {
            return RunOutcome::Cancelled { ticks };
        }

        ticks += 1;
        run.progress.store(ticks, Ordering::Release);
        match run.sink.post_event(TimerEvent::tick(run.index, ticks)) {
            Ok(()) => trace!(index = run.index, count = ticks, "Timer tick posted"),
            Err(err) => warn!(
                index = run.index,
                count = ticks,
                error = %err,
                "Failed to post timer tick"
            ),
        }

        let Some(deadline) = schedule.advance() else {
            warn!(
                index = run.index,
                period_ns = run.period_nanos,
                "Timer deadline is no longer representable, parking until stopped"
            );
            run.cancel.cancelled().await;
            return RunOutcome::Cancelled { ticks };
        };

        tokio::select! {
            biased;
            _ = run.cancel.cancelled() => return RunOutcome::Cancelled { ticks },
            _ = sleep_until(deadline) => {}
        }
    }

    RunOutcome::Completed { ticks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::sink::ChannelSink;
    use std::time::Duration;

    fn test_run(period: Duration, target: TimerCount, sink: Arc<dyn EventSink>) -> TimerRun {
        TimerRun {
            index: 7,
            generation: 1,
            period_nanos: period.as_nanos() as u64,
            target,
            progress: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
            sink,
            realtime_priority: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finite_loop_posts_every_tick_in_order() {
        let (sink, mut rx) = ChannelSink::unbounded();
        let run = test_run(Duration::from_millis(10), TimerCount::Finite(5), Arc::new(sink));

        let outcome = tick_loop(&run).await;
        assert_eq!(outcome, RunOutcome::Completed { ticks: 5 });
        assert_eq!(run.progress.load(Ordering::Acquire), 5);

        for expected in 1..=5 {
            let event = rx.try_recv().unwrap();
            assert_eq!(event, TimerEvent::tick(7, expected));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_completes_without_ticks() {
        let (sink, mut rx) = ChannelSink::unbounded();
        let run = test_run(Duration::from_millis(10), TimerCount::Finite(0), Arc::new(sink));
        assert_eq!(tick_loop(&run).await, RunOutcome::Completed { ticks: 0 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_the_schedule_not_the_wake_time() {
        let (sink, mut rx) = ChannelSink::unbounded();
        let period = Duration::from_millis(20);
        let run = test_run(period, TimerCount::Finite(50), Arc::new(sink));
        let start = tokio::time::Instant::now();

        let loop_task = tick_loop(&run);
        tokio::pin!(loop_task);
        let consumer = async {
            let mut stamps = Vec::new();
            while let Some(event) = rx.recv().await {
                stamps.push((event.count, tokio::time::Instant::now()));
                if event.count == 50 {
                    break;
                }
            }
            stamps
        };
        let (outcome, stamps) = tokio::join!(loop_task, consumer);
        assert_eq!(outcome, RunOutcome::Completed { ticks: 50 });

        // 第 k 次触发发生在 start + (k-1)*P，误差不随 k 增长
        for (count, at) in stamps {
            let expected = start + period * (count as u32 - 1);
            let error = at.saturating_duration_since(expected);
            assert!(error <= Duration::from_millis(2), "tick {} drifted by {:?}", count, error);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_the_suspended_wait() {
        let (sink, mut rx) = ChannelSink::unbounded();
        let run = test_run(Duration::from_secs(3600), TimerCount::Infinite, Arc::new(sink));
        let cancel = run.cancel.clone();

        let canceller = async {
            // 第一次触发立即发生，然后在一小时的等待中被取消
            let first = rx.recv().await.unwrap();
            cancel.cancel();
            first
        };
        let (outcome, first) = tokio::join!(tick_loop(&run), canceller);
        assert_eq!(first.count, 1);
        assert_eq!(outcome, RunOutcome::Cancelled { ticks: 1 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_does_not_stop_the_timer() {
        let (sink, rx) = ChannelSink::unbounded();
        drop(rx);
        let run = test_run(Duration::from_millis(1), TimerCount::Finite(3), Arc::new(sink));
        assert_eq!(tick_loop(&run).await, RunOutcome::Completed { ticks: 3 });
    }
}
