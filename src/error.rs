//! 定义了定时器池中所有可能的错误类型。
//! Defines all possible error types of the timer pool.

use thiserror::Error;

/// The primary error type for timer pool operations.
/// 定时器池操作的主要错误类型。
#[derive(Debug, Error)]
pub enum TimerError {
    /// The slot index lies outside `[0, capacity)`.
    /// 槽位索引不在 `[0, capacity)` 范围内。
    #[error("invalid timer index {index}, the pool holds {capacity} timers")]
    InvalidIndex { index: i64, capacity: usize },

    /// The requested period is not finite, is negative, or truncates to zero
    /// nanoseconds.
    /// 请求的周期不是有限值、为负数，或截断后为零纳秒。
    #[error("invalid timer period: {seconds} seconds")]
    InvalidPeriod { seconds: f64 },

    /// The execution context for a timer could not be created, e.g. the
    /// system thread limit was reached. The slot stays stopped.
    ///
    /// 无法为定时器创建执行上下文（例如达到系统线程上限）。槽位保持停止状态。
    #[error("failed to spawn execution context for timer {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    /// The cancelled execution context terminated by panicking.
    /// 被取消的执行上下文因 panic 而终止。
    #[error("execution context of timer {index} panicked")]
    Join { index: usize },

    /// A start request from the timer's own execution context raced with a
    /// concurrent start/stop of the same slot.
    /// 来自定时器自身执行上下文的启动请求与同一槽位的并发启动/停止发生竞争。
    #[error("timer {index} is busy with a concurrent start or stop")]
    Busy { index: usize },

    /// `wait` was called from the timer's own execution context.
    /// 在定时器自身的执行上下文中调用了 `wait`。
    #[error("timer {index} cannot wait on itself")]
    WaitOnSelf { index: usize },

    /// The process-global pool has already been initialized.
    /// 全局定时器池已经初始化。
    #[error("global timer pool is already initialized")]
    AlreadyInitialized,

    /// The process-global pool has not been initialized yet.
    /// 全局定时器池尚未初始化。
    #[error("global timer pool is not initialized")]
    NotInitialized,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, TimerError>;

impl From<TimerError> for std::io::Error {
    fn from(err: TimerError) -> Self {
        use std::io::ErrorKind;
        match err {
            TimerError::Spawn { source, .. } => source,
            TimerError::InvalidIndex { .. } | TimerError::InvalidPeriod { .. } => {
                std::io::Error::new(ErrorKind::InvalidInput, err)
            }
            TimerError::WaitOnSelf { .. } => std::io::Error::new(ErrorKind::Deadlock, err),
            TimerError::Join { .. }
            | TimerError::Busy { .. }
            | TimerError::AlreadyInitialized
            | TimerError::NotInitialized => std::io::Error::other(err),
        }
    }
}
