#![deny(clippy::expect_used, clippy::unwrap_used)]

//! A fixed-capacity pool of drift-free periodic timers.
//! 固定容量的无漂移周期定时器池。
//!
//! Every running timer owns a dedicated thread that fires at an absolute,
//! schedule-derived deadline and posts one [`TimerEvent`] per tick to an
//! [`EventSink`].
//!
//! 每个运行中的定时器拥有一个独立线程，在根据调度计算出的绝对截止时间触发，
//! 并且每次触发向 [`EventSink`] 投递一个 [`TimerEvent`]。

pub mod config;
pub mod error;
pub mod timer;

mod testing;

pub use config::PoolConfig;
pub use error::{Result, TimerError};
pub use timer::{
    global, ChannelSink, ClosureSink, EventKind, EventSink, NoOpSink, PriorityError, SinkError,
    StartOutcome, StopOutcome, TimerCount, TimerEvent, TimerPool, TimerState, TimerStatus,
};
