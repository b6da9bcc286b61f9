//! 周期定时器模块
//! Periodic Timer Module
//!
//! 该模块实现了固定容量的定时器池。每个槽位最多持有一个活跃定时器，
//! 定时器在独立线程上按绝对截止时间触发，避免累积漂移。
//!
//! This module implements the fixed-capacity timer pool. Each slot holds at
//! most one active timer, and timers fire on dedicated threads at absolute
//! deadlines so that scheduling error never accumulates.

pub mod event;
pub mod global;
pub mod pool;
pub mod priority;
pub mod schedule;
pub mod sink;

mod runner;
mod slot;


pub use event::{EventKind, TimerEvent};
pub use pool::{StartOutcome, StopOutcome, TimerPool, TimerState, TimerStatus};
pub use priority::PriorityError;
pub use schedule::{Schedule, TimerCount};
pub use sink::{ChannelSink, ClosureSink, EventSink, NoOpSink, SinkError};
