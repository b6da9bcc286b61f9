//! 定时器事件定义
//! Timer Event Definitions
//!
//! 该模块定义了定时器每次触发时投递给事件接收端的数据。
//!
//! This module defines the payload posted to the event sink on every tick.

use std::fmt;

/// 事件类型
/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 周期定时器的一次触发
    /// One firing of a periodic timer
    TimerTick,
}

/// 定时器事件
/// Timer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerEvent {
    /// 事件类型
    /// Event kind
    pub kind: EventKind,
    /// 产生该事件的槽位索引
    /// Index of the slot that produced the event
    pub index: usize,
    /// 本次运行中的触发次数，从 1 开始
    /// Tick number within the current run, starting at 1
    pub count: u64,
}

impl TimerEvent {
    /// 创建新的触发事件
    /// Create a new tick event
    pub fn tick(index: usize, count: u64) -> Self {
        Self {
            kind: EventKind::TimerTick,
            index,
            count,
        }
    }
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimerEvent(kind: {:?}, index: {}, count: {})",
            self.kind, self.index, self.count
        )
    }
}
