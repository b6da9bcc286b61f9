//! 无漂移调度计算
//! Drift-free schedule arithmetic
//!
//! 所有时间都以整数纳秒表示。下一次唤醒时间始终由调度原点加上累计周期得出，
//! 而不是由实际唤醒时刻得出，因此调度抖动不会累积。
//!
//! All time values are integer nanoseconds. The next wake time is always the
//! schedule origin plus the accumulated periods, never derived from the actual
//! wake time, so scheduling jitter does not accumulate.

use crate::error::{Result, TimerError};
use std::time::Duration;
use tokio::time::Instant;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// 定时器的目标触发次数
/// Target number of ticks for a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerCount {
    Finite(u64),
    Infinite,
}

impl TimerCount {
    /// 负数表示无限次
    /// Negative values mean "run forever"
    pub fn from_raw(count: i64) -> Self {
        u64::try_from(count).map_or(Self::Infinite, Self::Finite)
    }

    /// 已完成 `completed` 次触发后是否应该结束
    /// Whether the run is over after `completed` ticks
    pub fn is_exhausted(&self, completed: u64) -> bool {
        match self {
            Self::Finite(target) => completed >= *target,
            Self::Infinite => false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl From<i64> for TimerCount {
    fn from(count: i64) -> Self {
        Self::from_raw(count)
    }
}

/// 将调用者提供的秒数转换为纳秒周期（截断转换，仅在启动时执行一次）
/// Convert caller-supplied seconds into a nanosecond period (truncating,
/// done exactly once at start time)
pub fn period_from_secs(seconds: f64) -> Result<u64> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimerError::InvalidPeriod { seconds });
    }
    // `as` 在超出范围时饱和到 u64::MAX
    // `as` saturates to u64::MAX when out of range
    let nanos = (seconds * NANOS_PER_SEC) as u64;
    if nanos == 0 {
        return Err(TimerError::InvalidPeriod { seconds });
    }
    Ok(nanos)
}

/// 单次运行的绝对截止时间调度
/// Absolute-deadline schedule of a single run
#[derive(Debug, Clone)]
pub struct Schedule {
    origin: Instant,
    period_nanos: u64,
    /// 下一次唤醒相对原点的偏移；`None` 表示已超出可表示范围
    /// Offset of the next wake from the origin; `None` once it overflowed
    next_wake_nanos: Option<u64>,
}

impl Schedule {
    /// 以当前单调时钟时间为原点创建调度
    /// Create a schedule anchored at the current monotonic time
    pub fn start_now(period_nanos: u64) -> Self {
        Self::starting_at(Instant::now(), period_nanos)
    }

    pub fn starting_at(origin: Instant, period_nanos: u64) -> Self {
        Self {
            origin,
            period_nanos,
            next_wake_nanos: Some(0),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn period_nanos(&self) -> u64 {
        self.period_nanos
    }

    pub fn next_wake_nanos(&self) -> Option<u64> {
        self.next_wake_nanos
    }

    /// 将唤醒时间精确推进一个周期，并返回新的绝对截止时间
    /// Advance the wake time by exactly one period and return the new absolute
    /// deadline
    ///
    /// Returns `None` when the deadline can no longer be represented; the
    /// caller should then park until cancelled.
    pub fn advance(&mut self) -> Option<Instant> {
        self.next_wake_nanos = self
            .next_wake_nanos
            .and_then(|nanos| nanos.checked_add(self.period_nanos));
        self.deadline()
    }

    /// 当前的绝对截止时间
    /// Current absolute deadline
    pub fn deadline(&self) -> Option<Instant> {
        self.next_wake_nanos
            .and_then(|nanos| self.origin.checked_add(Duration::from_nanos(nanos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_from_raw() {
        assert_eq!(TimerCount::from_raw(-1), TimerCount::Infinite);
        assert_eq!(TimerCount::from_raw(i64::MIN), TimerCount::Infinite);
        assert_eq!(TimerCount::from_raw(0), TimerCount::Finite(0));
        assert_eq!(TimerCount::from_raw(5), TimerCount::Finite(5));
        assert!(TimerCount::from(-3).is_infinite());
        assert!(!TimerCount::from(0).is_infinite());
    }

    #[test]
    fn test_count_exhaustion() {
        let five = TimerCount::Finite(5);
        assert!(!five.is_exhausted(4));
        assert!(five.is_exhausted(5));
        assert!(TimerCount::Finite(0).is_exhausted(0));
        assert!(!TimerCount::Infinite.is_exhausted(u64::MAX));
    }

    #[test]
    fn test_period_truncates() {
        assert_eq!(period_from_secs(0.5).unwrap(), 500_000_000);
        assert_eq!(period_from_secs(1.0).unwrap(), 1_000_000_000);
        // 1.9 ns 截断为 1 ns，而不是四舍五入
        assert_eq!(period_from_secs(1e-9 * 1.9).unwrap(), 1);
        assert_eq!(period_from_secs(f64::MAX).unwrap(), u64::MAX);
    }

    #[test]
    fn test_period_rejects_invalid_values() {
        for seconds in [-1.0, f64::NAN, f64::INFINITY, 0.0, 1e-10] {
            assert!(matches!(
                period_from_secs(seconds),
                Err(TimerError::InvalidPeriod { .. })
            ));
        }
    }

    #[test]
    fn test_deadlines_are_computed_from_the_schedule() {
        let origin = Instant::now();
        let mut schedule = Schedule::starting_at(origin, 3_333_333);
        assert_eq!(schedule.origin(), origin);
        assert_eq!(schedule.period_nanos(), 3_333_333);
        assert_eq!(schedule.deadline(), Some(origin));
        for k in 1..=1000u64 {
            let deadline = schedule.advance().unwrap();
            assert_eq!(deadline, origin + Duration::from_nanos(k * 3_333_333));
        }
        assert_eq!(schedule.next_wake_nanos(), Some(3_333_333_000));
        assert_eq!(schedule.origin(), origin);
    }

    #[test]
    fn test_advance_overflow_yields_none() {
        let mut schedule = Schedule::start_now(u64::MAX);
        // u64::MAX 纳秒约 584 年，可能仍可表示
        let _ = schedule.advance();
        assert_eq!(schedule.advance(), None);
        assert_eq!(schedule.next_wake_nanos(), None);
        assert_eq!(schedule.advance(), None);
    }
}
