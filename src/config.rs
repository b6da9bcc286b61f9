//! 定义了定时器池的可配置参数。
//! Defines configurable parameters for the timer pool.

/// The number of slots used by [`PoolConfig::default`].
/// [`PoolConfig::default`] 使用的槽位数量。
pub const DEFAULT_CAPACITY: usize = 32;

/// A structure containing all configurable parameters for a timer pool.
///
/// 包含定时器池所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// The fixed number of slots. Valid indices are `0..capacity`.
    /// 固定的槽位数量。有效索引为 `0..capacity`。
    pub capacity: usize,

    /// Whether each timer thread requests the highest round-robin real-time
    /// priority on start. Failure to obtain it is never fatal.
    ///
    /// 每个定时器线程启动时是否请求最高的轮转实时优先级。获取失败不会导致致命错误。
    pub realtime_priority: bool,

    /// Prefix of the OS thread name; the slot index is appended.
    /// 操作系统线程名前缀；后面会附加槽位索引。
    pub thread_name_prefix: String,

    /// Stack size for timer threads. `None` keeps the platform default.
    /// 定时器线程的栈大小。`None` 表示使用平台默认值。
    pub thread_stack_size: Option<usize>,
}

impl PoolConfig {
    /// Sets the number of slots.
    /// 设置槽位数量。
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enables or disables the real-time priority request.
    /// 启用或禁用实时优先级请求。
    pub fn with_realtime_priority(mut self, enabled: bool) -> Self {
        self.realtime_priority = enabled;
        self
    }

    /// Sets the timer thread name prefix.
    /// 设置定时器线程名前缀。
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets an explicit stack size for timer threads.
    /// 为定时器线程设置显式栈大小。
    pub fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = Some(size);
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            realtime_priority: true,
            thread_name_prefix: "timer".to_string(),
            thread_stack_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity, 32);
        assert!(config.realtime_priority);
        assert_eq!(config.thread_name_prefix, "timer");
        assert!(config.thread_stack_size.is_none());
    }

    #[test]
    fn test_builder_helpers() {
        let config = PoolConfig::default()
            .with_capacity(4)
            .with_realtime_priority(false)
            .with_thread_name_prefix("clock")
            .with_thread_stack_size(64 * 1024);
        assert_eq!(config.capacity, 4);
        assert!(!config.realtime_priority);
        assert_eq!(config.thread_name_prefix, "clock");
        assert_eq!(config.thread_stack_size, Some(64 * 1024));
    }
}
