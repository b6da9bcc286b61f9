//! 进程级全局定时器池
//! Process-global timer pool
//!
//! 与面向实例的 [`TimerPool`] 相同的接口，适用于需要单个进程级注册表的应用。
//! 全局池只能初始化一次，并且在进程退出前不会被销毁；需要有序关闭时调用 [`shutdown`]。
//!
//! The same surface as the instance-based [`TimerPool`], for applications that
//! want a single process-wide registry. The global pool is initialized once and
//! never torn down before process exit; call [`shutdown`] for an orderly stop.

use super::{
    pool::{StartOutcome, StopOutcome, TimerPool, TimerStatus},
    sink::EventSink,
};
use crate::{
    config::PoolConfig,
    error::{Result, TimerError},
};
use std::{sync::OnceLock, time::Duration};
use tracing::info;

static GLOBAL_POOL: OnceLock<TimerPool> = OnceLock::new();

/// 初始化全局定时器池，只能成功调用一次
/// Initialize the global timer pool; succeeds only once
pub fn initialize<S: EventSink>(sink: S, config: PoolConfig) -> Result<&'static TimerPool> {
    let mut created = false;
    let pool = GLOBAL_POOL.get_or_init(|| {
        created = true;
        TimerPool::new(sink, config)
    });
    if !created {
        return Err(TimerError::AlreadyInitialized);
    }
    info!(capacity = pool.capacity(), "Global timer pool initialized");
    Ok(pool)
}

/// 获取全局定时器池
/// Get the global timer pool
pub fn pool() -> Result<&'static TimerPool> {
    GLOBAL_POOL.get().ok_or(TimerError::NotInitialized)
}

pub fn start(index: i64, period_secs: f64, count: i64) -> Result<StartOutcome> {
    pool()?.start(index, period_secs, count)
}

pub fn stop(index: i64) -> Result<StopOutcome> {
    pool()?.stop(index)
}

pub fn wait(index: i64) -> Result<()> {
    pool()?.wait(index)
}

pub fn wait_timeout(index: i64, timeout: Duration) -> Result<bool> {
    pool()?.wait_timeout(index, timeout)
}

pub fn status(index: i64) -> Result<TimerStatus> {
    pool()?.status(index)
}

/// 停止全局池中所有运行中的定时器
/// Stop every running timer of the global pool
pub fn shutdown() -> Result<()> {
    pool()?.shutdown()
}
