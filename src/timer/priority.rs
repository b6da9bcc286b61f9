//! 实时优先级提升（尽力而为）
//! Best-effort real-time priority elevation
//!
//! 平台相关的部分都隔离在这里。提升失败只会降低精度，不会阻止定时器运行。
//!
//! Everything platform-specific lives here. Failing to elevate only degrades
//! precision; it never prevents a timer from running.

/// 优先级提升错误
/// Priority elevation errors
#[derive(Debug, thiserror::Error)]
pub enum PriorityError {
    #[error("scheduler call failed: {0}")]
    Os(#[from] std::io::Error),
    #[error("real-time scheduling is not supported on this platform")]
    Unsupported,
}

/// 将调用线程切换到最高的轮转实时优先级，返回获得的优先级
/// Switch the calling thread to the highest round-robin real-time priority and
/// return the priority obtained
#[cfg(unix)]
pub fn elevate_current_thread() -> Result<i32, PriorityError> {
    // SAFETY: 仅查询调度器常量
    // SAFETY: only queries a scheduler constant
    let max = unsafe { libc::sched_get_priority_max(libc::SCHED_RR) };
    if max == -1 {
        return Err(std::io::Error::last_os_error().into());
    }

    // 某些平台的 sched_param 带有填充字段
    // sched_param carries padding fields on some platforms
    // SAFETY: sched_param is a plain C struct for which all-zero is valid
    let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
    param.sched_priority = max;

    // SAFETY: pthread_self() is always a valid handle for the calling thread
    // and param outlives the call.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_RR, &param) };
    if rc != 0 {
        return Err(std::io::Error::from_raw_os_error(rc).into());
    }
    Ok(max)
}

#[cfg(not(unix))]
pub fn elevate_current_thread() -> Result<i32, PriorityError> {
    Err(PriorityError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_is_non_fatal() {
        // 在非特权环境中通常返回 EPERM，只要不 panic 即可
        let outcome = std::thread::spawn(elevate_current_thread).join();
        match outcome {
            Ok(Ok(priority)) => assert!(priority > 0),
            Ok(Err(err)) => assert!(!err.to_string().is_empty()),
            Err(_) => panic!("priority elevation must not panic"),
        }
    }
}
