//! 事件接收端
//! Event sinks
//!
//! 定时器线程通过 [`EventSink`] 投递每一次触发。接收端必须可以被多个定时器线程
//! 并发调用，并且不能长时间阻塞调用者。
//!
//! Timer threads post every tick through an [`EventSink`]. A sink must be safe
//! to call concurrently from many timer threads and must not block the caller
//! for an unbounded amount of time.

use super::event::TimerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 事件投递错误
/// Event delivery errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("event receiver has been dropped")]
    Closed,
    #[error("event queue is full")]
    Full,
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// 事件接收端 trait
/// Event sink trait
pub trait EventSink: Send + Sync + 'static {
    /// 投递一次定时器触发事件
    /// Post one timer tick event
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError>;
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        (**self).post_event(event)
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        (**self).post_event(event)
    }
}

#[derive(Debug, Clone)]
enum ChannelSender {
    Unbounded(mpsc::UnboundedSender<TimerEvent>),
    Bounded(mpsc::Sender<TimerEvent>),
}

/// 基于 tokio mpsc 通道的接收端，事件可以在异步任务中消费
/// tokio mpsc channel-based sink, events can be consumed from async tasks
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: ChannelSender,
}

impl ChannelSink {
    /// 创建无界通道接收端，投递永不阻塞
    /// Create an unbounded channel sink, posting never blocks
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::from(tx), rx)
    }

    /// 创建有界通道接收端，队列满时丢弃事件并返回 [`SinkError::Full`]
    /// Create a bounded channel sink, events are dropped with
    /// [`SinkError::Full`] while the queue is full
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<TimerEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::from(tx), rx)
    }
}

impl From<mpsc::UnboundedSender<TimerEvent>> for ChannelSink {
    fn from(sender: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self {
            sender: ChannelSender::Unbounded(sender),
        }
    }
}

impl From<mpsc::Sender<TimerEvent>> for ChannelSink {
    fn from(sender: mpsc::Sender<TimerEvent>) -> Self {
        Self {
            sender: ChannelSender::Bounded(sender),
        }
    }
}

impl EventSink for ChannelSink {
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        match &self.sender {
            ChannelSender::Unbounded(tx) => tx.send(event).map_err(|_| SinkError::Closed),
            // try_send 保证定时器线程不会因消费者缓慢而阻塞
            // try_send keeps the timer thread from blocking on a slow consumer
            ChannelSender::Bounded(tx) => tx.try_send(event).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SinkError::Full,
                mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
            }),
        }
    }
}

/// 基于闭包的接收端
/// Closure-based sink
#[derive(Clone)]
pub struct ClosureSink<F>
where
    F: Fn(TimerEvent) -> Result<(), SinkError> + Send + Sync + 'static,
{
    callback: F,
}

impl<F> ClosureSink<F>
where
    F: Fn(TimerEvent) -> Result<(), SinkError> + Send + Sync + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> std::fmt::Debug for ClosureSink<F>
where
    F: Fn(TimerEvent) -> Result<(), SinkError> + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureSink")
            .field("callback", &"<closure>")
            .finish()
    }
}

impl<F> EventSink for ClosureSink<F>
where
    F: Fn(TimerEvent) -> Result<(), SinkError> + Send + Sync + 'static,
{
    fn post_event(&self, event: TimerEvent) -> Result<(), SinkError> {
        (self.callback)(event)
    }
}

/// 空接收端（用于测试或不需要处理事件的场景）
/// No-op sink (for testing or scenarios where events are not needed)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn post_event(&self, _event: TimerEvent) -> Result<(), SinkError> {
        Ok(())
    }
}
