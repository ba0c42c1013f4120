//! 命名通道
//!
//! `Channel` 是可克隆的通道句柄，同一个句柄既可发送也可接收，可显式关闭。
//! 底层为 tokio 有界 mpsc：
//! - 发送端只保存一份，`close()` 取走它，之后的 `send` 返回 `ChannelClosed`
//! - 接收端由 tokio `Mutex` 保护，多个消费者依次取值
//! - 关闭后仍可取出缓冲区中剩余的值，取完返回 `None`

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use super::spec::{identity, Alias, Transform};
use crate::utils::{CoreError, Result};

struct ChannelInner {
    alias: Alias,
    capacity: usize,
    tx: Mutex<Option<mpsc::Sender<Value>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Value>>,
    transform: Transform,
}

/// 通道句柄
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// 创建有界通道（容量至少为 1）
    pub fn new(alias: impl Into<Alias>, capacity: usize) -> Self {
        Self::with_transform(alias, capacity, identity())
    }

    /// 创建带变换的有界通道，变换在每次 `send` 时作用于值
    pub fn with_transform(alias: impl Into<Alias>, capacity: usize, transform: Transform) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(ChannelInner {
                alias: alias.into(),
                capacity,
                tx: Mutex::new(Some(tx)),
                rx: tokio::sync::Mutex::new(rx),
                transform,
            }),
        }
    }

    /// 通道别名
    pub fn alias(&self) -> &str {
        &self.inner.alias
    }

    /// 缓冲容量
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    fn sender(&self) -> Option<mpsc::Sender<Value>> {
        self.inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 发送一个值，缓冲区满时等待
    ///
    /// # Errors
    ///
    /// 通道已关闭时返回 `CoreError::ChannelClosed`
    pub async fn send(&self, value: Value) -> Result<()> {
        let tx = self
            .sender()
            .ok_or_else(|| CoreError::ChannelClosed(self.inner.alias.clone()))?;
        let value = (self.inner.transform)(value);
        tx.send(value)
            .await
            .map_err(|_| CoreError::ChannelClosed(self.inner.alias.clone()))
    }

    /// 接收一个值
    ///
    /// 通道关闭且缓冲区取空后返回 `None`。取消安全：在 `select` 中被丢弃不会丢值。
    pub async fn recv(&self) -> Option<Value> {
        let mut rx = self.inner.rx.lock().await;
        rx.recv().await
    }

    /// 关闭通道
    ///
    /// 返回 `true` 表示本次调用完成了关闭，重复关闭返回 `false`。
    pub fn close(&self) -> bool {
        let taken = self
            .inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if taken.is_some() {
            trace!(alias = %self.inner.alias, "通道关闭");
        }
        taken.is_some()
    }

    /// 是否已关闭（不再接受发送）
    pub fn is_closed(&self) -> bool {
        self.inner
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    /// 两个句柄是否指向同一通道
    pub fn same_channel(&self, other: &Channel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("alias", &self.inner.alias)
            .field("capacity", &self.inner.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_recv_in_order() {
        let ch = Channel::new("a", 4);
        for i in 0..3 {
            ch.send(json!(i)).await.unwrap();
        }
        for i in 0..3 {
            assert_eq!(ch.recv().await, Some(json!(i)));
        }
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let ch = Channel::new("a", 4);
        ch.send(json!("x")).await.unwrap();
        assert!(ch.close());
        assert!(!ch.close());
        assert!(ch.is_closed());

        assert_eq!(ch.recv().await, Some(json!("x")));
        assert_eq!(ch.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let ch = Channel::new("a", 1);
        ch.close();
        let err = ch.send(json!(1)).await.unwrap_err();
        assert!(matches!(err, CoreError::ChannelClosed(alias) if alias == "a"));
    }

    #[tokio::test]
    async fn test_transform_applied_on_send() {
        let ch = Channel::with_transform("t", 2, Arc::new(|v: Value| json!({ "wrapped": v })));
        ch.send(json!(5)).await.unwrap();
        assert_eq!(ch.recv().await, Some(json!({ "wrapped": 5 })));
    }

    #[tokio::test]
    async fn test_send_blocks_when_full() {
        let ch = Channel::new("a", 1);
        ch.send(json!(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(20), ch.send(json!(2))).await;
        assert!(blocked.is_err());

        assert_eq!(ch.recv().await, Some(json!(1)));
        ch.send(json!(3)).await.unwrap();
        assert_eq!(ch.recv().await, Some(json!(3)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let a = Channel::new("shared", 2);
        let b = a.clone();
        assert!(a.same_channel(&b));
        assert!(!a.same_channel(&Channel::new("shared", 2)));

        a.send(json!(true)).await.unwrap();
        assert_eq!(b.recv().await, Some(json!(true)));
        b.close();
        assert!(a.is_closed());
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let ch = Channel::new("z", 0);
        assert_eq!(ch.capacity(), 1);
    }
}
