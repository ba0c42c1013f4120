//! 路由工作者统计

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 单个路由工作者的计数器
///
/// 由工作者独占写入，`RouteHandle` 只读快照。
#[derive(Debug)]
pub struct RouteStats {
    /// 从输入取得的值数量
    received: AtomicU64,
    /// 成功写入输出的值数量
    sent: AtomicU64,
    /// 因输出已被他方关闭而丢弃的值数量
    dropped: AtomicU64,
    /// 启动时间
    started_at: DateTime<Utc>,
}

impl RouteStats {
    /// 创建统计实例
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> RouteStatsSnapshot {
        RouteStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }
}

impl Default for RouteStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 统计快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteStatsSnapshot {
    /// 接收数
    pub received: u64,
    /// 发送数
    pub sent: u64,
    /// 丢弃数
    pub dropped: u64,
    /// 启动时间
    pub started_at: DateTime<Utc>,
}
