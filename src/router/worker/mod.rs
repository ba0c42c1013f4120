//! 路由工作者
//!
//! 每种路由纪律一个工作者类型，共享同一个收尾契约：
//! 所有输入关闭后，恰好关闭一次自己声明的全部输出，然后退出。
//! 回调失败或收到无效值时直接返回错误，不关闭输出。

mod broadcast;
mod join;
mod select;
mod terminal;

pub use broadcast::{ScatterWorker, SplatterWorker, SpreadWorker};
pub use join::{GatherWorker, UnionWorker};
pub use select::SelectWorker;
pub use terminal::{CollectWorker, SinkWorker};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, trace};

use super::channel::Channel;
use super::spec::RouteKind;
use super::stats::RouteStats;
use crate::utils::{CoreError, Result};

/// 路由工作者
#[async_trait]
pub trait RouteWorker: Send {
    /// 路由类型
    fn kind(&self) -> RouteKind;

    /// 运行直到输入耗尽
    ///
    /// 返回 `Ok(())` 表示经由"输入关闭"正常退出。
    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()>;
}

/// 工作者运行上下文
#[derive(Debug, Clone)]
pub struct WorkerContext {
    route_id: String,
    kind: RouteKind,
    stats: Arc<RouteStats>,
    trace_values: bool,
}

impl WorkerContext {
    /// 创建上下文
    pub fn new(
        route_id: impl Into<String>,
        kind: RouteKind,
        stats: Arc<RouteStats>,
        trace_values: bool,
    ) -> Self {
        Self {
            route_id: route_id.into(),
            kind,
            stats,
            trace_values,
        }
    }

    /// 工作者 ID
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// 从输入取一个值，`None` 表示该输入已关闭
    pub async fn recv(&self, input: &Channel) -> Option<Value> {
        let value = input.recv().await?;
        self.record_received(&value);
        Some(value)
    }

    /// 记录一个已取得的值（供自行等待输入的工作者使用）
    pub fn record_received(&self, value: &Value) {
        self.stats.record_received();
        if self.trace_values {
            trace!(value = %value, "收到值");
        }
    }

    /// 向输出发送一个值
    ///
    /// 输出已被他方关闭时丢弃该值并计数，不视为错误。
    pub async fn emit(&self, output: &Channel, value: Value) {
        if self.trace_values {
            trace!(alias = %output.alias(), value = %value, "发送值");
        }
        match output.send(value).await {
            Ok(()) => self.stats.record_sent(),
            Err(_) => {
                self.stats.record_dropped();
                debug!(alias = %output.alias(), "输出已关闭，值被丢弃");
            }
        }
    }

    /// 关闭全部输出
    pub fn close_outputs(&self, outputs: &[Channel]) {
        for output in outputs {
            output.close();
        }
        let snapshot = self.stats.snapshot();
        info!(
            outputs = outputs.len(),
            received = snapshot.received,
            sent = snapshot.sent,
            "输入已关闭，路由退出"
        );
    }

    /// 包装回调错误
    pub fn callback_failed(&self, source: anyhow::Error) -> CoreError {
        error!(error = %source, "回调执行失败，路由终止");
        CoreError::CallbackFailed {
            route_id: self.route_id.clone(),
            kind: self.kind,
            source,
        }
    }

    /// 包装无效值错误
    pub fn invalid_value(&self, reason: impl Into<String>) -> CoreError {
        let reason = reason.into();
        error!(reason = %reason, "收到无效的值，路由终止");
        CoreError::InvalidValue {
            route_id: self.route_id.clone(),
            reason,
        }
    }
}
