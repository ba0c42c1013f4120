//! 广播族：scatter / splatter / spread

use async_trait::async_trait;
use serde_json::Value;

use super::{RouteWorker, WorkerContext};
use crate::router::channel::Channel;
use crate::router::spec::RouteKind;
use crate::utils::Result;

/// 每个值按声明顺序发往所有输出
pub struct ScatterWorker {
    /// 输入通道
    pub input: Channel,
    /// 输出通道（按声明顺序）
    pub outputs: Vec<Channel>,
}

#[async_trait]
impl RouteWorker for ScatterWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Scatter
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        while let Some(value) = ctx.recv(&self.input).await {
            for output in &self.outputs {
                ctx.emit(output, value.clone()).await;
            }
        }
        ctx.close_outputs(&self.outputs);
        Ok(())
    }
}

/// 输入值为序列，第 i 个元素发往第 i 个输出
///
/// 元素数与输出数不等时多出的一侧被忽略。
pub struct SplatterWorker {
    /// 输入通道
    pub input: Channel,
    /// 输出通道（按声明顺序）
    pub outputs: Vec<Channel>,
}

#[async_trait]
impl RouteWorker for SplatterWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Splatter
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        while let Some(value) = ctx.recv(&self.input).await {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    return Err(ctx.invalid_value(format!(
                        "splatter 需要序列输入，收到: {}",
                        other
                    )))
                }
            };
            for (item, output) in items.into_iter().zip(&self.outputs) {
                ctx.emit(output, item).await;
            }
        }
        ctx.close_outputs(&self.outputs);
        Ok(())
    }
}

/// 轮询分发：游标从 0 开始，每发一个值前进一位
pub struct SpreadWorker {
    /// 输入通道
    pub input: Channel,
    /// 输出通道（按声明顺序）
    pub outputs: Vec<Channel>,
}

#[async_trait]
impl RouteWorker for SpreadWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Spread
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        let mut cursor = self.outputs.iter().cycle();
        while let Some(value) = ctx.recv(&self.input).await {
            // outputs 非空由 dispatch 前的校验保证
            let Some(output) = cursor.next() else {
                break;
            };
            ctx.emit(output, value).await;
        }
        ctx.close_outputs(&self.outputs);
        Ok(())
    }
}
