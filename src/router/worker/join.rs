//! 拼接 / 合并族：gather / union

use async_trait::async_trait;
use futures::future::select_all;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use super::{RouteWorker, WorkerContext};
use crate::router::channel::Channel;
use crate::router::spec::RouteKind;
use crate::utils::Result;

/// 同步拼接
///
/// 每轮按声明顺序依次从每个输入取一个值，拼成序列后发往输出。
/// 任一输入关闭即停止，不会发出残缺的元组。
pub struct GatherWorker {
    /// 输入通道（按声明顺序）
    pub inputs: Vec<Channel>,
    /// 输出通道
    pub output: Channel,
}

impl GatherWorker {
    async fn next_tuple(&self, ctx: &WorkerContext) -> Option<Vec<Value>> {
        let mut tuple = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            tuple.push(ctx.recv(input).await?);
        }
        Some(tuple)
    }
}

#[async_trait]
impl RouteWorker for GatherWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Gather
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        while let Some(tuple) = self.next_tuple(ctx).await {
            ctx.emit(&self.output, Value::Array(tuple)).await;
        }
        ctx.close_outputs(std::slice::from_ref(&self.output));
        Ok(())
    }
}

/// 非确定性合并
///
/// 同时等待所有仍存活的输入，谁先就绪就转发谁的值；某个输入关闭则将其移出存活集合。
/// 存活集合为空时关闭输出。
pub struct UnionWorker {
    /// 输入通道（按声明顺序）
    pub inputs: Vec<Channel>,
    /// 输出通道
    pub output: Channel,
}

/// 等待任一存活输入，返回 (下标, 值)
///
/// 起始位置随机轮换，避免总是偏向靠前的输入。
async fn recv_any(live: &[Channel]) -> (usize, Option<Value>) {
    let offset = rand::thread_rng().gen_range(0..live.len());
    let order: Vec<usize> = (0..live.len()).map(|i| (i + offset) % live.len()).collect();
    let pending = order.iter().map(|&i| Box::pin(live[i].recv()));
    let (value, position, _rest) = select_all(pending).await;
    (order[position], value)
}

#[async_trait]
impl RouteWorker for UnionWorker {
    fn kind(&self) -> RouteKind {
        RouteKind::Union
    }

    async fn run(self: Box<Self>, ctx: &WorkerContext) -> Result<()> {
        let mut live = self.inputs.clone();
        while !live.is_empty() {
            match recv_any(&live).await {
                (_, Some(value)) => {
                    ctx.record_received(&value);
                    ctx.emit(&self.output, value).await;
                }
                (index, None) => {
                    let closed = live.remove(index);
                    debug!(
                        alias = %closed.alias(),
                        remaining = live.len(),
                        "输入已关闭，移出合并集合"
                    );
                }
            }
        }
        ctx.close_outputs(std::slice::from_ref(&self.output));
        Ok(())
    }
}
