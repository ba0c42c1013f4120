//! 路由分发器
//!
//! 把一条路由规格变成一个正在运行的工作者：先按注册表解析全部别名，
//! 任何一个缺失都同步返回 `ChannelNotFound`，不会启动半截工作者；
//! 解析成功后在当前 tokio 运行时上启动工作者任务并立即返回句柄。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, Instrument};

use super::channel::Channel;
use super::normalizer::AliasMap;
use super::registry::ChannelRegistry;
use super::spec::{RouteKind, RouteSpec};
use super::stats::{RouteStats, RouteStatsSnapshot};
use super::worker::{
    CollectWorker, GatherWorker, RouteWorker, ScatterWorker, SelectWorker, SinkWorker,
    SplatterWorker, SpreadWorker, UnionWorker, WorkerContext,
};
use crate::core::config::DispatchConfig;
use crate::utils::{generate_route_id, CoreError, Result};

/// 路由分发器
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    /// 创建分发器
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// 分发配置
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// 按配置的默认容量为别名表分配通道
    pub fn allocate_registry(&self, aliases: &AliasMap) -> ChannelRegistry {
        ChannelRegistry::allocate(aliases, self.config.default_capacity)
    }

    /// 启动一条路由
    ///
    /// # Errors
    ///
    /// - `InvalidSpec`：规格不能启动工作者（如 `in`）
    /// - `ChannelNotFound`：引用的别名不在注册表中
    /// - `InitFailed`：不在 tokio 运行时中调用
    pub fn dispatch(&self, spec: RouteSpec, registry: &ChannelRegistry) -> Result<RouteHandle> {
        spec.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::InitFailed(format!("路由分发需要 tokio 运行时: {}", e)))?;

        let kind = spec.kind();
        let worker = build_worker(spec, registry)?;

        let route_id = generate_route_id(kind);
        let stats = Arc::new(RouteStats::new());
        let ctx = WorkerContext::new(
            route_id.clone(),
            kind,
            stats.clone(),
            self.config.trace_values,
        );

        let span = crate::route_span!(route_id, kind);
        span.in_scope(|| info!("路由工作者启动"));

        let task = runtime.spawn(async move { worker.run(&ctx).await }.instrument(span));

        Ok(RouteHandle {
            route_id,
            kind,
            stats,
            task,
        })
    }
}

/// 使用默认配置启动一条路由
pub fn dispatch(spec: RouteSpec, registry: &ChannelRegistry) -> Result<RouteHandle> {
    Dispatcher::default().dispatch(spec, registry)
}

fn resolve_all<'a>(
    registry: &ChannelRegistry,
    aliases: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<Channel>> {
    aliases
        .into_iter()
        .map(|alias| {
            let channel = registry.resolve(alias)?;
            debug!(alias, "别名已解析");
            Ok(channel)
        })
        .collect()
}

fn build_worker(spec: RouteSpec, registry: &ChannelRegistry) -> Result<Box<dyn RouteWorker>> {
    let worker: Box<dyn RouteWorker> = match spec {
        RouteSpec::Scatter { input, outputs } => Box::new(ScatterWorker {
            input: registry.resolve(&input)?,
            outputs: resolve_all(registry, outputs.iter().map(|s| s.alias.as_str()))?,
        }),
        RouteSpec::Splatter { input, outputs } => Box::new(SplatterWorker {
            input: registry.resolve(&input)?,
            outputs: resolve_all(registry, outputs.iter().map(|s| s.alias.as_str()))?,
        }),
        RouteSpec::Spread { input, outputs } => Box::new(SpreadWorker {
            input: registry.resolve(&input)?,
            outputs: resolve_all(registry, outputs.iter().map(|s| s.alias.as_str()))?,
        }),
        RouteSpec::Select {
            input,
            outputs,
            selector,
        } => {
            let input = registry.resolve(&input)?;
            let outputs = outputs
                .into_iter()
                .map(|slot| Ok((registry.resolve(slot.alias())?, slot.selector_value)))
                .collect::<Result<Vec<_>>>()?;
            Box::new(SelectWorker {
                input,
                outputs,
                selector,
            })
        }
        RouteSpec::Union { inputs, output } => Box::new(UnionWorker {
            inputs: resolve_all(registry, inputs.iter().map(String::as_str))?,
            output: registry.resolve(&output.alias)?,
        }),
        RouteSpec::Gather { inputs, output } => Box::new(GatherWorker {
            inputs: resolve_all(registry, inputs.iter().map(String::as_str))?,
            output: registry.resolve(&output.alias)?,
        }),
        RouteSpec::Collect {
            input,
            output,
            reducer,
            initial,
        } => Box::new(CollectWorker {
            input: registry.resolve(&input)?,
            output: registry.resolve(&output.alias)?,
            reducer,
            initial,
        }),
        RouteSpec::Sink { input, sink } => Box::new(SinkWorker {
            input: registry.resolve(&input)?,
            sink,
        }),
        RouteSpec::In { .. } => {
            return Err(CoreError::InvalidSpec(
                "in 仅声明外部通道，不能启动工作者".to_string(),
            ))
        }
    };
    Ok(worker)
}

/// 正常退出报告
#[derive(Debug, Clone)]
pub struct RouteExit {
    /// 工作者 ID
    pub route_id: String,
    /// 路由类型
    pub kind: RouteKind,
    /// 最终统计
    pub stats: RouteStatsSnapshot,
}

/// 运行中路由的句柄
///
/// 丢弃句柄不会停止工作者，工作者只随输入关闭而退出。
#[derive(Debug)]
pub struct RouteHandle {
    route_id: String,
    kind: RouteKind,
    stats: Arc<RouteStats>,
    task: JoinHandle<Result<()>>,
}

impl RouteHandle {
    /// 工作者 ID
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// 路由类型
    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// 当前统计快照
    pub fn stats(&self) -> RouteStatsSnapshot {
        self.stats.snapshot()
    }

    /// 工作者是否已结束
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待工作者结束
    ///
    /// 仅在输入关闭的正常收尾路径上返回 `Ok`；回调失败、无效值与 panic 各自映射为对应错误。
    pub async fn join(self) -> Result<RouteExit> {
        match self.task.await {
            Ok(Ok(())) => Ok(RouteExit {
                route_id: self.route_id,
                kind: self.kind,
                stats: self.stats.snapshot(),
            }),
            Ok(Err(e)) => Err(e),
            Err(join_error) => {
                let reason = if join_error.is_panic() {
                    let payload = join_error.into_panic();
                    payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "未知 panic".to_string())
                } else {
                    "任务被取消".to_string()
                };
                Err(CoreError::WorkerPanicked {
                    route_id: self.route_id,
                    reason,
                })
            }
        }
    }
}
