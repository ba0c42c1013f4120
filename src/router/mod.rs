//! 路由模块
//!
//! 数据流路由引擎的核心组件：
//! - 路由规格数据模型
//! - 别名规范化
//! - 命名通道与通道注册表
//! - 各类路由工作者
//! - 分发器与运行句柄

pub mod channel;
pub mod dispatcher;
pub mod normalizer;
pub mod registry;
pub mod spec;
pub mod stats;
pub mod worker;

// 重导出常用类型
pub use channel::Channel;
pub use dispatcher::{dispatch, Dispatcher, RouteExit, RouteHandle};
pub use normalizer::{normalize, normalize_all, AliasMap};
pub use registry::ChannelRegistry;
pub use spec::{
    identity, Alias, ChannelSlot, Reducer, RouteKind, RouteSpec, SelectSlot, Selector, SinkFn,
    Transform,
};
pub use stats::{RouteStats, RouteStatsSnapshot};
pub use worker::{RouteWorker, WorkerContext};
