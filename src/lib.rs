//! # Chips Flow - 薯片数据流路由引擎
//!
//! 给定声明式的路由规格和一组命名并发通道，为每条路由启动一个独立的工作者，
//! 按路由纪律在通道之间搬运值：
//!
//! - **广播族**: scatter（全量广播）、splatter（按位拆分）、spread（轮询分发）
//! - **条件路由**: select（按选择值分发）
//! - **汇合族**: gather（同步拼元组）、union（非确定性合并）
//! - **终端路由**: sink（消费）、collect（归约）
//!
//! 关闭是唯一的停止信号：一条路由的全部输入关闭后，它恰好关闭一次自己的全部输出，
//! 关闭由此沿拓扑向下游传播。
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use chips_flow::{dispatch, normalize, ChannelRegistry, RouteSpec};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = RouteSpec::scatter("a", ["b", "c"]);
//!     let mut aliases = normalize(&spec);
//!     aliases.extend(normalize(&RouteSpec::declare(["a"])));
//!     let registry = ChannelRegistry::allocate(&aliases, 16);
//!
//!     let handle = dispatch(spec, &registry)?;
//!     let a = registry.resolve("a")?;
//!     a.send(json!(1)).await?;
//!     a.close();
//!
//!     assert_eq!(registry.resolve("b")?.recv().await, Some(json!(1)));
//!     handle.join().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块结构
//!
//! - `router` - 路由规格、通道、工作者与分发器
//! - `core` - 引擎配置
//! - `utils` - 错误类型、ID 生成、日志

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod core;
pub mod router;
pub mod utils;

// 重导出常用类型，方便使用
pub use router::{
    dispatch, identity, normalize, normalize_all, AliasMap, Channel, ChannelRegistry,
    ChannelSlot, Dispatcher, RouteExit, RouteHandle, RouteKind, RouteSpec, RouteStatsSnapshot,
    SelectSlot,
};

pub use utils::logger::{fields, LogGuard, Logger, LoggerConfig, RotationStrategy};
pub use utils::{error_code, CoreError, Result};

pub use core::config::{DispatchConfig, FlowConfig, FlowConfigBuilder, LogConfig};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
