//! 数据流引擎错误类型定义
//!
//! 本模块定义了路由引擎中使用的所有错误类型。
//! 正常的"输入关闭即退出"不是错误，只有下列异常终止路径才会产生 `CoreError`。

use thiserror::Error;

use crate::router::spec::RouteKind;

/// 数据流引擎核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 拓扑配置错误 ====================

    /// 路由规格引用的别名不在通道注册表中
    #[error("通道未找到: alias '{0}'")]
    ChannelNotFound(String),

    /// 路由规格不符合语法
    #[error("路由规格无效: {0}")]
    InvalidSpec(String),

    // ==================== 路由工作者错误 ====================

    /// 用户回调（selector / sink / reducer）执行失败
    #[error("路由 '{route_id}' ({kind}) 回调执行失败: {source}")]
    CallbackFailed {
        route_id: String,
        kind: RouteKind,
        #[source]
        source: anyhow::Error,
    },

    /// 工作者收到形状不符的值
    #[error("路由 '{route_id}' 收到无效的值: {reason}")]
    InvalidValue {
        route_id: String,
        reason: String,
    },

    /// 工作者任务 panic
    #[error("路由 '{route_id}' 工作者异常终止: {reason}")]
    WorkerPanicked {
        route_id: String,
        reason: String,
    },

    // ==================== 通道错误 ====================

    /// 向已关闭的通道发送
    #[error("通道已关闭: alias '{0}'")]
    ChannelClosed(String),

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 引擎操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 路由错误 (ROUTE-xxx)
    pub const ROUTE_INVALID_SPEC: &str = "ROUTE-001";
    pub const ROUTE_CALLBACK_FAILED: &str = "ROUTE-002";
    pub const ROUTE_INVALID_VALUE: &str = "ROUTE-003";
    pub const ROUTE_WORKER_PANICKED: &str = "ROUTE-004";

    // 通道错误 (CHANNEL-xxx)
    pub const CHANNEL_NOT_FOUND: &str = "CHANNEL-001";
    pub const CHANNEL_CLOSED: &str = "CHANNEL-002";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    pub const UNKNOWN: &str = "UNKNOWN";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::ChannelNotFound(_) => error_code::CHANNEL_NOT_FOUND,
            CoreError::InvalidSpec(_) => error_code::ROUTE_INVALID_SPEC,
            CoreError::CallbackFailed { .. } => error_code::ROUTE_CALLBACK_FAILED,
            CoreError::InvalidValue { .. } => error_code::ROUTE_INVALID_VALUE,
            CoreError::WorkerPanicked { .. } => error_code::ROUTE_WORKER_PANICKED,
            CoreError::ChannelClosed(_) => error_code::CHANNEL_CLOSED,
            CoreError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            _ => error_code::UNKNOWN,
        }
    }

    /// 是否为拓扑配置错误（在 dispatch 时同步返回）
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, CoreError::ChannelNotFound(_) | CoreError::InvalidSpec(_))
    }

    /// 是否为工作者运行期的异常终止
    pub fn is_worker_failure(&self) -> bool {
        matches!(
            self,
            CoreError::CallbackFailed { .. }
                | CoreError::InvalidValue { .. }
                | CoreError::WorkerPanicked { .. }
        )
    }
}
