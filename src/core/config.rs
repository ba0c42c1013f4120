//! 引擎配置
//!
//! 定义路由引擎的配置结构和加载逻辑，支持 YAML 与 JSON 文件。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{CoreError, Result};

/// 路由分发配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// 是否在 trace 级别记录每个搬运的值
    #[serde(default)]
    pub trace_values: bool,

    /// 分配通道时的默认缓冲容量
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,
}

fn default_capacity() -> usize {
    16
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            trace_values: false,
            default_capacity: default_capacity(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// 保留日志文件数
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
            max_files: default_max_files(),
        }
    }
}

/// 引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 分发配置
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,
}

impl FlowConfig {
    /// 创建配置构建器
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::new()
    }

    /// 从文件加载配置（`.json` 按 JSON 解析，其余按 YAML）
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CoreError::ConfigLoadFailed(format!("读取 {} 失败: {}", path.display(), e))
        })?;

        let mut config: FlowConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        config.config_path = Some(path);
        Ok(config)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.default_capacity == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "dispatch.default_capacity".to_string(),
                reason: "通道容量必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 合并另一个配置（只覆盖非默认值）
    pub fn merge(&mut self, other: FlowConfig) {
        if other.dispatch.trace_values {
            self.dispatch.trace_values = true;
        }
        if other.dispatch.default_capacity != default_capacity() {
            self.dispatch.default_capacity = other.dispatch.default_capacity;
        }
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.logging.json_format {
            self.logging.json_format = true;
        }
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct FlowConfigBuilder {
    config: FlowConfig,
}

impl FlowConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录每个搬运的值
    pub fn trace_values(mut self) -> Self {
        self.config.dispatch.trace_values = true;
        self
    }

    /// 设置默认通道容量
    pub fn default_capacity(mut self, capacity: usize) -> Self {
        self.config.dispatch.default_capacity = capacity;
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 构建配置
    pub fn build(self) -> FlowConfig {
        self.config
    }
}
