//! 路由规格数据模型
//!
//! 一条路由规格描述一个工作者：它从哪些别名读取、写入哪些别名、按哪种纪律搬运数据。
//! 每种路由类型只携带自己需要的字段。
//!
//! | 类型 | 输入 | 输出 | 附加字段 |
//! |------|------|------|----------|
//! | scatter / splatter / spread | 一个别名 | 有序通道槽 | - |
//! | select | 一个别名 | 带选择值的通道槽 | selector |
//! | union / gather | 有序别名列表 | 一个通道槽 | - |
//! | collect | 一个别名 | 一个通道槽 | reducer, 初始值 |
//! | sink | 一个别名 | - | sink 回调 |
//! | in | - | 外部来源的通道槽 | - |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{CoreError, Result};

/// 通道别名
pub type Alias = String;

/// 别名对应的值变换，在通道创建时挂载
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// select 路由的选择函数：由输入值计算分发键
pub type Selector = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// sink 路由的消费回调
pub type SinkFn = Arc<dyn Fn(Value) -> anyhow::Result<()> + Send + Sync>;

/// collect 路由的归约函数：`(累加器, 值) -> 新累加器`
pub type Reducer = Arc<dyn Fn(Value, Value) -> anyhow::Result<Value> + Send + Sync>;

/// 恒等变换
pub fn identity() -> Transform {
    Arc::new(|value| value)
}

// ==================== 路由类型 ====================

/// 路由类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// 广播：每个值发往所有输出
    Scatter,
    /// 按位置拆分序列
    Splatter,
    /// 按选择键条件分发
    Select,
    /// 轮询分发
    Spread,
    /// 非确定性合并
    Union,
    /// 同步拼接
    Gather,
    /// 归约
    Collect,
    /// 终端消费
    Sink,
    /// 外部来源通道声明
    In,
}

impl RouteKind {
    /// 全部类型
    pub const ALL: [RouteKind; 9] = [
        RouteKind::Scatter,
        RouteKind::Splatter,
        RouteKind::Select,
        RouteKind::Spread,
        RouteKind::Union,
        RouteKind::Gather,
        RouteKind::Collect,
        RouteKind::Sink,
        RouteKind::In,
    ];

    /// 类型名称
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Scatter => "scatter",
            RouteKind::Splatter => "splatter",
            RouteKind::Select => "select",
            RouteKind::Spread => "spread",
            RouteKind::Union => "union",
            RouteKind::Gather => "gather",
            RouteKind::Collect => "collect",
            RouteKind::Sink => "sink",
            RouteKind::In => "in",
        }
    }

    /// 该类型是否会启动工作者
    pub fn is_dispatchable(&self) -> bool {
        !matches!(self, RouteKind::In)
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        RouteKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::InvalidSpec(format!("未知的路由类型: '{}'", s)))
    }
}

// ==================== 通道槽 ====================

/// 通道槽：别名加可选的变换
#[derive(Clone)]
pub struct ChannelSlot {
    /// 通道别名
    pub alias: Alias,
    /// 变换，缺省为恒等
    pub transform: Option<Transform>,
}

impl ChannelSlot {
    /// 仅有别名的槽
    pub fn new(alias: impl Into<Alias>) -> Self {
        Self {
            alias: alias.into(),
            transform: None,
        }
    }

    /// 带变换的槽
    pub fn with_transform<F>(alias: impl Into<Alias>, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            alias: alias.into(),
            transform: Some(Arc::new(transform)),
        }
    }

    /// 取得变换，没有时返回恒等变换
    pub fn transform_or_identity(&self) -> Transform {
        self.transform.clone().unwrap_or_else(identity)
    }
}

impl From<&str> for ChannelSlot {
    fn from(alias: &str) -> Self {
        ChannelSlot::new(alias)
    }
}

impl From<String> for ChannelSlot {
    fn from(alias: String) -> Self {
        ChannelSlot::new(alias)
    }
}

impl fmt::Debug for ChannelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSlot")
            .field("alias", &self.alias)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// select 路由的输出槽
#[derive(Clone, Debug)]
pub struct SelectSlot {
    /// 通道槽
    pub slot: ChannelSlot,
    /// 选择键等于该值时接收
    pub selector_value: Value,
}

impl SelectSlot {
    /// 创建选择槽
    pub fn new(slot: impl Into<ChannelSlot>, selector_value: Value) -> Self {
        Self {
            slot: slot.into(),
            selector_value,
        }
    }

    /// 别名
    pub fn alias(&self) -> &str {
        &self.slot.alias
    }
}

// ==================== 路由规格 ====================

/// 路由规格
///
/// 由外部构造后不再修改。
#[derive(Clone)]
pub enum RouteSpec {
    /// 广播
    Scatter {
        input: Alias,
        outputs: Vec<ChannelSlot>,
    },
    /// 按位置拆分
    Splatter {
        input: Alias,
        outputs: Vec<ChannelSlot>,
    },
    /// 轮询分发
    Spread {
        input: Alias,
        outputs: Vec<ChannelSlot>,
    },
    /// 条件分发
    Select {
        input: Alias,
        outputs: Vec<SelectSlot>,
        selector: Selector,
    },
    /// 非确定性合并
    Union {
        inputs: Vec<Alias>,
        output: ChannelSlot,
    },
    /// 同步拼接
    Gather {
        inputs: Vec<Alias>,
        output: ChannelSlot,
    },
    /// 归约
    Collect {
        input: Alias,
        output: ChannelSlot,
        reducer: Reducer,
        initial: Value,
    },
    /// 终端消费
    Sink { input: Alias, sink: SinkFn },
    /// 外部来源通道声明
    In { slots: Vec<ChannelSlot> },
}

fn slots<S: Into<ChannelSlot>>(outputs: impl IntoIterator<Item = S>) -> Vec<ChannelSlot> {
    outputs.into_iter().map(Into::into).collect()
}

fn aliases<S: Into<Alias>>(inputs: impl IntoIterator<Item = S>) -> Vec<Alias> {
    inputs.into_iter().map(Into::into).collect()
}

impl RouteSpec {
    /// 构造 scatter 规格
    pub fn scatter<S: Into<ChannelSlot>>(
        input: impl Into<Alias>,
        outputs: impl IntoIterator<Item = S>,
    ) -> Self {
        RouteSpec::Scatter {
            input: input.into(),
            outputs: slots(outputs),
        }
    }

    /// 构造 splatter 规格
    pub fn splatter<S: Into<ChannelSlot>>(
        input: impl Into<Alias>,
        outputs: impl IntoIterator<Item = S>,
    ) -> Self {
        RouteSpec::Splatter {
            input: input.into(),
            outputs: slots(outputs),
        }
    }

    /// 构造 spread 规格
    pub fn spread<S: Into<ChannelSlot>>(
        input: impl Into<Alias>,
        outputs: impl IntoIterator<Item = S>,
    ) -> Self {
        RouteSpec::Spread {
            input: input.into(),
            outputs: slots(outputs),
        }
    }

    /// 构造 select 规格
    pub fn select<F>(input: impl Into<Alias>, outputs: Vec<SelectSlot>, selector: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        RouteSpec::Select {
            input: input.into(),
            outputs,
            selector: Arc::new(selector),
        }
    }

    /// 构造 union 规格
    pub fn union<A: Into<Alias>>(
        inputs: impl IntoIterator<Item = A>,
        output: impl Into<ChannelSlot>,
    ) -> Self {
        RouteSpec::Union {
            inputs: aliases(inputs),
            output: output.into(),
        }
    }

    /// 构造 gather 规格
    pub fn gather<A: Into<Alias>>(
        inputs: impl IntoIterator<Item = A>,
        output: impl Into<ChannelSlot>,
    ) -> Self {
        RouteSpec::Gather {
            inputs: aliases(inputs),
            output: output.into(),
        }
    }

    /// 构造 collect 规格
    pub fn collect<F>(
        input: impl Into<Alias>,
        output: impl Into<ChannelSlot>,
        reducer: F,
        initial: Value,
    ) -> Self
    where
        F: Fn(Value, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        RouteSpec::Collect {
            input: input.into(),
            output: output.into(),
            reducer: Arc::new(reducer),
            initial,
        }
    }

    /// 构造 sink 规格
    pub fn sink<F>(input: impl Into<Alias>, sink: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        RouteSpec::Sink {
            input: input.into(),
            sink: Arc::new(sink),
        }
    }

    /// 构造 in 声明
    pub fn declare<S: Into<ChannelSlot>>(declared: impl IntoIterator<Item = S>) -> Self {
        RouteSpec::In {
            slots: slots(declared),
        }
    }

    /// 路由类型
    pub fn kind(&self) -> RouteKind {
        match self {
            RouteSpec::Scatter { .. } => RouteKind::Scatter,
            RouteSpec::Splatter { .. } => RouteKind::Splatter,
            RouteSpec::Spread { .. } => RouteKind::Spread,
            RouteSpec::Select { .. } => RouteKind::Select,
            RouteSpec::Union { .. } => RouteKind::Union,
            RouteSpec::Gather { .. } => RouteKind::Gather,
            RouteSpec::Collect { .. } => RouteKind::Collect,
            RouteSpec::Sink { .. } => RouteKind::Sink,
            RouteSpec::In { .. } => RouteKind::In,
        }
    }

    /// 读取的别名（按声明顺序）
    pub fn input_aliases(&self) -> Vec<&str> {
        match self {
            RouteSpec::Scatter { input, .. }
            | RouteSpec::Splatter { input, .. }
            | RouteSpec::Spread { input, .. }
            | RouteSpec::Select { input, .. }
            | RouteSpec::Collect { input, .. }
            | RouteSpec::Sink { input, .. } => vec![input.as_str()],
            RouteSpec::Union { inputs, .. } | RouteSpec::Gather { inputs, .. } => {
                inputs.iter().map(String::as_str).collect()
            }
            RouteSpec::In { .. } => Vec::new(),
        }
    }

    /// 声明的通道槽（输出槽，`in` 则为其声明的槽）
    pub fn output_slots(&self) -> Vec<&ChannelSlot> {
        match self {
            RouteSpec::Scatter { outputs, .. }
            | RouteSpec::Splatter { outputs, .. }
            | RouteSpec::Spread { outputs, .. } => outputs.iter().collect(),
            RouteSpec::Select { outputs, .. } => outputs.iter().map(|o| &o.slot).collect(),
            RouteSpec::Union { output, .. }
            | RouteSpec::Gather { output, .. }
            | RouteSpec::Collect { output, .. } => vec![output],
            RouteSpec::In { slots } => slots.iter().collect(),
            RouteSpec::Sink { .. } => Vec::new(),
        }
    }

    /// 检查规格能否启动工作者
    pub fn validate(&self) -> Result<()> {
        match self {
            RouteSpec::In { .. } => Err(CoreError::InvalidSpec(
                "in 仅声明外部通道，不能启动工作者".to_string(),
            )),
            RouteSpec::Spread { outputs, .. } if outputs.is_empty() => Err(
                CoreError::InvalidSpec("spread 至少需要一个输出".to_string()),
            ),
            RouteSpec::Union { inputs, .. } | RouteSpec::Gather { inputs, .. }
                if inputs.is_empty() =>
            {
                Err(CoreError::InvalidSpec(format!(
                    "{} 至少需要一个输入",
                    self.kind()
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: Vec<&str> = self
            .output_slots()
            .into_iter()
            .map(|slot| slot.alias.as_str())
            .collect();
        f.debug_struct("RouteSpec")
            .field("kind", &self.kind())
            .field("inputs", &self.input_aliases())
            .field("outputs", &outputs)
            .finish()
    }
}
