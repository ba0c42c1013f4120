//! 通道注册表
//!
//! 别名 -> 通道句柄 的只读查找表。由拓扑构建者一次性填充，
//! 之后在 dispatch 时被各路由并发读取。

use std::collections::HashMap;

use tracing::debug;

use super::channel::Channel;
use super::normalizer::AliasMap;
use super::spec::Alias;
use crate::utils::{CoreError, Result};

/// 通道注册表
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<Alias, Channel>,
}

impl ChannelRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 按别名映射分配通道，每个别名挂上其变换
    pub fn allocate(aliases: &AliasMap, capacity: usize) -> Self {
        let mut registry = Self::new();
        for (alias, transform) in aliases.iter() {
            registry.insert(Channel::with_transform(
                alias.clone(),
                capacity,
                transform.clone(),
            ));
        }
        debug!(channel_count = registry.len(), capacity, "通道注册表已分配");
        registry
    }

    /// 以通道自身的别名注册，返回被替换的旧通道
    pub fn insert(&mut self, channel: Channel) -> Option<Channel> {
        self.channels.insert(channel.alias().to_string(), channel)
    }

    /// 查询通道
    pub fn get(&self, alias: &str) -> Option<&Channel> {
        self.channels.get(alias)
    }

    /// 解析别名，缺失时返回配置错误
    pub fn resolve(&self, alias: &str) -> Result<Channel> {
        self.channels
            .get(alias)
            .cloned()
            .ok_or_else(|| CoreError::ChannelNotFound(alias.to_string()))
    }

    /// 是否包含别名
    pub fn contains(&self, alias: &str) -> bool {
        self.channels.contains_key(alias)
    }

    /// 通道数量
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// 所有别名（已排序）
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }
}

impl FromIterator<Channel> for ChannelRegistry {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut registry = Self::new();
        for channel in iter {
            registry.insert(channel);
        }
        registry
    }
}
