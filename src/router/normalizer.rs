//! 别名规范化
//!
//! 给出一条路由规格声明的全部通道别名及其变换，供外部拓扑构建者分配通道。
//! sink 不声明任何别名：它的输入由上游路由负责声明。

use std::collections::HashMap;

use super::spec::{Alias, ChannelSlot, RouteSpec, Transform};

/// 别名 -> 变换 映射
#[derive(Clone, Default)]
pub struct AliasMap {
    entries: HashMap<Alias, Transform>,
}

impl AliasMap {
    /// 创建空映射
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一个槽，缺省变换补为恒等
    pub fn insert_slot(&mut self, slot: &ChannelSlot) {
        self.entries
            .insert(slot.alias.clone(), slot.transform_or_identity());
    }

    /// 合并另一个映射，同名别名以 `other` 为准
    pub fn extend(&mut self, other: AliasMap) {
        self.entries.extend(other.entries);
    }

    /// 查询别名的变换
    pub fn get(&self, alias: &str) -> Option<&Transform> {
        self.entries.get(alias)
    }

    /// 是否包含别名
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// 别名数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有别名（已排序，便于日志和测试）
    pub fn aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// 遍历 (别名, 变换)
    pub fn iter(&self) -> impl Iterator<Item = (&Alias, &Transform)> {
        self.entries.iter()
    }
}

impl std::fmt::Debug for AliasMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasMap")
            .field("aliases", &self.aliases())
            .finish()
    }
}

/// 规范化一条路由规格
///
/// - scatter / splatter / select / spread：全部输出槽
/// - union / gather / collect：唯一的输出槽
/// - in：声明的全部槽
/// - sink：空映射
///
/// # Example
///
/// ```
/// use chips_flow::router::{normalize, RouteSpec};
///
/// let map = normalize(&RouteSpec::scatter("a", ["b", "c"]));
/// assert_eq!(map.aliases(), vec!["b", "c"]);
/// ```
pub fn normalize(spec: &RouteSpec) -> AliasMap {
    let mut map = AliasMap::new();
    for slot in spec.output_slots() {
        map.insert_slot(slot);
    }
    map
}

/// 规范化一组路由规格并合并结果
pub fn normalize_all<'a>(specs: impl IntoIterator<Item = &'a RouteSpec>) -> AliasMap {
    specs.into_iter().fold(AliasMap::new(), |mut acc, spec| {
        acc.extend(normalize(spec));
        acc
    })
}
