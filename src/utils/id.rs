//! 路由工作者 ID 生成
//!
//! 每次 dispatch 都会为工作者分配一个 ID，格式为 `<路由类型>-<10 位 62 进制串>`，
//! 例如 `scatter-3fK9a01bZq`，用于日志关联和错误报告。

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::router::spec::RouteKind;

/// 62 进制字符集
const BASE62_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 随机部分长度
const SUFFIX_LENGTH: usize = 10;

/// 生成 10 位 62 进制串（时间戳与随机数混合）
fn base62_suffix() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let mut value = timestamp ^ rand::thread_rng().gen::<u64>();

    let mut out = [0u8; SUFFIX_LENGTH];
    for slot in out.iter_mut().rev() {
        *slot = BASE62_CHARS[(value % 62) as usize];
        value /= 62;
    }
    out.iter().map(|&b| b as char).collect()
}

/// 为指定类型的路由生成工作者 ID
///
/// # Example
///
/// ```
/// use chips_flow::router::RouteKind;
/// use chips_flow::utils::id::generate_route_id;
///
/// let id = generate_route_id(RouteKind::Scatter);
/// assert!(id.starts_with("scatter-"));
/// ```
pub fn generate_route_id(kind: RouteKind) -> String {
    format!("{}-{}", kind, base62_suffix())
}

/// 检查是否为合法的工作者 ID
pub fn is_valid_route_id(id: &str) -> bool {
    let Some((kind, suffix)) = id.rsplit_once('-') else {
        return false;
    };
    kind.parse::<RouteKind>().is_ok()
        && suffix.len() == SUFFIX_LENGTH
        && suffix.chars().all(|c| c.is_ascii_alphanumeric())
}
