use tracing::debug;

use crate::latency::{EndpointId, LatencyTable};

/// 选择结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Endpoint(EndpointId),
    /// 所有端点均被隔离，交由兜底阻塞发送器
    Fallback,
}

/// 在健康端点中选出延迟最低的一个，分数相同时取任意一个
///
/// 每次发送都会重新扫描，端点数量很小，不做缓存。
pub fn select_fastest(table: &LatencyTable) -> Selection {
    let fastest = table
        .entries()
        .iter()
        .filter_map(|entry| entry.state().latency().map(|latency| (entry, latency)))
        .min_by_key(|(_, latency)| *latency);

    match fastest {
        Some((entry, latency)) => {
            debug!("选择Alpha端点: {} (延迟: {:?})", entry.target(), latency);
            Selection::Endpoint(entry.id())
        }
        None => {
            debug!("没有健康的Alpha端点，使用兜底发送器");
            Selection::Fallback
        }
    }
}
