//! 兜底阻塞发送器
//!
//! 所有端点都被隔离时使用：等待后台重连恢复任一端点，
//! 然后重新选择最快的健康端点发送事件。一次恢复会唤醒所有等待者。

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use omega_core::{AlphaResponse, MessageSender, OmegaError, OmegaResult, TxEvent};
use tracing::{debug, warn};

use crate::latency::EndpointId;
use crate::reconnect::QuarantineProtocol;
use crate::selector::{select_fastest, Selection};

pub const FALLBACK_TARGET: &str = "fallback";

pub struct BlockingFallbackSender {
    protocol: Arc<QuarantineProtocol>,
}

impl BlockingFallbackSender {
    pub fn new(protocol: Arc<QuarantineProtocol>) -> Self {
        Self { protocol }
    }

    /// 等待直到存在健康端点
    ///
    /// 先订阅恢复信号再检查延迟表，检查之后发生的恢复不会被错过。
    async fn next_available(&self) -> OmegaResult<EndpointId> {
        loop {
            let mut recoveries = self.protocol.subscribe_recoveries();
            if let Selection::Endpoint(id) = select_fastest(self.protocol.table()) {
                return Ok(id);
            }

            recoveries
                .changed()
                .await
                .map_err(|_| OmegaError::Internal("端点恢复通知已关闭".to_string()))?;
            debug!("收到端点恢复通知，重新选择端点");
        }
    }
}

#[async_trait]
impl MessageSender for BlockingFallbackSender {
    fn target(&self) -> &str {
        FALLBACK_TARGET
    }

    async fn on_connected(&self) -> OmegaResult<()> {
        Ok(())
    }

    async fn on_disconnected(&self) -> OmegaResult<()> {
        Ok(())
    }

    async fn send(&self, event: &TxEvent) -> OmegaResult<AlphaResponse> {
        let id = self.next_available().await?;
        let table = self.protocol.table();
        let entry = table
            .entry(id)
            .ok_or_else(|| OmegaError::Internal(format!("未知端点: {id}")))?;

        debug!("兜底发送器使用Alpha {} 发送事件 {}", entry.target(), event);

        let started = Instant::now();
        match entry.sender().send(event).await {
            Ok(response) => {
                entry.record_latency(started.elapsed());
                Ok(response)
            }
            Err(e) if !e.is_transport() => Err(e),
            Err(e) => {
                warn!("兜底发送到Alpha {} 失败: {}", entry.target(), e);
                self.protocol.quarantine(id);
                Err(e)
            }
        }
    }

    async fn close(&self) {}
}
