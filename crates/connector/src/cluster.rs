use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use omega_core::{
    AlphaClusterConfig, AlphaResponse, MessageHandler, MessageSender, OmegaError, OmegaResult,
    ServiceConfig, TxEvent,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::fallback::BlockingFallbackSender;
use crate::http_sender::{ConnectionLostHook, HttpEndpointSender, HttpSenderOptions};
use crate::latency::{EndpointId, EndpointStatus, LatencyTable};
use crate::reconnect::{QuarantineProtocol, ReconnectTask, ReconnectWorker};
use crate::selector::{select_fastest, Selection};
use crate::tls::build_client_tls_config;

/// 面向Alpha集群的负载均衡发送器
///
/// 每次发送选择延迟最低的健康端点；端点失败时隔离并换下一个端点重试，
/// 全部端点被隔离时阻塞等待后台重连成功。应用层拒绝直接返回，不重试。
///
/// 构造时会启动后台重连工作者，必须在Tokio运行时内调用。
pub struct LoadBalancedClusterSender {
    target: String,
    protocol: Arc<QuarantineProtocol>,
    fallback: BlockingFallbackSender,
    worker: ReconnectWorker,
    shutdown: CancellationToken,
}

impl LoadBalancedClusterSender {
    /// 按集群配置为每个地址创建HTTP发送器
    pub fn new(
        config: &AlphaClusterConfig,
        service_config: ServiceConfig,
        handler: Arc<dyn MessageHandler>,
        options: HttpSenderOptions,
        reconnect_delay: Duration,
    ) -> OmegaResult<Self> {
        config.validate()?;

        let tls = if config.enable_ssl {
            Some(build_client_tls_config(config)?)
        } else {
            None
        };
        let options = HttpSenderOptions {
            use_tls: config.enable_ssl,
            ..options
        };
        let client = HttpEndpointSender::build_client(options.request_timeout, tls.as_ref())?;

        let (pending_tx, pending_rx) = mpsc::unbounded_channel();

        let protocol = Arc::new_cyclic(|protocol: &Weak<QuarantineProtocol>| {
            let senders = config
                .addresses
                .iter()
                .enumerate()
                .map(|(id, address)| {
                    let sender: Arc<dyn MessageSender> = Arc::new(HttpEndpointSender::new(
                        address.trim(),
                        client.clone(),
                        service_config.clone(),
                        Arc::clone(&handler),
                        options,
                        connection_lost_hook(protocol.clone(), id),
                    ));
                    sender
                })
                .collect();
            QuarantineProtocol::new(Arc::new(LatencyTable::new(senders)), pending_tx)
        });

        info!(
            "创建Alpha集群发送器: {} (服务: {}, 实例: {})",
            config.addresses.join(","),
            service_config.service_name,
            service_config.instance_id
        );
        Ok(Self::assemble(protocol, pending_rx, reconnect_delay))
    }

    /// 使用已有的端点发送器创建集群发送器
    pub fn from_senders(
        senders: Vec<Arc<dyn MessageSender>>,
        reconnect_delay: Duration,
    ) -> OmegaResult<Self> {
        if senders.is_empty() {
            return Err(OmegaError::Configuration(
                "未提供任何可用的Alpha集群地址".to_string(),
            ));
        }

        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let table = Arc::new(LatencyTable::new(senders));
        let protocol = Arc::new(QuarantineProtocol::new(table, pending_tx));

        Ok(Self::assemble(protocol, pending_rx, reconnect_delay))
    }

    fn assemble(
        protocol: Arc<QuarantineProtocol>,
        pending_rx: UnboundedReceiver<ReconnectTask>,
        reconnect_delay: Duration,
    ) -> Self {
        let target = protocol
            .table()
            .entries()
            .iter()
            .map(|entry| entry.target())
            .collect::<Vec<_>>()
            .join(",");
        let shutdown = CancellationToken::new();
        let worker = ReconnectWorker::start(pending_rx, reconnect_delay, shutdown.child_token());
        let fallback = BlockingFallbackSender::new(Arc::clone(&protocol));

        Self {
            target,
            protocol,
            fallback,
            worker,
            shutdown,
        }
    }

    /// 发送事件，直到成功、被拒绝或被取消
    pub async fn send_with_cancellation(
        &self,
        event: &TxEvent,
        cancel: &CancellationToken,
    ) -> OmegaResult<AlphaResponse> {
        let table = self.protocol.table();

        while !cancel.is_cancelled() && !self.shutdown.is_cancelled() {
            match select_fastest(table) {
                Selection::Endpoint(id) => {
                    let Some(entry) = table.entry(id) else {
                        continue;
                    };

                    let started = Instant::now();
                    match entry.sender().send(event).await {
                        Ok(response) => {
                            let elapsed = started.elapsed();
                            entry.record_latency(elapsed);
                            histogram!("omega_alpha_send_latency_seconds")
                                .record(elapsed.as_secs_f64());
                            return Ok(response);
                        }
                        Err(e) if !e.is_transport() => return Err(e),
                        Err(e) => {
                            error!("发送事件 {} 到Alpha {} 失败: {}", event, entry.target(), e);
                            counter!("omega_alpha_send_failures_total").increment(1);
                            self.protocol.quarantine(id);
                        }
                    }
                }
                Selection::Fallback => {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = self.shutdown.cancelled() => break,
                        result = self.fallback.send(event) => result,
                    };

                    match result {
                        Ok(response) => return Ok(response),
                        Err(e) if !e.is_transport() => return Err(e),
                        Err(e) => {
                            error!("兜底发送事件 {} 失败: {}", event, e);
                            counter!("omega_alpha_send_failures_total").increment(1);
                        }
                    }
                }
            }
        }

        Err(OmegaError::Interrupted {
            event: event.to_string(),
        })
    }

    /// 当前最快的健康端点及其延迟
    pub fn fastest_endpoint(&self) -> Option<(String, Duration)> {
        let table = self.protocol.table();
        match select_fastest(table) {
            Selection::Endpoint(id) => {
                let entry = table.entry(id)?;
                let latency = entry.state().latency()?;
                Some((entry.target().to_string(), latency))
            }
            Selection::Fallback => None,
        }
    }

    pub fn endpoint_statuses(&self) -> Vec<EndpointStatus> {
        self.protocol.table().snapshot()
    }

    /// 报告端点异步断线，走与发送失败相同的隔离流程
    pub fn report_connection_lost(&self, target: &str) -> bool {
        self.protocol.quarantine_target(target)
    }
}

fn connection_lost_hook(protocol: Weak<QuarantineProtocol>, id: EndpointId) -> ConnectionLostHook {
    Arc::new(move || match protocol.upgrade() {
        Some(protocol) => {
            protocol.quarantine(id);
        }
        None => debug!("集群发送器已释放，忽略断线通知"),
    })
}

#[async_trait]
impl MessageSender for LoadBalancedClusterSender {
    fn target(&self) -> &str {
        &self.target
    }

    async fn on_connected(&self) -> OmegaResult<()> {
        let entries = self.protocol.table().entries();
        let results = join_all(entries.iter().map(|entry| entry.sender().on_connected())).await;

        for (entry, result) in entries.iter().zip(results) {
            if let Err(e) = result {
                error!("连接Alpha {} 失败: {}", entry.target(), e);
            }
        }
        Ok(())
    }

    async fn on_disconnected(&self) -> OmegaResult<()> {
        let entries = self.protocol.table().entries();
        let results =
            join_all(entries.iter().map(|entry| entry.sender().on_disconnected())).await;

        for (entry, result) in entries.iter().zip(results) {
            if let Err(e) = result {
                error!("断开Alpha {} 失败: {}", entry.target(), e);
            }
        }
        Ok(())
    }

    async fn send(&self, event: &TxEvent) -> OmegaResult<AlphaResponse> {
        self.send_with_cancellation(event, &self.shutdown).await
    }

    async fn close(&self) {
        self.shutdown.cancel();
        self.worker.stop().await;

        for entry in self.protocol.table().entries() {
            entry.sender().close().await;
        }
        info!("Alpha集群发送器已关闭");
    }
}
