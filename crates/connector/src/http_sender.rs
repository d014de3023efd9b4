use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use omega_core::{
    AlphaResponse, CompensateCommand, ConnectorConfig, MessageHandler, MessageSender, OmegaError,
    OmegaResult, ServiceConfig, TxEvent,
};
use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 端点异步断线时的回调
pub type ConnectionLostHook = Arc<dyn Fn() + Send + Sync>;

/// HTTP发送器参数
#[derive(Debug, Clone, Copy)]
pub struct HttpSenderOptions {
    pub request_timeout: Duration,
    pub command_poll_interval: Duration,
    pub use_tls: bool,
}

impl From<&ConnectorConfig> for HttpSenderOptions {
    fn from(config: &ConnectorConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            command_poll_interval: config.command_poll_interval(),
            use_tls: false,
        }
    }
}

/// 通过HTTP与单个Alpha节点通信的发送器
pub struct HttpEndpointSender {
    target: String,
    base_url: String,
    client: reqwest::Client,
    service_config: ServiceConfig,
    handler: Arc<dyn MessageHandler>,
    poll_interval: Duration,
    on_connection_lost: ConnectionLostHook,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl HttpEndpointSender {
    pub fn new(
        target: impl Into<String>,
        client: reqwest::Client,
        service_config: ServiceConfig,
        handler: Arc<dyn MessageHandler>,
        options: HttpSenderOptions,
        on_connection_lost: ConnectionLostHook,
    ) -> Self {
        let target = target.into();
        let base_url = base_url(&target, options.use_tls);
        Self {
            target,
            base_url,
            client,
            service_config,
            handler,
            poll_interval: options.command_poll_interval,
            on_connection_lost,
            poller: Mutex::new(None),
        }
    }

    /// 构建HTTP客户端，启用TLS时使用共享的rustls配置
    pub fn build_client(
        request_timeout: Duration,
        tls: Option<&rustls::ClientConfig>,
    ) -> OmegaResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(request_timeout);
        if let Some(tls) = tls {
            builder = builder.use_preconfigured_tls(tls.clone());
        }
        builder
            .build()
            .map_err(|e| OmegaError::Configuration(format!("创建HTTP客户端失败: {e}")))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_service(&self, path: &str) -> OmegaResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&self.service_config)
            .send()
            .await
            .map_err(|e| OmegaError::Transport(format!("连接Alpha {} 失败: {e}", self.target)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(OmegaError::Transport(format!(
                "Alpha {} 返回 HTTP {status} - {body}",
                self.target
            )))
        }
    }

    fn start_poller(&self) {
        let client = self.client.clone();
        let url = format!("{}/api/v1/omega/commands", self.base_url);
        let query = [
            ("service_name", self.service_config.service_name.clone()),
            ("instance_id", self.service_config.instance_id.clone()),
        ];
        let handler = Arc::clone(&self.handler);
        let on_connection_lost = Arc::clone(&self.on_connection_lost);
        let target = self.target.clone();
        let period = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match fetch_commands(&client, &url, &query).await {
                    Ok(commands) => {
                        for command in commands {
                            debug!("收到补偿命令: {} 来自 {}", command.local_tx_id, target);
                            handler.on_receive(command);
                        }
                    }
                    Err(e) => {
                        error!("拉取Alpha {} 补偿命令失败: {}", target, e);
                        on_connection_lost();
                        break;
                    }
                }
            }
        });

        if let Some(previous) = self.poller_slot().replace(handle) {
            previous.abort();
        }
    }

    fn stop_poller(&self) {
        if let Some(handle) = self.poller_slot().take() {
            handle.abort();
        }
    }

    fn poller_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn fetch_commands(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> OmegaResult<Vec<CompensateCommand>> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| OmegaError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(OmegaError::Transport(format!("HTTP {}", response.status())));
    }

    response
        .json::<Vec<CompensateCommand>>()
        .await
        .map_err(|e| OmegaError::Serialization(e.to_string()))
}

/// 把 `host:port` 形式的地址补全为URL，已带协议的地址保持不变
pub fn base_url(target: &str, use_tls: bool) -> String {
    let trimmed = target.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if use_tls {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    }
}

#[async_trait]
impl MessageSender for HttpEndpointSender {
    fn target(&self) -> &str {
        &self.target
    }

    async fn on_connected(&self) -> OmegaResult<()> {
        self.post_service("/api/v1/omega/connect").await?;
        self.start_poller();
        info!("已连接Alpha: {}", self.target);
        Ok(())
    }

    async fn on_disconnected(&self) -> OmegaResult<()> {
        self.stop_poller();
        self.post_service("/api/v1/omega/disconnect").await?;
        info!("已断开Alpha: {}", self.target);
        Ok(())
    }

    async fn send(&self, event: &TxEvent) -> OmegaResult<AlphaResponse> {
        let url = format!("{}/api/v1/omega/events", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(event)
            .send()
            .await
            .map_err(|e| OmegaError::Transport(format!("发送到Alpha {} 失败: {e}", self.target)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<AlphaResponse>()
                .await
                .map_err(|e| OmegaError::Serialization(format!("解析Alpha响应失败: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                warn!("Alpha {} 拒绝事件 {}: {}", self.target, event, body);
                Err(OmegaError::Rejected(body))
            }
            _ => Err(OmegaError::Transport(format!(
                "Alpha {} 返回 HTTP {status} - {body}",
                self.target
            ))),
        }
    }

    async fn close(&self) {
        self.stop_poller();
    }
}

impl Drop for HttpEndpointSender {
    fn drop(&mut self) {
        self.stop_poller();
    }
}
