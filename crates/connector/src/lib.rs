//! # Omega Connector
//!
//! 面向Alpha协调者集群的客户端发送层。
//!
//! ## 组成
//!
//! - [`LoadBalancedClusterSender`]: 选择延迟最低的健康端点发送事件，失败时隔离并重试
//! - [`LatencyTable`] / [`select_fastest`]: 端点延迟表与选择策略
//! - [`QuarantineProtocol`] / [`ReconnectWorker`]: 隔离端点并在后台按固定间隔重连
//! - [`BlockingFallbackSender`]: 全部端点不可用时等待下一个恢复的端点
//! - [`HttpEndpointSender`]: 通过HTTP与单个Alpha节点通信
//! - [`build_client_tls_config`]: TLS 1.2 客户端配置
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use omega_connector::{HttpSenderOptions, LoadBalancedClusterSender};
//! use omega_core::{AlphaClusterConfig, CompensateCommand, ConnectorConfig, MessageSender, ServiceConfig};
//!
//! # async fn example() -> omega_core::OmegaResult<()> {
//! let cluster = AlphaClusterConfig::plaintext(vec!["alpha-1:8080".into(), "alpha-2:8080".into()]);
//! let connector = ConnectorConfig::default();
//! let sender = LoadBalancedClusterSender::new(
//!     &cluster,
//!     ServiceConfig::new("order-service", "order-service-1"),
//!     Arc::new(|command: CompensateCommand| println!("compensate {}", command.local_tx_id)),
//!     HttpSenderOptions::from(&connector),
//!     Duration::from_secs(3),
//! )?;
//! sender.on_connected().await?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod fallback;
pub mod http_sender;
pub mod latency;
pub mod reconnect;
pub mod selector;
pub mod tls;

pub use cluster::LoadBalancedClusterSender;
pub use fallback::BlockingFallbackSender;
pub use http_sender::{ConnectionLostHook, HttpEndpointSender, HttpSenderOptions};
pub use latency::{EndpointEntry, EndpointId, EndpointState, EndpointStatus, LatencyTable};
pub use reconnect::{QuarantineProtocol, ReconnectTask, ReconnectWorker};
pub use selector::{select_fastest, Selection};
pub use tls::build_client_tls_config;
