//! 配置模型
//!
//! - **cluster**: Alpha集群地址与传输安全选项
//! - **app_config**: 进程级配置，支持TOML文件与 `OMEGA_` 前缀的环境变量覆盖

pub mod app_config;
pub mod cluster;

pub use app_config::{ConnectorConfig, ObservabilityConfig, OmegaConfig, ServiceSection};
pub use cluster::AlphaClusterConfig;
