use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::cluster::AlphaClusterConfig;
use crate::models::ServiceConfig;

/// 参与方服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    pub name: String,
    /// 未配置时使用 `服务名-主机名`
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl ServiceSection {
    pub fn to_service_config(&self, host: &str) -> ServiceConfig {
        match &self.instance_id {
            Some(instance_id) => ServiceConfig::new(self.name.clone(), instance_id.clone()),
            None => ServiceConfig::for_host(self.name.clone(), host),
        }
    }
}

/// 连接器运行参数，未配置的字段使用默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// 重连工作器两次重连尝试之间的固定间隔（毫秒）
    pub reconnect_delay_ms: u64,
    /// 单次HTTP请求超时（毫秒）
    pub request_timeout_ms: u64,
    /// 补偿命令轮询间隔（毫秒）
    pub command_poll_interval_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3000,
            request_timeout_ms: 5000,
            command_poll_interval_ms: 1000,
        }
    }
}

impl ConnectorConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_millis(self.command_poll_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay_ms == 0 {
            return Err(anyhow::anyhow!("重连间隔必须大于0"));
        }

        if self.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        if self.command_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("补偿命令轮询间隔必须大于0"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Omega进程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmegaConfig {
    pub service: ServiceSection,
    pub alpha_cluster: AlphaClusterConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl OmegaConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default values
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: OMEGA_, nested keys joined by `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = ConnectorConfig::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("service.name", "omega")?
            .set_default("alpha_cluster.addresses", vec!["localhost:8080"])?
            .set_default("alpha_cluster.enable_ssl", false)?
            .set_default("alpha_cluster.enable_mutual_auth", false)?
            .set_default("connector.reconnect_delay_ms", defaults.reconnect_delay_ms)?
            .set_default("connector.request_timeout_ms", defaults.request_timeout_ms)?
            .set_default(
                "connector.command_poll_interval_ms",
                defaults.command_poll_interval_ms,
            )?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "pretty")?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("OMEGA")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("alpha_cluster.addresses")
                .try_parsing(true),
        );

        let config: OmegaConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: OmegaConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(anyhow::anyhow!("服务名不能为空"));
        }

        self.alpha_cluster
            .validate()
            .context("Alpha集群配置验证失败")?;

        self.connector.validate().context("连接器配置验证失败")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[service]
name = "booking"

[alpha_cluster]
addresses = ["alpha-1:8080", "alpha-2:8080"]

[connector]
reconnect_delay_ms = 500
request_timeout_ms = 2000
command_poll_interval_ms = 200
"#;

    #[test]
    fn test_from_toml() {
        let config = OmegaConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.service.name, "booking");
        assert_eq!(config.alpha_cluster.addresses.len(), 2);
        assert!(!config.alpha_cluster.enable_ssl);
        assert_eq!(config.connector.reconnect_delay(), Duration::from_millis(500));
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_toml_round_trip_keeps_addresses() {
        let config = OmegaConfig::from_toml(SAMPLE).unwrap();
        let rendered = config.to_toml().unwrap();
        let reparsed = OmegaConfig::from_toml(&rendered).unwrap();
        assert_eq!(reparsed.alpha_cluster, config.alpha_cluster);
    }

    #[test]
    fn test_zero_reconnect_delay_rejected() {
        let toml_str = SAMPLE.replace("reconnect_delay_ms = 500", "reconnect_delay_ms = 0");
        assert!(OmegaConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn test_empty_address_list_rejected() {
        let toml_str = SAMPLE.replace(r#"["alpha-1:8080", "alpha-2:8080"]"#, "[]");
        assert!(OmegaConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = OmegaConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.service.name, "booking");
        assert_eq!(config.connector.request_timeout_ms, 2000);
    }

    #[test]
    fn test_partial_connector_section_uses_defaults() {
        let toml_str = r#"
[service]
name = "booking"

[alpha_cluster]
addresses = ["alpha-1:8080"]

[connector]
reconnect_delay_ms = 250

[observability]
log_format = "json"
"#;
        let defaults = ConnectorConfig::default();

        let parsed = OmegaConfig::from_toml(toml_str).unwrap();
        assert_eq!(parsed.connector.reconnect_delay_ms, 250);
        assert_eq!(parsed.connector.request_timeout_ms, defaults.request_timeout_ms);
        assert_eq!(
            parsed.connector.command_poll_interval_ms,
            defaults.command_poll_interval_ms
        );
        assert_eq!(parsed.observability.log_level, "info");
        assert_eq!(parsed.observability.log_format, "json");

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml_str.as_bytes()).unwrap();
        let loaded = OmegaConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(loaded.connector.reconnect_delay_ms, 250);
        assert_eq!(loaded.connector.request_timeout_ms, defaults.request_timeout_ms);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(OmegaConfig::load(Some("/nonexistent/omega.toml")).is_err());
    }

    #[test]
    fn test_service_instance_id_defaults_to_host() {
        let config = OmegaConfig::from_toml(SAMPLE).unwrap();
        let service = config.service.to_service_config("host-a");
        assert_eq!(service.instance_id, "booking-host-a");
    }
}
