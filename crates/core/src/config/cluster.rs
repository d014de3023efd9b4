use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{OmegaError, OmegaResult};

/// Alpha集群配置，启动时构造一次，之后不再修改
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlphaClusterConfig {
    /// Alpha地址列表，`host:port` 或完整URL
    pub addresses: Vec<String>,
    #[serde(default)]
    pub enable_ssl: bool,
    #[serde(default)]
    pub enable_mutual_auth: bool,
    /// 客户端证书（双向认证时必填）
    #[serde(default)]
    pub cert: Option<PathBuf>,
    /// 客户端私钥（双向认证时必填）
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// 信任的CA证书链（启用SSL时必填）
    #[serde(default)]
    pub cert_chain: Option<PathBuf>,
}

impl AlphaClusterConfig {
    pub fn plaintext(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> OmegaResult<()> {
        if self.addresses.is_empty() {
            return Err(OmegaError::Configuration(
                "未提供任何可用的Alpha集群地址".to_string(),
            ));
        }

        if self.addresses.iter().any(|address| address.trim().is_empty()) {
            return Err(OmegaError::Configuration("Alpha地址不能为空字符串".to_string()));
        }

        if self.enable_ssl && self.cert_chain.is_none() {
            return Err(OmegaError::Configuration(
                "启用SSL时必须配置cert_chain".to_string(),
            ));
        }

        if self.enable_ssl && self.enable_mutual_auth && (self.cert.is_none() || self.key.is_none())
        {
            return Err(OmegaError::Configuration(
                "启用双向认证时必须同时配置cert和key".to_string(),
            ));
        }

        Ok(())
    }
}
