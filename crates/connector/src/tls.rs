//! Alpha连接的TLS配置
//!
//! 只允许TLS 1.2和固定的ECDHE密码套件。信任锚来自 `cert_chain`，
//! 启用双向认证时附带客户端证书和私钥。

use std::path::Path;
use std::sync::Arc;

use omega_core::{AlphaClusterConfig, OmegaError, OmegaResult};
use rustls::crypto::ring::{cipher_suite, default_provider};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use tracing::info;

/// 按集群配置构建rustls客户端配置
pub fn build_client_tls_config(config: &AlphaClusterConfig) -> OmegaResult<ClientConfig> {
    let chain_path = config
        .cert_chain
        .as_deref()
        .ok_or_else(|| OmegaError::Configuration("启用SSL时必须提供证书链".to_string()))?;

    let mut root_store = RootCertStore::empty();
    for cert in read_certificates(chain_path)? {
        root_store
            .add(cert)
            .map_err(|e| OmegaError::Configuration(format!("无效的CA证书: {e}")))?;
    }

    let builder = ClientConfig::builder_with_provider(Arc::new(allowed_provider()))
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(|e| OmegaError::Configuration(format!("TLS协议配置失败: {e}")))?
        .with_root_certificates(root_store);

    let tls = if config.enable_mutual_auth {
        let cert_path = config
            .cert
            .as_deref()
            .ok_or_else(|| OmegaError::Configuration("双向认证需要客户端证书".to_string()))?;
        let key_path = config
            .key
            .as_deref()
            .ok_or_else(|| OmegaError::Configuration("双向认证需要客户端私钥".to_string()))?;

        let certs = read_certificates(cert_path)?;
        let key_pem = read_file(key_path)?;
        let key = PrivateKeyDer::from_pem_slice(&key_pem).map_err(|e| {
            OmegaError::Configuration(format!("无法解析私钥 {}: {e}", key_path.display()))
        })?;

        builder
            .with_client_auth_cert(certs, key)
            .map_err(|e| OmegaError::Configuration(format!("客户端证书配置失败: {e}")))?
    } else {
        builder.with_no_client_auth()
    };

    info!(
        "TLS已启用 (双向认证: {})",
        if config.enable_mutual_auth { "是" } else { "否" }
    );
    Ok(tls)
}

fn allowed_provider() -> CryptoProvider {
    CryptoProvider {
        cipher_suites: vec![
            cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
            cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        ],
        ..default_provider()
    }
}

fn read_file(path: &Path) -> OmegaResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        OmegaError::Configuration(format!("无法读取文件 {}: {e}", path.display()))
    })
}

fn read_certificates(path: &Path) -> OmegaResult<Vec<CertificateDer<'static>>> {
    let pem = read_file(path)?;
    let certs = CertificateDer::pem_slice_iter(&pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            OmegaError::Configuration(format!("无法解析证书 {}: {e}", path.display()))
        })?;

    if certs.is_empty() {
        return Err(OmegaError::Configuration(format!(
            "证书文件中没有证书: {}",
            path.display()
        )));
    }
    Ok(certs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_allow_list() {
        let provider = allowed_provider();
        let names: Vec<_> = provider
            .cipher_suites
            .iter()
            .map(|suite| format!("{:?}", suite.suite()))
            .collect();

        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|name| name.contains("ECDHE")));
    }

    #[test]
    fn test_missing_chain_is_configuration_error() {
        let config = AlphaClusterConfig {
            enable_ssl: true,
            ..AlphaClusterConfig::plaintext(vec!["alpha:8080".to_string()])
        };

        let err = build_client_tls_config(&config).unwrap_err();
        assert!(matches!(err, OmegaError::Configuration(_)));
    }
}
