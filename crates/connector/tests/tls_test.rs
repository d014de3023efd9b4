use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use omega_connector::{build_client_tls_config, HttpSenderOptions, LoadBalancedClusterSender};
use omega_core::{AlphaClusterConfig, MessageSender, OmegaError, ServiceConfig};
use omega_testing_utils::RecordingHandler;
use rustls::client::ResolvesClientCert;
use tempfile::TempDir;

struct TestCerts {
    _dir: TempDir,
    cert: PathBuf,
    key: PathBuf,
}

fn write_certs() -> TestCerts {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let dir = TempDir::new().unwrap();
    let cert_path = dir.path().join("client.crt");
    let key_path = dir.path().join("client.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCerts {
        _dir: dir,
        cert: cert_path,
        key: key_path,
    }
}

fn ssl_config(certs: &TestCerts, mutual_auth: bool) -> AlphaClusterConfig {
    AlphaClusterConfig {
        addresses: vec!["localhost:8443".to_string()],
        enable_ssl: true,
        enable_mutual_auth: mutual_auth,
        cert: Some(certs.cert.clone()),
        key: Some(certs.key.clone()),
        cert_chain: Some(certs.cert.clone()),
    }
}

#[test]
fn test_builds_config_with_trust_chain() {
    let certs = write_certs();
    let config = build_client_tls_config(&ssl_config(&certs, false)).unwrap();
    assert!(!config.client_auth_cert_resolver.has_certs());
}

#[test]
fn test_builds_config_with_client_certificate() {
    let certs = write_certs();
    let config = build_client_tls_config(&ssl_config(&certs, true)).unwrap();
    assert!(config.client_auth_cert_resolver.has_certs());
}

#[test]
fn test_unreadable_chain_is_configuration_error() {
    let certs = write_certs();
    let mut config = ssl_config(&certs, false);
    config.cert_chain = Some(PathBuf::from("/nonexistent/ca.crt"));

    let err = build_client_tls_config(&config).unwrap_err();
    assert!(matches!(err, OmegaError::Configuration(_)));
}

#[test]
fn test_chain_without_certificates_is_configuration_error() {
    let certs = write_certs();
    let mut config = ssl_config(&certs, false);
    config.cert_chain = Some(certs.key.clone());

    let err = build_client_tls_config(&config).unwrap_err();
    assert!(matches!(err, OmegaError::Configuration(_)));
}

#[test]
fn test_malformed_key_is_configuration_error() {
    let certs = write_certs();
    std::fs::write(&certs.key, "not a key").unwrap();

    let err = build_client_tls_config(&ssl_config(&certs, true)).unwrap_err();
    assert!(matches!(err, OmegaError::Configuration(_)));
}

#[tokio::test]
async fn test_cluster_sender_builds_with_tls() {
    let certs = write_certs();
    let options = HttpSenderOptions {
        request_timeout: Duration::from_secs(1),
        command_poll_interval: Duration::from_secs(1),
        use_tls: false,
    };

    let cluster = LoadBalancedClusterSender::new(
        &ssl_config(&certs, true),
        ServiceConfig::new("order-service", "order-service-1"),
        Arc::new(RecordingHandler::new()),
        options,
        Duration::from_secs(1),
    )
    .unwrap();

    assert_eq!(cluster.target(), "localhost:8443");
    cluster.close().await;
}

#[tokio::test]
async fn test_cluster_sender_rejects_bad_tls_material() {
    let certs = write_certs();
    let mut config = ssl_config(&certs, false);
    config.cert_chain = Some(PathBuf::from("/nonexistent/ca.crt"));

    let result = LoadBalancedClusterSender::new(
        &config,
        ServiceConfig::new("order-service", "order-service-1"),
        Arc::new(RecordingHandler::new()),
        HttpSenderOptions {
            request_timeout: Duration::from_secs(1),
            command_poll_interval: Duration::from_secs(1),
            use_tls: true,
        },
        Duration::from_secs(1),
    );

    assert!(matches!(result, Err(OmegaError::Configuration(_))));
}
