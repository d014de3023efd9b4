use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use omega_connector::{HttpSenderOptions, LoadBalancedClusterSender};
use omega_core::{CompensateCommand, MessageSender, OmegaConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("omega")
        .version("1.0.0")
        .about("Saga参与方 Alpha集群连接器")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/omega.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/omega.toml");

    // 加载配置
    let config = OmegaConfig::load(Some(config_path))
        .with_context(|| format!("加载配置文件失败: {config_path}"))?;

    let log_level = matches
        .get_one::<String>("log-level")
        .unwrap_or(&config.observability.log_level);
    let log_format = matches
        .get_one::<String>("log-format")
        .unwrap_or(&config.observability.log_format);

    // 初始化日志系统
    init_logging(log_level, log_format)?;

    info!("启动Omega连接器");
    info!("配置文件: {config_path}");
    info!("Alpha集群: {}", config.alpha_cluster.addresses.join(","));

    let host = hostname::get()
        .context("获取主机名失败")?
        .to_string_lossy()
        .into_owned();
    let service_config = config.service.to_service_config(&host);

    let handler = Arc::new(|command: CompensateCommand| {
        info!(
            "收到补偿命令: globalTxId={}, localTxId={}, method={}",
            command.global_tx_id, command.local_tx_id, command.compensation_method
        );
    });

    let sender = LoadBalancedClusterSender::new(
        &config.alpha_cluster,
        service_config,
        handler,
        HttpSenderOptions::from(&config.connector),
        config.connector.reconnect_delay(),
    )
    .context("创建Alpha集群发送器失败")?;

    sender.on_connected().await.context("连接Alpha集群失败")?;

    // 等待关闭信号
    wait_for_shutdown_signal().await;

    info!("收到关闭信号，开始优雅关闭...");

    let shutdown = async {
        if let Err(e) = sender.on_disconnected().await {
            error!("断开Alpha集群失败: {e}");
        }
        sender.close().await;
    };

    match tokio::time::timeout(Duration::from_secs(30), shutdown).await {
        Ok(()) => info!("Omega连接器已优雅关闭"),
        Err(_) => warn!("关闭超时，强制退出"),
    }

    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
