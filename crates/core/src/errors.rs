use thiserror::Error;

/// Omega连接器错误类型定义
#[derive(Debug, Error)]
pub enum OmegaError {
    #[error("配置错误: {0}")]
    Configuration(String),

    /// Alpha明确拒绝了该事件，不可重试
    #[error("Alpha拒绝了事件: {0}")]
    Rejected(String),

    #[error("传输错误: {0}")]
    Transport(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("发送事件 {event} 被中断")]
    Interrupted { event: String },

    #[error("内部错误: {0}")]
    Internal(String),
}

impl OmegaError {
    /// 是否为应用层拒绝
    pub fn is_rejection(&self) -> bool {
        matches!(self, OmegaError::Rejected(_))
    }

    /// 是否为传输层故障，传输故障会导致端点被隔离并重试其他端点
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            OmegaError::Transport(_) | OmegaError::Serialization(_) | OmegaError::Internal(_)
        )
    }
}

impl From<serde_json::Error> for OmegaError {
    fn from(e: serde_json::Error) -> Self {
        OmegaError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type OmegaResult<T> = std::result::Result<T, OmegaError>;
