use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    SagaStartedEvent,
    TxStartedEvent,
    TxEndedEvent,
    TxAbortedEvent,
    TxCompensatedEvent,
    SagaEndedEvent,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::SagaStartedEvent => "SagaStartedEvent",
            EventType::TxStartedEvent => "TxStartedEvent",
            EventType::TxEndedEvent => "TxEndedEvent",
            EventType::TxAbortedEvent => "TxAbortedEvent",
            EventType::TxCompensatedEvent => "TxCompensatedEvent",
            EventType::SagaEndedEvent => "SagaEndedEvent",
        };
        f.write_str(name)
    }
}

/// 事务事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TxEvent {
    pub created_at: DateTime<Utc>,
    pub event_type: EventType,
    pub global_tx_id: String,
    pub local_tx_id: String,
    pub parent_tx_id: Option<String>,
    pub compensation_method: String,
    /// 超时时间（秒），0 表示不超时
    pub timeout: i32,
    pub retry_method: String,
    pub retries: i32,
    pub payloads: Vec<u8>,
}

impl TxEvent {
    pub fn new(
        event_type: EventType,
        global_tx_id: impl Into<String>,
        local_tx_id: impl Into<String>,
        parent_tx_id: Option<String>,
        compensation_method: impl Into<String>,
        payloads: Vec<u8>,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            event_type,
            global_tx_id: global_tx_id.into(),
            local_tx_id: local_tx_id.into(),
            parent_tx_id,
            compensation_method: compensation_method.into(),
            timeout: 0,
            retry_method: String::new(),
            retries: 0,
            payloads,
        }
    }

    pub fn with_timeout(mut self, timeout: i32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retry_method: impl Into<String>, retries: i32) -> Self {
        self.retry_method = retry_method.into();
        self.retries = retries;
        self
    }
}

impl fmt::Display for TxEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TxEvent{{type={}, globalTxId={}, localTxId={}, parentTxId={}, compensationMethod={}}}",
            self.event_type,
            self.global_tx_id,
            self.local_tx_id,
            self.parent_tx_id.as_deref().unwrap_or(""),
            self.compensation_method
        )
    }
}

/// Alpha应答
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlphaResponse {
    pub aborted: bool,
}

impl AlphaResponse {
    pub fn new(aborted: bool) -> Self {
        Self { aborted }
    }
}
