//! Test data builders for creating transaction events

use omega_core::{EventType, TxEvent};

use crate::helpers::TestEnv;

/// Builder for creating test TxEvent values
pub struct TxEventBuilder {
    event: TxEvent,
}

impl TxEventBuilder {
    pub fn new() -> Self {
        Self {
            event: TxEvent::new(
                EventType::TxStartedEvent,
                TestEnv::unique_name("globalTxId"),
                TestEnv::unique_name("localTxId"),
                Some(TestEnv::unique_name("parentTxId")),
                "compensate",
                b"blah".to_vec(),
            ),
        }
    }

    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event.event_type = event_type;
        self
    }

    pub fn with_global_tx_id(mut self, global_tx_id: &str) -> Self {
        self.event.global_tx_id = global_tx_id.to_string();
        self
    }

    pub fn with_local_tx_id(mut self, local_tx_id: &str) -> Self {
        self.event.local_tx_id = local_tx_id.to_string();
        self
    }

    pub fn with_compensation_method(mut self, method: &str) -> Self {
        self.event.compensation_method = method.to_string();
        self
    }

    pub fn with_payloads(mut self, payloads: &[u8]) -> Self {
        self.event.payloads = payloads.to_vec();
        self
    }

    pub fn aborted(self) -> Self {
        self.with_type(EventType::TxAbortedEvent)
    }

    pub fn build(self) -> TxEvent {
        self.event
    }
}

impl Default for TxEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}
