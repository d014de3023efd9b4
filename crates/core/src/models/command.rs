use serde::{Deserialize, Serialize};

/// Alpha下发的补偿命令
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompensateCommand {
    pub global_tx_id: String,
    pub local_tx_id: String,
    pub parent_tx_id: Option<String>,
    pub compensation_method: String,
    #[serde(default)]
    pub payloads: Vec<u8>,
}
