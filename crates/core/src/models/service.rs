use serde::{Deserialize, Serialize};

/// 参与方的服务标识，连接和断开时发送给Alpha
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service_name: String,
    pub instance_id: String,
}

impl ServiceConfig {
    pub fn new(service_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            instance_id: instance_id.into(),
        }
    }

    /// 以 `服务名-主机名` 作为实例ID
    pub fn for_host(service_name: impl Into<String>, host: &str) -> Self {
        let service_name = service_name.into();
        let instance_id = format!("{service_name}-{host}");
        Self {
            service_name,
            instance_id,
        }
    }
}
