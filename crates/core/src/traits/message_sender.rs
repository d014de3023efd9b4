use async_trait::async_trait;

use crate::{
    models::{AlphaResponse, TxEvent},
    OmegaResult,
};

/// 事件发送抽象接口
///
/// 单个Alpha端点、集群分发器以及兜底阻塞发送器都实现该接口。
/// `send` 的错误必须能区分应用层拒绝 ([`crate::OmegaError::Rejected`]) 与传输故障。
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// 目标地址，仅用于诊断
    fn target(&self) -> &str;

    /// 向Alpha声明参与方已连接
    async fn on_connected(&self) -> OmegaResult<()>;

    /// 向Alpha声明参与方已断开
    async fn on_disconnected(&self) -> OmegaResult<()>;

    /// 发送事务事件
    async fn send(&self, event: &TxEvent) -> OmegaResult<AlphaResponse>;

    /// 立即关闭底层连接
    async fn close(&self);
}
