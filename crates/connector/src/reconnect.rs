//! 端点隔离与后台重连
//!
//! 发送失败的端点被标记为隔离，并向待重连队列提交一个重连任务。
//! 单个后台工作者按固定间隔串行执行重连任务：成功则恢复端点并广播恢复信号，
//! 失败则把任务重新放回待重连队列，直到成功或连接器关闭。
//!
//! 恢复信号是一个 `watch` 代数计数器，只保留最新值，无人等待时不会堆积。

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::latency::{EndpointId, LatencyTable};

/// 针对单个已隔离端点的重连任务
pub struct ReconnectTask {
    id: EndpointId,
    table: Arc<LatencyTable>,
    pending: UnboundedSender<ReconnectTask>,
    recovered: Arc<watch::Sender<u64>>,
}

impl ReconnectTask {
    pub fn endpoint(&self) -> EndpointId {
        self.id
    }

    /// 执行一次重连尝试
    pub async fn run(self) {
        let table = Arc::clone(&self.table);
        let Some(entry) = table.entry(self.id) else {
            return;
        };
        let sender = Arc::clone(entry.sender());

        info!("重新连接Alpha: {}", sender.target());

        if let Err(e) = sender.on_disconnected().await {
            debug!("断开Alpha {} 时出错，继续重连: {}", sender.target(), e);
        }

        match sender.on_connected().await {
            Ok(()) => {
                entry.restore();
                counter!("omega_alpha_reconnects_total", "result" => "success").increment(1);
                // 先恢复再广播，等待者被唤醒时一定能选中该端点
                self.recovered
                    .send_modify(|generation| *generation = generation.wrapping_add(1));
                info!("重新连接Alpha {} 成功", sender.target());
            }
            Err(e) => {
                error!("重新连接Alpha {} 失败: {}", sender.target(), e);
                counter!("omega_alpha_reconnects_total", "result" => "failure").increment(1);
                let pending = self.pending.clone();
                if pending.send(self).is_err() {
                    warn!("重连队列已关闭，放弃重连: {}", sender.target());
                    entry.abandon_reconnect();
                }
            }
        }
    }
}

/// 隔离协议：维护"每个隔离端点最多一个未完成重连任务"
pub struct QuarantineProtocol {
    table: Arc<LatencyTable>,
    pending: UnboundedSender<ReconnectTask>,
    recovered: Arc<watch::Sender<u64>>,
}

impl QuarantineProtocol {
    pub fn new(table: Arc<LatencyTable>, pending: UnboundedSender<ReconnectTask>) -> Self {
        let (recovered, _) = watch::channel(0);
        Self {
            table,
            pending,
            recovered: Arc::new(recovered),
        }
    }

    pub fn table(&self) -> &Arc<LatencyTable> {
        &self.table
    }

    /// 订阅端点恢复信号
    ///
    /// 返回的接收者把当前代数视为已读，之后任何一次重连成功都会唤醒所有订阅者。
    pub fn subscribe_recoveries(&self) -> watch::Receiver<u64> {
        self.recovered.subscribe()
    }

    /// 隔离端点，必要时提交重连任务。返回是否提交了新任务
    pub fn quarantine(&self, id: EndpointId) -> bool {
        let Some(entry) = self.table.entry(id) else {
            return false;
        };

        if !entry.quarantine() {
            debug!("Alpha {} 已在重连中", entry.target());
            return false;
        }

        counter!("omega_alpha_quarantines_total").increment(1);
        warn!("隔离Alpha端点: {}", entry.target());

        let task = ReconnectTask {
            id,
            table: Arc::clone(&self.table),
            pending: self.pending.clone(),
            recovered: Arc::clone(&self.recovered),
        };
        if self.pending.send(task).is_err() {
            warn!("重连队列已关闭，无法调度重连: {}", entry.target());
            entry.abandon_reconnect();
            return false;
        }
        true
    }

    /// 按地址隔离端点，未知地址被忽略
    pub fn quarantine_target(&self, target: &str) -> bool {
        match self.table.find_by_target(target) {
            Some(entry) => self.quarantine(entry.id()),
            None => {
                warn!("未知的Alpha地址: {}", target);
                false
            }
        }
    }
}

/// 单线程重连工作者
pub struct ReconnectWorker {
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectWorker {
    /// 启动工作者，首个任务立即执行，之后每个任务间隔 `delay`
    pub fn start(
        mut pending: UnboundedReceiver<ReconnectTask>,
        delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            loop {
                let task = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    task = pending.recv() => match task {
                        Some(task) => task,
                        None => break,
                    },
                };

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = task.run() => {}
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            info!("重连工作者已停止");
        });

        Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// 停止工作者并等待其退出，可重复调用
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("重连工作者异常退出: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::EndpointState;
    use omega_core::MessageSender;
    use omega_testing_utils::{MockMessageSender, TestEnv};
    use tokio::sync::mpsc;

    fn protocol(
        senders: &[Arc<MockMessageSender>],
    ) -> (QuarantineProtocol, UnboundedReceiver<ReconnectTask>) {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let table = Arc::new(LatencyTable::new(
            senders
                .iter()
                .map(|sender| Arc::clone(sender) as Arc<dyn MessageSender>)
                .collect(),
        ));
        (QuarantineProtocol::new(table, pending_tx), pending_rx)
    }

    #[tokio::test]
    async fn test_single_task_per_quarantine() {
        let (protocol, mut pending) =
            protocol(&[Arc::new(MockMessageSender::new("a"))]);

        assert!(protocol.quarantine(0));
        assert!(!protocol.quarantine(0));
        assert!(pending.try_recv().is_ok());
        assert!(pending.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_successful_reconnect_restores_endpoint() {
        let sender = Arc::new(MockMessageSender::new("a"));
        let (protocol, mut pending) = protocol(&[sender.clone()]);
        let mut recoveries = protocol.subscribe_recoveries();

        protocol.quarantine(0);
        let task = pending.recv().await.unwrap();
        task.run().await;

        assert_eq!(sender.disconnect_calls(), 1);
        assert_eq!(sender.connect_calls(), 1);
        assert_eq!(
            protocol.table().entry(0).unwrap().state(),
            EndpointState::Healthy(Duration::ZERO)
        );
        assert!(recoveries.has_changed().unwrap());
        assert_eq!(*recoveries.borrow_and_update(), 1);
    }

    #[tokio::test]
    async fn test_failed_reconnect_requeues_itself() {
        let sender = Arc::new(MockMessageSender::new("a").fail_connects(1));
        let (protocol, mut pending) = protocol(&[sender.clone()]);
        let recoveries = protocol.subscribe_recoveries();

        protocol.quarantine(0);
        pending.recv().await.unwrap().run().await;

        assert_eq!(
            protocol.table().entry(0).unwrap().state(),
            EndpointState::Quarantined
        );
        assert!(!recoveries.has_changed().unwrap());

        let retry = pending.try_recv().expect("task should be requeued");
        assert_eq!(retry.endpoint(), 0);
        retry.run().await;
        assert!(protocol.table().entry(0).unwrap().state().is_healthy());
    }

    #[tokio::test]
    async fn test_disconnect_failure_does_not_block_reconnect() {
        let sender = Arc::new(MockMessageSender::new("a").fail_disconnects());
        let (protocol, mut pending) = protocol(&[sender.clone()]);

        protocol.quarantine(0);
        pending.recv().await.unwrap().run().await;

        assert!(protocol.table().entry(0).unwrap().state().is_healthy());
    }

    #[tokio::test]
    async fn test_recoveries_without_subscribers_do_not_accumulate() {
        let sender = Arc::new(MockMessageSender::new("a"));
        let (protocol, mut pending) = protocol(&[sender.clone()]);

        for _ in 0..10 {
            protocol.quarantine(0);
            pending.recv().await.unwrap().run().await;
        }

        // 晚到的订阅者只看到最新代数，不会收到积压的历史通知
        let recoveries = protocol.subscribe_recoveries();
        assert_eq!(*recoveries.borrow(), 10);
        assert!(!recoveries.has_changed().unwrap());
        assert_eq!(sender.connect_calls(), 10);
    }

    #[tokio::test]
    async fn test_quarantine_unknown_target_is_ignored() {
        let (protocol, mut pending) =
            protocol(&[Arc::new(MockMessageSender::new("a"))]);

        assert!(!protocol.quarantine_target("b"));
        assert!(pending.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_worker_retries_until_success_and_stops() {
        let sender = Arc::new(MockMessageSender::new("a").fail_connects(2));
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let table = Arc::new(LatencyTable::new(vec![sender.clone() as Arc<dyn MessageSender>]));
        let protocol = QuarantineProtocol::new(Arc::clone(&table), pending_tx);
        let worker = ReconnectWorker::start(
            pending_rx,
            Duration::from_millis(20),
            CancellationToken::new(),
        );

        protocol.quarantine(0);
        let restored = TestEnv::wait_for(
            || table.entry(0).unwrap().state().is_healthy(),
            Duration::from_secs(2),
        )
        .await;
        assert!(restored);
        assert_eq!(sender.connect_calls(), 3);

        worker.stop().await;
        worker.stop().await;
    }
}
