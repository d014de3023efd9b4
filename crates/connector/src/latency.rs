//! 端点延迟表
//!
//! 每个Alpha端点对应一个表项，表项集合在构造时固定。
//! 每个表项的状态由独立的锁保护，不同表项之间没有事务，允许读到略旧的路由状态。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use omega_core::MessageSender;

/// 端点在延迟表中的下标
pub type EndpointId = usize;

/// 端点状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// 可被选中，携带最近一次发送的耗时
    Healthy(Duration),
    /// 已隔离，等待重连成功
    Quarantined,
}

impl EndpointState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, EndpointState::Healthy(_))
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            EndpointState::Healthy(latency) => Some(*latency),
            EndpointState::Quarantined => None,
        }
    }
}

#[derive(Debug)]
struct EntryState {
    state: EndpointState,
    reconnect_outstanding: bool,
}

/// 端点诊断快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub target: String,
    pub state: EndpointState,
}

pub struct EndpointEntry {
    id: EndpointId,
    sender: Arc<dyn MessageSender>,
    state: RwLock<EntryState>,
}

impl EndpointEntry {
    fn new(id: EndpointId, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            id,
            sender,
            state: RwLock::new(EntryState {
                state: EndpointState::Healthy(Duration::ZERO),
                reconnect_outstanding: false,
            }),
        }
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn sender(&self) -> &Arc<dyn MessageSender> {
        &self.sender
    }

    pub fn target(&self) -> &str {
        self.sender.target()
    }

    pub fn state(&self) -> EndpointState {
        self.read().state
    }

    pub fn has_outstanding_reconnect(&self) -> bool {
        self.read().reconnect_outstanding
    }

    /// 记录一次成功发送的耗时
    ///
    /// 已隔离的端点保持隔离，只有重连成功才能恢复。返回是否写入。
    pub fn record_latency(&self, elapsed: Duration) -> bool {
        let mut guard = self.write();
        if guard.state.is_healthy() {
            guard.state = EndpointState::Healthy(elapsed);
            true
        } else {
            false
        }
    }

    /// 隔离端点，返回调用方是否需要发起新的重连任务
    pub(crate) fn quarantine(&self) -> bool {
        let mut guard = self.write();
        guard.state = EndpointState::Quarantined;
        if guard.reconnect_outstanding {
            false
        } else {
            guard.reconnect_outstanding = true;
            true
        }
    }

    /// 重连成功后恢复为最优分数
    pub(crate) fn restore(&self) {
        let mut guard = self.write();
        guard.state = EndpointState::Healthy(Duration::ZERO);
        guard.reconnect_outstanding = false;
    }

    /// 重连任务无法再执行时释放占位
    pub(crate) fn abandon_reconnect(&self) {
        self.write().reconnect_outstanding = false;
    }

    fn read(&self) -> RwLockReadGuard<'_, EntryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 端点 → 延迟状态的并发映射
pub struct LatencyTable {
    entries: Vec<EndpointEntry>,
}

impl LatencyTable {
    pub fn new(senders: Vec<Arc<dyn MessageSender>>) -> Self {
        let entries = senders
            .into_iter()
            .enumerate()
            .map(|(id, sender)| EndpointEntry::new(id, sender))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: EndpointId) -> Option<&EndpointEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &[EndpointEntry] {
        &self.entries
    }

    pub fn find_by_target(&self, target: &str) -> Option<&EndpointEntry> {
        self.entries.iter().find(|entry| entry.target() == target)
    }

    pub fn snapshot(&self) -> Vec<EndpointStatus> {
        self.entries
            .iter()
            .map(|entry| EndpointStatus {
                target: entry.target().to_string(),
                state: entry.state(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omega_testing_utils::MockMessageSender;

    fn table(targets: &[&str]) -> LatencyTable {
        LatencyTable::new(
            targets
                .iter()
                .map(|t| Arc::new(MockMessageSender::new(*t)) as Arc<dyn MessageSender>)
                .collect(),
        )
    }

    #[test]
    fn test_entries_start_healthy_with_best_score() {
        let table = table(&["a", "b"]);
        assert_eq!(table.len(), 2);
        for status in table.snapshot() {
            assert_eq!(status.state, EndpointState::Healthy(Duration::ZERO));
        }
    }

    #[test]
    fn test_quarantine_claims_single_reconnect() {
        let table = table(&["a"]);
        let entry = table.entry(0).unwrap();

        assert!(entry.quarantine());
        assert!(!entry.quarantine());
        assert_eq!(entry.state(), EndpointState::Quarantined);
        assert!(entry.has_outstanding_reconnect());
    }

    #[test]
    fn test_latency_ignored_while_quarantined() {
        let table = table(&["a"]);
        let entry = table.entry(0).unwrap();

        assert!(entry.record_latency(Duration::from_millis(5)));
        assert_eq!(entry.state(), EndpointState::Healthy(Duration::from_millis(5)));

        entry.quarantine();
        assert!(!entry.record_latency(Duration::from_millis(1)));
        assert_eq!(entry.state(), EndpointState::Quarantined);
    }

    #[test]
    fn test_restore_resets_score_and_claim() {
        let table = table(&["a"]);
        let entry = table.entry(0).unwrap();
        entry.record_latency(Duration::from_millis(40));
        entry.quarantine();

        entry.restore();
        assert_eq!(entry.state(), EndpointState::Healthy(Duration::ZERO));
        assert!(!entry.has_outstanding_reconnect());
        assert!(entry.quarantine());
    }

    #[test]
    fn test_find_by_target() {
        let table = table(&["alpha-1:8080", "alpha-2:8080"]);
        assert_eq!(table.find_by_target("alpha-2:8080").unwrap().id(), 1);
        assert!(table.find_by_target("alpha-3:8080").is_none());
    }
}
