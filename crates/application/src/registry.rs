//! 连接注册表
//!
//! 进程内唯一的“连接 -> 已认证身份”映射，是“谁在线”的唯一数据源。
//! 所有读写都经由同一把锁，读者不会看到写到一半的映射。

use std::collections::{hash_map::Entry, HashMap, HashSet};

use domain::{Identity, ServerEnvelope};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::connection::{ConnectionHandle, ConnectionId};

struct RegistryEntry {
    identity: Identity,
    handle: ConnectionHandle,
    /// 首次注册时的序号，决定在线列表中的位置
    position: u64,
    /// 最近一次注册时的序号，用于同名连接的取舍
    registered: u64,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<ConnectionId, RegistryEntry>,
    sequence: u64,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖连接对应的条目；覆盖时保留原有位置
    pub async fn register(&self, handle: &ConnectionHandle, identity: Identity) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.sequence += 1;
        let sequence = state.sequence;

        match state.entries.entry(handle.id()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.identity = identity;
                entry.handle = handle.clone();
                entry.registered = sequence;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RegistryEntry {
                    identity,
                    handle: handle.clone(),
                    position: sequence,
                    registered: sequence,
                });
            }
        }

        info!(
            connection_id = %handle.id(),
            online = state.entries.len(),
            "connection registered"
        );
    }

    /// 移除条目并返回原身份；条目不存在时什么也不做
    pub async fn unregister(&self, id: ConnectionId) -> Option<Identity> {
        let mut state = self.state.write().await;
        let removed = state.entries.remove(&id).map(|entry| entry.identity);
        if removed.is_some() {
            info!(connection_id = %id, online = state.entries.len(), "connection unregistered");
        }
        removed
    }

    pub async fn lookup(&self, id: ConnectionId) -> Option<Identity> {
        let state = self.state.read().await;
        state.entries.get(&id).map(|entry| entry.identity.clone())
    }

    /// 按用户名查找仍然打开的连接；同名多连接时取最近注册的那一个
    pub async fn find_connection(&self, username: &str) -> Option<ConnectionHandle> {
        let state = self.state.read().await;
        state
            .entries
            .values()
            .filter(|entry| entry.identity.username.as_str() == username && entry.handle.is_open())
            .max_by_key(|entry| entry.registered)
            .map(|entry| entry.handle.clone())
    }

    /// 在线用户名列表，按首次注册顺序排列，同名只出现一次
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut entries: Vec<&RegistryEntry> = state.entries.values().collect();
        entries.sort_by_key(|entry| entry.position);

        let mut seen = HashSet::new();
        entries
            .into_iter()
            .map(|entry| entry.identity.username.as_str())
            .filter(|username| seen.insert(*username))
            .map(str::to_owned)
            .collect()
    }

    /// 向所有已注册且仍打开的连接尽力投递，返回成功投递的连接数
    ///
    /// 某个连接投递失败只会被跳过，不影响其余连接。
    pub async fn broadcast(&self, envelope: &ServerEnvelope) -> usize {
        let state = self.state.read().await;
        let mut entries: Vec<&RegistryEntry> = state.entries.values().collect();
        entries.sort_by_key(|entry| entry.position);

        let mut delivered = 0;
        for entry in entries {
            match entry.handle.send(envelope.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => debug!(error = %err, "skipping closed connection during broadcast"),
            }
        }
        delivered
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
