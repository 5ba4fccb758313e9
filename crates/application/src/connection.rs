//! 单个 WebSocket 连接在核心中的句柄
//!
//! 句柄持有连接出站队列的发送端，传输层的写任务负责把队列中的信封写入套接字。
//! 写任务结束（连接关闭或出错）后接收端被丢弃，之后的投递会失败并被跳过。

use std::fmt;

use domain::ServerEnvelope;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// 连接唯一标识，仅在进程内有效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerEnvelope>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerEnvelope>,
}

impl ConnectionHandle {
    /// 创建句柄以及交给写任务的出站接收端
    pub fn open() -> (Self, OutboundReceiver) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                outbound,
            },
            receiver,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// 尽力投递，不阻塞、不重试
    pub fn send(&self, envelope: ServerEnvelope) -> Result<(), TransportError> {
        self.outbound
            .send(envelope)
            .map_err(|_| TransportError::Closed(self.id))
    }
}
