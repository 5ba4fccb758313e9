//! WebSocket 信封
//!
//! 连接上传输的每一条 JSON 记录都带有 `type` 判别字段。入站信封在边界处一次性
//! 解码为封闭的枚举，未知的 `type` 走显式的 [`EnvelopeError::UnknownType`] 分支。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 客户端发来的信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEnvelope {
    /// 必须是连接上的第一条信封
    Join {
        #[serde(default)]
        token: Option<String>,
    },
    /// 全局频道消息
    Chat {
        content: String,
        #[serde(default)]
        time: Option<String>,
    },
    /// 私信，`to` 为接收方用户名
    Private {
        content: String,
        to: String,
        #[serde(default)]
        time: Option<String>,
    },
}

impl ClientEnvelope {
    /// 解码一条文本帧
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        RawEnvelope::parse(text)?.decode()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Chat { .. } => "chat",
            Self::Private { .. } => "private",
        }
    }
}

/// 已解析为 JSON、尚未按 `type` 解码的入站帧
///
/// 路由需要先看判别字段决定是否要求连接已认证，再做完整解码。
#[derive(Debug, Clone)]
pub struct RawEnvelope {
    value: Value,
}

impl RawEnvelope {
    const TAGS: [&'static str; 3] = ["join", "chat", "private"];

    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(text)
            .map(|value| Self { value })
            .map_err(|err| EnvelopeError::malformed(err.to_string()))
    }

    /// `type` 判别字段；缺失或不是字符串时为 `None`
    pub fn tag(&self) -> Option<&str> {
        self.value.get("type").and_then(Value::as_str)
    }

    pub fn is_join(&self) -> bool {
        self.tag() == Some("join")
    }

    pub fn decode(self) -> Result<ClientEnvelope, EnvelopeError> {
        let tag = self
            .tag()
            .ok_or_else(|| EnvelopeError::malformed("missing type discriminator"))?;

        if !Self::TAGS.contains(&tag) {
            return Err(EnvelopeError::UnknownType(tag.to_owned()));
        }

        serde_json::from_value(self.value).map_err(|err| EnvelopeError::malformed(err.to_string()))
    }
}

/// 服务端发出的信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEnvelope {
    /// 广播给所有已注册连接
    Chat {
        username: String,
        message: String,
        time: String,
    },
    /// 投递给发送方以及在线的接收方
    Private {
        from: String,
        content: String,
        time: String,
    },
    /// 在线用户列表
    OnlineUsers { users: Vec<String> },
    /// 仅发送给出错的连接
    Error { message: String },
}

impl ServerEnvelope {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl EnvelopeError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}
