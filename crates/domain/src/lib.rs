//! 聊天服务核心领域模型
//!
//! 包含用户、持久化消息记录、WebSocket 信封等核心类型，以及相关的校验规则。

pub mod envelope;
pub mod errors;
pub mod message;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use envelope::*;
pub use errors::*;
pub use message::*;
pub use user::*;
pub use value_objects::*;
