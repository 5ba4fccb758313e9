use chrono::{Local, Utc};
use domain::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// 服务器本地时区的 24 小时制 `HH:MM`，用于客户端未提供 `time` 时的默认值
    fn wall_clock_label(&self) -> String {
        self.now().with_timezone(&Local).format("%H:%M").to_string()
    }
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
