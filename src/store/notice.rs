//! 用户提示
//!
//! 存储层在写操作完成后发布提示，由界面决定如何展示。

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 提示接收方
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    fn success(&self, message: &str) {
        self.notify(Notice::success(message));
    }

    fn error(&self, message: &str) {
        self.notify(Notice::error(message));
    }
}

/// 队列最多保留的提示数，超出时丢弃最旧的
pub const NOTICE_QUEUE_CAPACITY: usize = 100;

/// 缓冲提示，供界面轮询取出
#[derive(Debug, Default)]
pub struct NoticeQueue {
    inner: Mutex<VecDeque<Notice>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出全部待展示提示
    pub fn drain(&self) -> Vec<Notice> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NoticeQueue {
    fn notify(&self, notice: Notice) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        while guard.len() >= NOTICE_QUEUE_CAPACITY {
            guard.pop_front();
        }
        guard.push_back(notice);
    }
}

/// 仅写日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("[Notice] {}", notice.message),
            NoticeLevel::Error => warn!("[Notice] {}", notice.message),
        }
    }
}
