use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSource {
    Extraction,
    Search,
    Composition,
}

/// A user-facing report about a degraded remote call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub source: NoticeSource,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, source: NoticeSource, message: impl Into<String>) -> Self {
        Self { level, source, message: message.into(), occurred_at: Utc::now() }
    }

    pub fn warning(source: NoticeSource, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, source, message)
    }

    pub fn error(source: NoticeSource, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, source, message)
    }
}

pub trait NoticeSink: Send + Sync {
    fn emit(&self, notice: Notice);
}

#[derive(Clone, Default)]
pub struct InMemoryNoticeSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl InMemoryNoticeSink {
    pub fn notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns everything emitted so far and leaves the sink empty.
    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NoticeSink for InMemoryNoticeSink {
    fn emit(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
