//! Bounded notification queue
//!
//! Notifications are appended in creation order and auto-dismissed once
//! their duration has elapsed. The queue holds at most `capacity` entries;
//! pushing onto a full queue drops the oldest one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Notification queue options
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of live notifications
    pub capacity: usize,

    /// Default display duration; 0 keeps a notification until dismissed
    pub duration_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: 20,
            duration_ms: 3000,
        }
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    /// Title used when none is given
    pub fn default_title(&self) -> &'static str {
        match self {
            NotificationKind::Success => "Success",
            NotificationKind::Error => "Error",
            NotificationKind::Warning => "Warning",
            NotificationKind::Info => "Info",
        }
    }
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,

    /// Creation time, ms since epoch
    pub created_ms: u64,

    /// 0 means sticky
    pub duration_ms: u64,
}

impl Notification {
    /// Whether the notification should be gone at `now_ms`
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.duration_ms > 0 && now_ms.saturating_sub(self.created_ms) >= self.duration_ms
    }
}

/// Current wall-clock time in ms since epoch
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Bounded, time-ordered notification queue
pub struct NotificationQueue {
    options: Options,
    entries: RwLock<VecDeque<Notification>>,
    next_id: AtomicU64,
}

impl NotificationQueue {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            entries: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a notification with the default title and duration
    pub fn push(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, kind.default_title(), message, self.options.duration_ms, now_ms())
    }

    /// Append a notification created at `created_ms`
    pub fn push_at(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        duration_ms: u64,
        created_ms: u64,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let notification = Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            created_ms,
            duration_ms,
        };
        debug!("Notification {} [{:?}]: {}", id, kind, notification.message);

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        while self.options.capacity > 0 && entries.len() >= self.options.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
        id
    }

    /// Remove a notification. Returns false if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter().position(|n| n.id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drop expired notifications, returning them in creation order
    pub fn prune(&self, now_ms: u64) -> Vec<Notification> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let (expired, live): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|n| n.is_expired(now_ms));
        entries.extend(live);
        expired
    }

    /// Remove and return everything, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Options::default())
    }
}
