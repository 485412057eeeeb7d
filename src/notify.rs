use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const MAX_TOASTS: usize = 4;

/// Fire-and-forget user feedback. Handed to whatever needs to report an
/// outcome instead of reaching for a global.
pub trait Notifier {
    fn success(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub expires_at: Instant,
}

/// Toast queue shared between the coordinator (writer) and the renderer
/// (reader). Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct ToastCenter {
    queue: Arc<Mutex<VecDeque<Toast>>>,
    lifetime: Duration,
}

impl ToastCenter {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            lifetime,
        }
    }

    pub fn push(&self, level: ToastLevel, message: &str) {
        self.push_at(level, message, Instant::now());
    }

    pub fn push_at(&self, level: ToastLevel, message: &str, now: Instant) {
        let mut queue = self.queue.lock();
        queue.push_back(Toast {
            level,
            message: message.to_string(),
            expires_at: now + self.lifetime,
        });
        while queue.len() > MAX_TOASTS {
            queue.pop_front();
        }
    }

    pub fn prune(&self, now: Instant) {
        self.queue.lock().retain(|toast| toast.expires_at > now);
    }

    pub fn active(&self) -> Vec<Toast> {
        self.queue.lock().iter().cloned().collect()
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.queue.lock().iter().map(|toast| toast.expires_at).min()
    }
}

impl Notifier for ToastCenter {
    fn success(&mut self, message: &str) {
        tracing::info!(%message, "notify success");
        self.push(ToastLevel::Success, message);
    }

    fn error(&mut self, message: &str) {
        tracing::warn!(%message, "notify error");
        self.push(ToastLevel::Error, message);
    }
}

/// Notifier for one-shot CLI commands.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&mut self, message: &str) {
        tracing::info!(%message, "notify success");
        println!("{message}");
    }

    fn error(&mut self, message: &str) {
        tracing::warn!(%message, "notify error");
        eprintln!("{message}");
    }
}
