//! Surfaces owned outside the session core that it calls into: the
//! notification sink, the system clipboard, and the authentication redirect.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::utils::clipboard::copy_to_clipboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Copy,
    Info,
}

/// Transient, dismissible user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), String>;
}

/// Navigation owned by the authentication collaborator.
pub trait AuthRedirect: Send + Sync {
    /// Address the client is currently showing.
    fn current_location(&self) -> String;

    /// Replace the whole client view with `target`.
    fn redirect(&self, target: &str);
}

/// Notifier that prints to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => eprintln!("❌ {message}"),
            NotificationKind::Copy => println!("📋 {message}"),
            NotificationKind::Info => println!("{message}"),
        }
    }
}

/// Clipboard backed by the platform copy commands.
pub struct SystemClipboard;

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), String> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || copy_to_clipboard(&text))
            .await
            .map_err(|err| format!("Clipboard task failed: {err}"))?
    }
}

/// Redirect target for a terminal client: remembers where it was sent and
/// tells the user to sign in again.
pub struct TerminalRedirect {
    location: Mutex<String>,
}

impl TerminalRedirect {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
        }
    }
}

impl AuthRedirect for TerminalRedirect {
    fn current_location(&self) -> String {
        match self.location.lock() {
            Ok(location) => location.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn redirect(&self, target: &str) {
        info!(redirect_to = target, "redirecting to authentication");
        match self.location.lock() {
            Ok(mut location) => *location = target.to_string(),
            Err(poisoned) => *poisoned.into_inner() = target.to_string(),
        }
        warn!("session expired; run `devochat login` to sign in again");
    }
}
