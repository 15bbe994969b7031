//! Publishing read-only snapshots of a session.
//!
//! A publish run captures the visible transcript, strips interactive
//! controls from the copy, uploads it with the page's style sources, and
//! hands the public link to the clipboard.

pub mod render;

use std::collections::{HashSet, VecDeque};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::api::client::{ApiError, ServiceClient};
use crate::api::UploadPageRequest;
use crate::auth::{expired_login_target, is_auth_screen};
use crate::core::collaborators::{AuthRedirect, Clipboard, NotificationKind, Notifier};
use crate::utils::url::share_url;

use self::render::{collect_stylesheets, sanitize, serialize, RenderNode, StyleElement};

pub const LINK_COPIED_MESSAGE: &str = "Share link copied!";

/// How many recently issued ids a publisher remembers for collision checks.
pub const ISSUED_ID_MEMORY: usize = 1024;

/// Recently issued ids, oldest first, capped at [`ISSUED_ID_MEMORY`].
#[derive(Debug, Default)]
struct IssuedIds {
    order: VecDeque<ShareId>,
    seen: HashSet<ShareId>,
}

impl IssuedIds {
    fn insert(&mut self, id: ShareId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > ISSUED_ID_MEMORY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// 128-bit random share identifier, rendered as a version-4 UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShareId([u8; 16]);

impl ShareId {
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut bytes = [0_u8; 16];
        getrandom::fill(&mut bytes)?;
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if matches!(index, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Sanitized markup plus the style sources needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCapture {
    pub html: String,
    pub stylesheets: Vec<String>,
}

pub fn capture(
    root: &RenderNode,
    styles: &[StyleElement],
    strip_classes: &[String],
) -> SnapshotCapture {
    SnapshotCapture {
        html: serialize(&sanitize(root, strip_classes)),
        stylesheets: collect_stylesheets(styles),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub unique_id: String,
    pub url: String,
}

#[derive(Debug)]
pub enum PublishError {
    /// No content root was supplied.
    MissingContent,
    /// The system random source failed.
    Entropy(String),
    /// The session expired; the client was sent to the login screen.
    SessionExpired,
    /// The service refused the upload.
    Rejected(String),
    /// The upload never completed.
    Upload(ApiError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::MissingContent => write!(f, "There is no conversation content to share."),
            PublishError::Entropy(reason) => write!(f, "Could not generate a share id: {reason}"),
            PublishError::SessionExpired => write!(f, "Session expired."),
            PublishError::Rejected(message) => write!(f, "{message}"),
            PublishError::Upload(err) => write!(f, "{}", err.user_message()),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PublishError::Upload(err) => Some(err),
            _ => None,
        }
    }
}

/// Remote publication endpoint.
#[async_trait]
pub trait SnapshotUploader: Send + Sync {
    async fn upload(&self, request: &UploadPageRequest) -> Result<(), ApiError>;
}

#[async_trait]
impl SnapshotUploader for ServiceClient {
    async fn upload(&self, request: &UploadPageRequest) -> Result<(), ApiError> {
        self.upload_page(request).await
    }
}

pub struct SnapshotPublisher {
    uploader: Arc<dyn SnapshotUploader>,
    clipboard: Arc<dyn Clipboard>,
    notifier: Arc<dyn Notifier>,
    redirect: Arc<dyn AuthRedirect>,
    share_domain: String,
    strip_classes: Vec<String>,
    issued: Mutex<IssuedIds>,
}

impl SnapshotPublisher {
    pub fn new(
        uploader: Arc<dyn SnapshotUploader>,
        clipboard: Arc<dyn Clipboard>,
        notifier: Arc<dyn Notifier>,
        redirect: Arc<dyn AuthRedirect>,
        share_domain: impl Into<String>,
        strip_classes: Vec<String>,
    ) -> Self {
        Self {
            uploader,
            clipboard,
            notifier,
            redirect,
            share_domain: share_domain.into(),
            strip_classes,
            issued: Mutex::new(IssuedIds::default()),
        }
    }

    /// Identifiers are never handed out twice within the remembered window,
    /// even after a failed upload.
    pub fn issue_id(&self) -> Result<ShareId, PublishError> {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let id = ShareId::generate().map_err(|err| PublishError::Entropy(err.to_string()))?;
            if issued.insert(id) {
                return Ok(id);
            }
            warn!(%id, "share id collision, drawing again");
        }
    }

    /// Number of remembered ids, at most [`ISSUED_ID_MEMORY`].
    pub fn issued_count(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Publish `content` under `title`.
    ///
    /// The link is copied before the upload settles; a clipboard failure is
    /// logged and never stops the upload. A 401 sends the client to the
    /// login screen (unless it is already there) and ends the run.
    pub async fn publish(
        &self,
        content: Option<&RenderNode>,
        styles: &[StyleElement],
        title: &str,
    ) -> Result<PublishReceipt, PublishError> {
        let root = content.ok_or(PublishError::MissingContent)?;
        let unique_id = self.issue_id()?.to_string();
        let SnapshotCapture { html, stylesheets } = capture(root, styles, &self.strip_classes);
        let url = share_url(&self.share_domain, &unique_id);
        debug!(%unique_id, html_len = html.len(), styles = stylesheets.len(), "snapshot captured");

        let request = UploadPageRequest {
            unique_id: unique_id.clone(),
            html,
            stylesheets,
            title: title.to_string(),
        };

        let copy_link = async {
            match self.clipboard.write_text(&url).await {
                Ok(()) => self.notifier.notify(NotificationKind::Copy, LINK_COPIED_MESSAGE),
                Err(err) => warn!(error = %err, "copying share link failed"),
            }
        };
        let ((), upload) = tokio::join!(copy_link, self.uploader.upload(&request));

        match upload {
            Ok(()) => {
                info!(%unique_id, "snapshot published");
                Ok(PublishReceipt { unique_id, url })
            }
            Err(ApiError::Unauthenticated) => {
                let location = self.redirect.current_location();
                if !is_auth_screen(&location) {
                    self.redirect.redirect(&expired_login_target());
                }
                Err(PublishError::SessionExpired)
            }
            Err(ApiError::Rejected { status, message }) => {
                warn!(status, %message, "snapshot upload rejected");
                self.notifier.notify(NotificationKind::Error, &message);
                Err(PublishError::Rejected(message))
            }
            Err(err) => {
                warn!(error = %err, "snapshot upload failed");
                self.notifier
                    .notify(NotificationKind::Error, &err.user_message());
                Err(PublishError::Upload(err))
            }
        }
    }
}
