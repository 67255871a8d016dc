//! Reply rendering.
//!
//! Multi-fragment replies are paced with a fixed delay so the chat UI
//! keeps them in order; the keyboard attaches to the last fragment only.
//! A missing attachment is reported to the user and the flow continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::domain::menu::{ErrorTexts, Keyboard, ReplyFragment};
use crate::domain::session::SessionState;
use crate::domain::template::{self, TemplateError};
use crate::ports::{GatewayError, MessageGateway};

/// Unrecoverable rendering failure; routes to the generic error responder.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Whether the attachment renders inline as an image.
pub fn is_image(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Sends reply fragments through the gateway.
#[derive(Clone)]
pub struct Renderer {
    gateway: Arc<dyn MessageGateway>,
    files_dir: PathBuf,
    pacing: Duration,
}

impl Renderer {
    pub fn new(gateway: Arc<dyn MessageGateway>, files_dir: PathBuf, pacing: Duration) -> Self {
        Self {
            gateway,
            files_dir,
            pacing,
        }
    }

    /// Render and send `fragments` in order. Text goes through template
    /// substitution; the keyboard attaches to the last fragment only.
    pub async fn send_fragments(
        &self,
        state: &SessionState,
        errors: &ErrorTexts,
        user: Uuid,
        fragments: &[ReplyFragment],
        keyboard: Option<&Keyboard>,
    ) -> Result<(), RenderError> {
        let last = fragments.len().saturating_sub(1);
        for (index, fragment) in fragments.iter().enumerate() {
            let attach = if index == last { keyboard } else { None };

            if let Some(text) = fragment.text.as_deref() {
                let rendered = template::render(state, text)?;
                self.gateway.send_text(user, &rendered, attach).await?;
            }

            if let Some(file) = fragment.file.as_deref() {
                self.send_attachment(errors, user, file, fragment.caption.as_deref(), attach)
                    .await;
            }

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }
        Ok(())
    }

    /// Send one attachment, best effort: a file outside the configured
    /// directory or a gateway failure tells the user and moves on.
    async fn send_attachment(
        &self,
        errors: &ErrorTexts,
        user: Uuid,
        file_name: &str,
        caption: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) {
        let Some(path) = self.resolve_attachment(file_name) else {
            warn!(file = file_name, "reply attachment not found");
            if let Err(err) = self
                .gateway
                .send_text(user, &errors.failed_send_file, keyboard)
                .await
            {
                warn!(error = %err, "failed to report missing attachment");
            }
            return;
        };

        if let Err(err) = self
            .gateway
            .send_file(user, is_image(file_name), file_name, &path, caption, keyboard)
            .await
        {
            warn!(file = file_name, error = %err, "attachment send failed");
        }
    }

    /// Resolve an attachment inside the files directory. Paths escaping
    /// the directory are rejected.
    fn resolve_attachment(&self, file_name: &str) -> Option<PathBuf> {
        let base = self.files_dir.canonicalize().ok()?;
        let path = base.join(file_name).canonicalize().ok()?;
        (path.is_file() && path.starts_with(&base)).then_some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_detection_by_extension() {
        assert!(is_image("photo.PNG"));
        assert!(is_image("scan.jpeg"));
        assert!(!is_image("report.pdf"));
        assert!(!is_image("no_extension"));
    }
}
