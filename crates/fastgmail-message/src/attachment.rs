//! Message attachments with lazy download.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::content::decode_base64url;
use crate::error::GmailError;
use crate::service::Mailbox;

#[derive(Clone)]
pub struct Attachment {
    /// Sanitized name, `/` replaced by `_`.
    pub filename: String,
    pub mime_type: String,
    pub part_id: Option<String>,
    /// Server assigned id. Gmail issues a new one on every message fetch.
    pub id: Option<String>,
    /// Decoded bytes, once known.
    pub data: Option<Vec<u8>>,
    message_id: Option<String>,
    mailbox: Mailbox,
}

impl Attachment {
    pub fn new(
        filename: &str,
        mime_type: &str,
        part_id: Option<String>,
        id: Option<String>,
        data: Option<Vec<u8>>,
        message_id: Option<String>,
        mailbox: Mailbox,
    ) -> Self {
        Self {
            filename: sanitize_filename(filename),
            mime_type: mime_type.to_string(),
            part_id,
            id,
            data,
            message_id: message_id.filter(|id| !id.is_empty()),
            mailbox,
        }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn is_downloaded(&self) -> bool {
        self.data.is_some()
    }

    /// Fetch the payload from Gmail.
    ///
    /// Does nothing when there is no server id or the data is already present.
    #[instrument(skip(self), fields(filename = %self.filename), level = "debug")]
    pub async fn download(&mut self) -> Result<(), GmailError> {
        let Some(attachment_id) = self.id.as_deref() else {
            return Ok(());
        };
        if self.data.is_some() {
            return Ok(());
        }
        let message_id = self.message_id.as_deref().ok_or(GmailError::MissingMessageId)?;

        let body = self
            .mailbox
            .service()
            .get_attachment(self.mailbox.user_id(), message_id, attachment_id)
            .await?;

        match body.data {
            Some(encoded) => {
                let bytes = decode_base64url(&encoded)?;
                tracing::debug!("Downloaded {} bytes", bytes.len());
                self.data = Some(bytes);
            }
            None => tracing::warn!("Attachment response carried no data"),
        }
        Ok(())
    }

    /// Write the payload to `path`, or to the filename in the working directory.
    ///
    /// Downloads first when needed. An existing file is only replaced when
    /// `overwrite` is set.
    #[instrument(skip(self), fields(filename = %self.filename), level = "debug")]
    pub async fn save(&mut self, path: Option<&Path>, overwrite: bool) -> Result<PathBuf, GmailError> {
        let target = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(&self.filename));

        if self.data.is_none() {
            self.download().await?;
        }
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| GmailError::AttachmentUnavailable(self.filename.clone()))?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = options.open(&target).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => GmailError::FileExists(target.clone()),
            _ => GmailError::Io(e),
        })?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::info!("Saved attachment to {}", target.display());
        Ok(target)
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("part_id", &self.part_id)
            .field("id", &self.id)
            .field("data_len", &self.data.as_ref().map(Vec::len))
            .field("message_id", &self.message_id)
            .finish()
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

pub fn sanitize_filename(filename: &str) -> String {
    filename.replace('/', "_")
}
