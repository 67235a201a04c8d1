//! The Gmail operations this crate consumes, behind a trait so messages can be
//! driven by the real client or a fake.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GmailError;
use crate::labels::ApiLabel;
use crate::message::Message;
use crate::types::{ApiMessage, AttachmentBody, MessageFormat, ModifyRequest};

pub const DEFAULT_USER_ID: &str = "me";

#[async_trait]
pub trait GmailService: Send + Sync {
    /// `users.messages.get`
    async fn get_message(
        &self,
        user_id: &str,
        message_id: &str,
        format: MessageFormat,
    ) -> Result<ApiMessage, GmailError>;

    /// `users.messages.attachments.get`
    async fn get_attachment(
        &self,
        user_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, GmailError>;

    /// `users.messages.modify`
    async fn modify_message(
        &self,
        user_id: &str,
        message_id: &str,
        request: &ModifyRequest,
    ) -> Result<(), GmailError>;

    /// `users.labels.get`
    async fn get_label(&self, user_id: &str, label_id: &str) -> Result<ApiLabel, GmailError>;

    /// Resolve several labels in one exchange. Results follow the order of
    /// `label_ids`; any failing item fails the whole call.
    ///
    /// The default issues one `get_label` per id.
    async fn batch_get_labels(
        &self,
        user_id: &str,
        label_ids: &[String],
    ) -> Result<Vec<ApiLabel>, GmailError> {
        let mut labels = Vec::with_capacity(label_ids.len());
        for id in label_ids {
            labels.push(self.get_label(user_id, id).await?);
        }
        Ok(labels)
    }
}

/// A service handle bound to one Gmail user.
#[derive(Clone)]
pub struct Mailbox {
    service: Arc<dyn GmailService>,
    user_id: String,
}

impl Mailbox {
    /// Mailbox of the authenticated user (`"me"`).
    pub fn new(service: Arc<dyn GmailService>) -> Self {
        Self::for_user(service, DEFAULT_USER_ID)
    }

    pub fn for_user(service: Arc<dyn GmailService>, user_id: impl Into<String>) -> Self {
        Self { service, user_id: user_id.into() }
    }

    pub fn service(&self) -> &dyn GmailService {
        self.service.as_ref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Fetch a full message and wrap it.
    pub async fn get_message(&self, message_id: &str) -> Result<Message, GmailError> {
        let api = self.service.get_message(&self.user_id, message_id, MessageFormat::Full).await?;
        Ok(Message::from_api(api, self.clone()))
    }

    /// Wrap a message resource that was fetched elsewhere.
    pub fn message_from_json(&self, json: &str) -> Result<Message, GmailError> {
        Message::from_json(json, self.clone())
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("user_id", &self.user_id).finish_non_exhaustive()
    }
}
