//! In-memory [`GmailService`] for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GmailError;
use crate::labels::{ApiLabel, SystemLabel};
use crate::service::GmailService;
use crate::types::{ApiMessage, AttachmentBody, MessageFormat, ModifyRequest};

#[derive(Default)]
pub(crate) struct FakeService {
    messages: Mutex<HashMap<String, ApiMessage>>,
    attachments: Mutex<HashMap<String, Option<String>>>,
    failing_labels: Mutex<HashSet<String>>,
    fail_attachments: Mutex<bool>,
    fail_modify: Mutex<bool>,
    attachment_calls: Mutex<Vec<(String, String, String)>>,
    label_calls: Mutex<Vec<String>>,
    modify_calls: Mutex<Vec<(String, ModifyRequest)>>,
}

impl FakeService {
    pub fn put_message(&self, message: ApiMessage) {
        self.messages.lock().unwrap().insert(message.id.clone(), message);
    }

    /// `data` is the base64url body returned for `id`.
    pub fn set_attachment(&self, id: &str, data: Option<String>) {
        self.attachments.lock().unwrap().insert(id.to_string(), data);
    }

    pub fn fail_attachments(&self) {
        *self.fail_attachments.lock().unwrap() = true;
    }

    pub fn fail_modify(&self) {
        *self.fail_modify.lock().unwrap() = true;
    }

    pub fn fail_label(&self, id: &str) {
        self.failing_labels.lock().unwrap().insert(id.to_string());
    }

    /// `(user_id, message_id, attachment_id)` per call.
    pub fn attachment_calls(&self) -> Vec<(String, String, String)> {
        self.attachment_calls.lock().unwrap().clone()
    }

    pub fn label_calls(&self) -> Vec<String> {
        self.label_calls.lock().unwrap().clone()
    }

    pub fn modify_calls(&self) -> Vec<(String, ModifyRequest)> {
        self.modify_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GmailService for FakeService {
    async fn get_message(
        &self,
        _user_id: &str,
        message_id: &str,
        _format: MessageFormat,
    ) -> Result<ApiMessage, GmailError> {
        self.messages
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| GmailError::NotFound(message_id.to_string()))
    }

    async fn get_attachment(
        &self,
        user_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, GmailError> {
        self.attachment_calls.lock().unwrap().push((
            user_id.to_string(),
            message_id.to_string(),
            attachment_id.to_string(),
        ));
        if *self.fail_attachments.lock().unwrap() {
            return Err(GmailError::ApiError("attachment backend down".into()));
        }
        let data = self
            .attachments
            .lock()
            .unwrap()
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| GmailError::NotFound(attachment_id.to_string()))?;
        Ok(AttachmentBody {
            attachment_id: Some(attachment_id.to_string()),
            size: data.as_ref().map_or(0, |d| d.len() as u64),
            data,
        })
    }

    async fn modify_message(
        &self,
        _user_id: &str,
        message_id: &str,
        request: &ModifyRequest,
    ) -> Result<(), GmailError> {
        if *self.fail_modify.lock().unwrap() {
            return Err(GmailError::ApiError("modify rejected".into()));
        }
        self.modify_calls.lock().unwrap().push((message_id.to_string(), request.clone()));
        Ok(())
    }

    async fn get_label(&self, _user_id: &str, label_id: &str) -> Result<ApiLabel, GmailError> {
        self.label_calls.lock().unwrap().push(label_id.to_string());
        if self.failing_labels.lock().unwrap().contains(label_id) {
            return Err(GmailError::NotFound(label_id.to_string()));
        }
        let label_type = if SystemLabel::is_system_id(label_id) { "system" } else { "user" };
        Ok(ApiLabel {
            id: label_id.to_string(),
            name: label_id.to_string(),
            label_type: Some(label_type.to_string()),
            ..Default::default()
        })
    }
}
