//! MIME part tree as delivered by the Gmail API.
//!
//! A [`Part`] owns its children, so the tree is built in one pass by serde and
//! traversal always terminates.

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::content::decode_base64url;
use crate::error::GmailError;
use crate::service::Mailbox;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartBody {
    pub size: u64,
    pub attachment_id: Option<String>,
    /// base64url encoded payload.
    pub data: Option<String>,
}

impl PartBody {
    pub fn inline(data: impl Into<String>) -> Self {
        let data = data.into();
        Self { size: data.len() as u64, attachment_id: None, data: Some(data) }
    }

    pub fn attachment(id: impl Into<String>, size: u64) -> Self {
        Self { size, attachment_id: Some(id.into()), data: None }
    }
}

/// One node of a message's MIME tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Part {
    pub mime_type: String,
    pub headers: Vec<Header>,
    pub parts: Vec<Part>,
    pub part_id: Option<String>,
    pub filename: Option<String>,
    pub body: Option<PartBody>,
}

impl Part {
    /// Build a part tree from a `payload` JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, GmailError> {
        serde_json::from_value(value).map_err(|e| GmailError::InvalidResponse(e.to_string()))
    }

    pub fn is_text(&self) -> bool {
        is_text_mime(&self.mime_type)
    }

    pub fn is_attachment(&self) -> bool {
        self.filename.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Inline body data, if any.
    pub fn data(&self) -> Option<&str> {
        self.body.as_ref().and_then(|b| b.data.as_deref())
    }

    /// First header whose name matches exactly.
    pub fn get_header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name == name)
    }

    pub fn get_header_ignore_case(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Only the part itself and its direct children are inspected.
    pub fn has_attachments(&self) -> bool {
        self.is_attachment() || self.parts.iter().any(Part::is_attachment)
    }

    /// One [`Attachment`] per direct child carrying a filename.
    ///
    /// Id-backed children are left for a later download; inline children are
    /// decoded here.
    pub fn attachments(
        &self,
        mailbox: &Mailbox,
        message_id: Option<&str>,
    ) -> Result<Vec<Attachment>, GmailError> {
        if !self.has_attachments() {
            return Ok(Vec::new());
        }

        let mut attachments = Vec::new();
        for part in self.parts.iter().filter(|p| p.is_attachment()) {
            let filename = part.filename.as_deref().unwrap_or_default();
            let body = part.body.as_ref();
            let attachment_id =
                body.and_then(|b| b.attachment_id.clone()).filter(|id| !id.is_empty());

            let data = match (&attachment_id, body.and_then(|b| b.data.as_deref())) {
                (None, Some(encoded)) => Some(decode_base64url(encoded)?),
                _ => None,
            };

            attachments.push(Attachment::new(
                filename,
                &part.mime_type,
                part.part_id.clone(),
                attachment_id,
                data,
                message_id.map(str::to_string),
                mailbox.clone(),
            ));
        }
        Ok(attachments)
    }

    pub fn get_attachment_by_filename(
        &self,
        mailbox: &Mailbox,
        message_id: Option<&str>,
        filename: &str,
    ) -> Result<Option<Attachment>, GmailError> {
        if filename.is_empty() {
            return Ok(None);
        }
        Ok(self
            .attachments(mailbox, message_id)?
            .into_iter()
            .find(|a| a.filename == filename))
    }

    pub fn get_attachment_by_part_id(
        &self,
        mailbox: &Mailbox,
        message_id: Option<&str>,
        part_id: &str,
    ) -> Result<Option<Attachment>, GmailError> {
        if part_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .attachments(mailbox, message_id)?
            .into_iter()
            .find(|a| a.part_id.as_deref() == Some(part_id)))
    }
}

pub fn is_text_mime(mime_type: &str) -> bool {
    mime_type == TEXT_PLAIN || mime_type == TEXT_HTML
}
