//! The message facade.
//!
//! Every view is derived from the part tree on access. Label flags read only
//! `label_ids`, which is updated after each successful modify call.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::instrument;

use crate::attachment::Attachment;
use crate::content::{extract_content, Content};
use crate::error::GmailError;
use crate::headers::{self, DATE_FORMAT};
use crate::labels::{Label, LabelAction, SystemLabel};
use crate::part::{Header, Part};
use crate::service::Mailbox;
use crate::types::{ApiMessage, ModifyRequest};

const SPAM_REMOVES: [SystemLabel; 4] =
    [SystemLabel::Trash, SystemLabel::Inbox, SystemLabel::Starred, SystemLabel::Important];
const TRASH_REMOVES: [SystemLabel; 3] =
    [SystemLabel::Inbox, SystemLabel::Starred, SystemLabel::Important];

#[derive(Clone)]
pub struct Message {
    pub id: String,
    pub snippet: String,
    pub thread_id: String,
    pub history_id: String,
    pub size_estimate: u64,
    /// Epoch milliseconds, as sent by the API.
    pub internal_date: Option<String>,
    pub payload: Option<Part>,
    pub raw: Option<String>,
    pub label_ids: Vec<String>,
    /// Filled by [`Message::get_labels`].
    pub labels: Option<Vec<Label>>,
    mailbox: Mailbox,
}

impl Message {
    pub fn from_api(api: ApiMessage, mailbox: Mailbox) -> Self {
        Self {
            id: api.id,
            snippet: api.snippet,
            thread_id: api.thread_id,
            history_id: api.history_id,
            size_estimate: api.size_estimate,
            internal_date: api.internal_date,
            payload: api.payload,
            raw: api.raw,
            label_ids: api.label_ids,
            labels: None,
            mailbox,
        }
    }

    /// Build from a message resource JSON document.
    pub fn from_json(json: &str, mailbox: Mailbox) -> Result<Self, GmailError> {
        let api: ApiMessage =
            serde_json::from_str(json).map_err(|e| GmailError::InvalidResponse(e.to_string()))?;
        Ok(Self::from_api(api, mailbox))
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn message_headers(&self) -> Option<&[Header]> {
        self.payload.as_ref().map(|p| p.headers.as_slice()).filter(|h| !h.is_empty())
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.get_header(name).map(|h| h.value.as_str())
    }

    // Content

    /// Text bodies of the message; empty when there is no payload.
    pub fn content(&self) -> Result<Content, GmailError> {
        match &self.payload {
            Some(payload) => extract_content(payload),
            None => Ok(Content::default()),
        }
    }

    pub fn body(&self) -> Result<String, GmailError> {
        Ok(self.content()?.body())
    }

    pub fn html(&self) -> Result<String, GmailError> {
        Ok(self.content()?.html())
    }

    pub fn plain(&self) -> Result<String, GmailError> {
        Ok(self.content()?.plain())
    }

    pub fn alternative(&self) -> Result<String, GmailError> {
        Ok(self.content()?.alternative())
    }

    // Headers

    pub fn recipient(&self) -> Option<&str> {
        self.header("To")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .get_header_ignore_case("Message-Id")
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn sender_header(&self) -> Option<&str> {
        self.header("From")
    }

    /// Display name, or address when there is none.
    pub fn sender(&self) -> Option<String> {
        self.sender_header().map(headers::parse_sender)
    }

    /// When the message was created, from `internalDate`.
    pub fn created_date(&self) -> Result<DateTime<Utc>, GmailError> {
        headers::parse_internal_date(self.internal_date.as_deref())
    }

    /// When the message was delivered, from `Received` or `Date`.
    pub fn date(&self) -> Result<Option<DateTime<FixedOffset>>, GmailError> {
        match &self.payload {
            Some(payload) => headers::delivery_date(payload),
            None => Ok(None),
        }
    }

    /// Delivery date rendered in local time; `None` without a date.
    pub fn date_string(&self, format: Option<&str>) -> Result<Option<String>, GmailError> {
        let Some(date) = self.date()? else {
            return Ok(None);
        };
        headers::format_date(&date, format.unwrap_or(DATE_FORMAT)).map(Some)
    }

    // Attachments

    pub fn has_attachments(&self) -> bool {
        self.payload.as_ref().is_some_and(Part::has_attachments)
    }

    pub fn attachments(&self) -> Result<Vec<Attachment>, GmailError> {
        match &self.payload {
            Some(payload) => payload.attachments(&self.mailbox, Some(self.id.as_str())),
            None => Ok(Vec::new()),
        }
    }

    /// Look an attachment up by filename, or by part id when no filename is given.
    pub fn get_attachment(
        &self,
        filename: Option<&str>,
        part_id: Option<&str>,
    ) -> Result<Option<Attachment>, GmailError> {
        let Some(payload) = self.payload.as_ref().filter(|p| p.has_attachments()) else {
            return Ok(None);
        };
        match (filename.filter(|f| !f.is_empty()), part_id) {
            (Some(name), _) => payload.get_attachment_by_filename(&self.mailbox, Some(self.id.as_str()), name),
            (None, Some(id)) => payload.get_attachment_by_part_id(&self.mailbox, Some(self.id.as_str()), id),
            (None, None) => Ok(None),
        }
    }

    // Label flags

    pub fn has_label(&self, label: impl AsRef<str>) -> bool {
        let label = label.as_ref();
        self.label_ids.iter().any(|l| l == label)
    }

    pub fn is_unread(&self) -> bool {
        self.has_label(SystemLabel::Unread)
    }

    pub fn is_starred(&self) -> bool {
        self.has_label(SystemLabel::Starred)
    }

    pub fn is_important(&self) -> bool {
        self.has_label(SystemLabel::Important)
    }

    pub fn is_spam(&self) -> bool {
        self.has_label(SystemLabel::Spam)
    }

    pub fn is_draft(&self) -> bool {
        self.has_label(SystemLabel::Draft)
    }

    pub fn is_trash(&self) -> bool {
        self.has_label(SystemLabel::Trash)
    }

    pub fn is_inbox(&self) -> bool {
        self.has_label(SystemLabel::Inbox)
    }

    pub fn is_sent(&self) -> bool {
        self.has_label(SystemLabel::Sent)
    }

    // Label edits

    pub async fn add_label(&mut self, label: impl AsRef<str>) -> Result<(), GmailError> {
        self.edit_labels::<&str, &str>(LabelAction::Add, &[label.as_ref()], &[]).await
    }

    pub async fn add_labels<L: AsRef<str>>(&mut self, labels: &[L]) -> Result<(), GmailError> {
        self.edit_labels::<L, &str>(LabelAction::Add, labels, &[]).await
    }

    pub async fn remove_label(&mut self, label: impl AsRef<str>) -> Result<(), GmailError> {
        self.edit_labels::<&str, &str>(LabelAction::Remove, &[], &[label.as_ref()]).await
    }

    pub async fn remove_labels<L: AsRef<str>>(&mut self, labels: &[L]) -> Result<(), GmailError> {
        self.edit_labels::<&str, L>(LabelAction::Remove, &[], labels).await
    }

    /// Add and remove in one request.
    pub async fn modify_labels<A: AsRef<str>, R: AsRef<str>>(
        &mut self,
        add: &[A],
        remove: &[R],
    ) -> Result<(), GmailError> {
        self.edit_labels(LabelAction::Toggle, add, remove).await
    }

    /// The single path every label mutation goes through.
    ///
    /// Local state changes only after the API accepted the edit.
    #[instrument(skip(self, add, remove), fields(message_id = %self.id), level = "debug")]
    pub async fn edit_labels<A: AsRef<str>, R: AsRef<str>>(
        &mut self,
        action: LabelAction,
        add: &[A],
        remove: &[R],
    ) -> Result<(), GmailError> {
        if self.id.is_empty() {
            return Err(GmailError::MissingMessageId);
        }

        let add: Vec<String> = add.iter().map(|l| l.as_ref().to_string()).collect();
        let remove: Vec<String> = remove.iter().map(|l| l.as_ref().to_string()).collect();

        let request = match action {
            LabelAction::Add => ModifyRequest { add_label_ids: Some(add), remove_label_ids: None },
            LabelAction::Remove => {
                ModifyRequest { add_label_ids: None, remove_label_ids: Some(remove) }
            }
            LabelAction::Toggle => {
                ModifyRequest { add_label_ids: Some(add), remove_label_ids: Some(remove) }
            }
        };

        self.mailbox
            .service()
            .modify_message(self.mailbox.user_id(), &self.id, &request)
            .await?;

        tracing::debug!(?action, "Labels modified");
        self.apply_edit(&request);
        Ok(())
    }

    fn apply_edit(&mut self, request: &ModifyRequest) {
        for label in request.add_label_ids.iter().flatten() {
            if !self.has_label(label) {
                self.label_ids.push(label.clone());
            }
        }
        if let Some(remove) = &request.remove_label_ids {
            self.label_ids.retain(|l| !remove.contains(l));
        }
    }

    pub async fn mark_as_read(&mut self) -> Result<&mut Self, GmailError> {
        self.remove_label(SystemLabel::Unread).await?;
        Ok(self)
    }

    pub async fn mark_as_unread(&mut self) -> Result<&mut Self, GmailError> {
        self.add_label(SystemLabel::Unread).await?;
        Ok(self)
    }

    pub async fn toggle_read_unread(&mut self) -> Result<&mut Self, GmailError> {
        if self.is_unread() {
            self.mark_as_read().await
        } else {
            self.mark_as_unread().await
        }
    }

    pub async fn mark_spam(&mut self) -> Result<&mut Self, GmailError> {
        self.modify_labels(&[SystemLabel::Spam], &SPAM_REMOVES).await?;
        Ok(self)
    }

    pub async fn mark_not_spam(&mut self) -> Result<&mut Self, GmailError> {
        self.modify_labels(&[SystemLabel::Inbox], &[SystemLabel::Spam]).await?;
        Ok(self)
    }

    pub async fn toggle_spam(&mut self) -> Result<&mut Self, GmailError> {
        if self.is_spam() {
            self.mark_not_spam().await
        } else {
            self.mark_spam().await
        }
    }

    pub async fn move_to_trash(&mut self) -> Result<&mut Self, GmailError> {
        self.modify_labels(&[SystemLabel::Trash], &TRASH_REMOVES).await?;
        Ok(self)
    }

    pub async fn move_from_trash(&mut self) -> Result<&mut Self, GmailError> {
        self.modify_labels(&[SystemLabel::Inbox], &[SystemLabel::Trash]).await?;
        Ok(self)
    }

    pub async fn toggle_trash(&mut self) -> Result<&mut Self, GmailError> {
        if self.is_trash() {
            self.move_from_trash().await
        } else {
            self.move_to_trash().await
        }
    }

    pub async fn mark_important(&mut self) -> Result<&mut Self, GmailError> {
        self.add_label(SystemLabel::Important).await?;
        Ok(self)
    }

    pub async fn mark_not_important(&mut self) -> Result<&mut Self, GmailError> {
        self.remove_label(SystemLabel::Important).await?;
        Ok(self)
    }

    pub async fn toggle_important(&mut self) -> Result<&mut Self, GmailError> {
        if self.is_important() {
            self.mark_not_important().await
        } else {
            self.mark_important().await
        }
    }

    pub async fn mark_starred(&mut self) -> Result<&mut Self, GmailError> {
        self.add_label(SystemLabel::Starred).await?;
        Ok(self)
    }

    pub async fn mark_not_starred(&mut self) -> Result<&mut Self, GmailError> {
        self.remove_label(SystemLabel::Starred).await?;
        Ok(self)
    }

    pub async fn toggle_starred(&mut self) -> Result<&mut Self, GmailError> {
        if self.is_starred() {
            self.mark_not_starred().await
        } else {
            self.mark_starred().await
        }
    }

    pub async fn archive(&mut self) -> Result<&mut Self, GmailError> {
        self.remove_label(SystemLabel::Inbox).await?;
        Ok(self)
    }

    pub async fn move_to_inbox(&mut self) -> Result<&mut Self, GmailError> {
        self.add_label(SystemLabel::Inbox).await?;
        Ok(self)
    }

    /// Resolve every label id in one batch.
    ///
    /// The resolved list replaces [`Message::labels`] only when every item
    /// succeeded; on failure the previous value is kept.
    #[instrument(skip(self), fields(message_id = %self.id), level = "debug")]
    pub async fn get_labels(&mut self) -> Result<&[Label], GmailError> {
        let resolved = self
            .mailbox
            .service()
            .batch_get_labels(self.mailbox.user_id(), &self.label_ids)
            .await?;

        tracing::debug!("Resolved {} labels", resolved.len());
        let labels = self.labels.insert(resolved.into_iter().map(Label::from).collect());
        Ok(labels.as_slice())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subject().filter(|s| !s.is_empty()).unwrap_or(&self.snippet))
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("thread_id", &self.thread_id)
            .field("snippet", &self.snippet)
            .field("label_ids", &self.label_ids)
            .field("labels", &self.labels)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
