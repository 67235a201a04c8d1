//! Gmail message facade.
//!
//! Wraps a Gmail message resource with views over its MIME tree (bodies,
//! attachments, headers, dates) and label mutation through the Gmail API.
//! Every remote call goes through [`GmailService`], implemented over HTTP by
//! [`GmailClient`].

pub mod attachment;
pub mod client;
pub mod content;
pub mod error;
pub mod headers;
pub mod labels;
pub mod message;
pub mod part;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use attachment::Attachment;
pub use client::GmailClient;
pub use content::Content;
pub use error::GmailError;
pub use headers::DATE_FORMAT;
pub use labels::{Label, LabelAction, LabelType, SystemLabel};
pub use message::Message;
pub use part::{Header, Part, PartBody};
pub use service::{GmailService, Mailbox, DEFAULT_USER_ID};
pub use types::{ApiMessage, AttachmentBody, MessageFormat, ModifyRequest};
