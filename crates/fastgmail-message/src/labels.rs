//! Gmail labels: well-known system ids and resolved label resources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known system label ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemLabel {
    Inbox,
    Spam,
    Trash,
    Unread,
    Starred,
    Important,
    Sent,
    Draft,
    Chat,
    CategoryPersonal,
    CategorySocial,
    CategoryPromotions,
    CategoryUpdates,
    CategoryForums,
}

impl SystemLabel {
    pub const ALL: [SystemLabel; 14] = [
        Self::Inbox,
        Self::Spam,
        Self::Trash,
        Self::Unread,
        Self::Starred,
        Self::Important,
        Self::Sent,
        Self::Draft,
        Self::Chat,
        Self::CategoryPersonal,
        Self::CategorySocial,
        Self::CategoryPromotions,
        Self::CategoryUpdates,
        Self::CategoryForums,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::Spam => "SPAM",
            Self::Trash => "TRASH",
            Self::Unread => "UNREAD",
            Self::Starred => "STARRED",
            Self::Important => "IMPORTANT",
            Self::Sent => "SENT",
            Self::Draft => "DRAFT",
            Self::Chat => "CHAT",
            Self::CategoryPersonal => "CATEGORY_PERSONAL",
            Self::CategorySocial => "CATEGORY_SOCIAL",
            Self::CategoryPromotions => "CATEGORY_PROMOTIONS",
            Self::CategoryUpdates => "CATEGORY_UPDATES",
            Self::CategoryForums => "CATEGORY_FORUMS",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == id)
    }

    pub fn is_system_id(id: &str) -> bool {
        Self::from_id(id).is_some()
    }
}

impl AsRef<str> for SystemLabel {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SystemLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a label edit is sent to `users.messages.modify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAction {
    /// Only `addLabelIds`.
    Add,
    /// Only `removeLabelIds`.
    Remove,
    /// Both lists in one request.
    Toggle,
}

/// A resolved Gmail label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    pub label_type: LabelType,
    pub messages_total: Option<u32>,
    pub messages_unread: Option<u32>,
    pub threads_total: Option<u32>,
    pub threads_unread: Option<u32>,
    pub message_list_visibility: Option<String>,
    pub label_list_visibility: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LabelType {
    System,
    User,
}

impl Label {
    pub fn is_system(&self) -> bool {
        self.label_type == LabelType::System
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `users.labels` resource as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLabel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub label_type: Option<String>,
    pub messages_total: Option<u32>,
    pub messages_unread: Option<u32>,
    pub threads_total: Option<u32>,
    pub threads_unread: Option<u32>,
    pub message_list_visibility: Option<String>,
    pub label_list_visibility: Option<String>,
}

impl From<ApiLabel> for Label {
    fn from(api: ApiLabel) -> Self {
        let label_type = match api.label_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("system") => LabelType::System,
            Some(t) if t.eq_ignore_ascii_case("user") => LabelType::User,
            _ if SystemLabel::is_system_id(&api.id) => LabelType::System,
            _ => LabelType::User,
        };

        Self {
            id: api.id,
            name: api.name,
            label_type,
            messages_total: api.messages_total,
            messages_unread: api.messages_unread,
            threads_total: api.threads_total,
            threads_unread: api.threads_unread,
            message_list_visibility: api.message_list_visibility,
            label_list_visibility: api.label_list_visibility,
        }
    }
}
