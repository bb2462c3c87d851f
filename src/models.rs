use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INBOX: &str = "INBOX";
pub const TRASH: &str = "TRASH";
pub const UNREAD: &str = "UNREAD";
pub const SPAM: &str = "SPAM";
pub const STARRED: &str = "STARRED";
pub const IMPORTANT: &str = "IMPORTANT";

/// Single classification slot of an email.
///
/// `Inbox` is a pseudo-category: as a filter it selects everything still
/// carrying the `INBOX` label, whatever its real category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Inbox,
    #[default]
    Primary,
    Social,
    Promotions,
    Updates,
    Forums,
    Archive,
    Trash,
    Spam,
    Other(String),
}

impl Category {
    /// Categories a user can move an email into from the card.
    pub const ASSIGNABLE: [Category; 5] = [
        Category::Primary,
        Category::Social,
        Category::Promotions,
        Category::Updates,
        Category::Forums,
    ];

    /// Categories cycled through by the filter bar. `None` means "all".
    pub const FILTERABLE: [Option<Category>; 9] = [
        None,
        Some(Category::Inbox),
        Some(Category::Primary),
        Some(Category::Social),
        Some(Category::Promotions),
        Some(Category::Updates),
        Some(Category::Forums),
        Some(Category::Archive),
        Some(Category::Trash),
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Inbox => "inbox",
            Category::Primary => "primary",
            Category::Social => "social",
            Category::Promotions => "promotions",
            Category::Updates => "updates",
            Category::Forums => "forums",
            Category::Archive => "archive",
            Category::Trash => "trash",
            Category::Spam => "spam",
            Category::Other(name) => name,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "inbox" => Category::Inbox,
            "primary" => Category::Primary,
            "social" => Category::Social,
            "promotions" => Category::Promotions,
            "updates" => Category::Updates,
            "forums" => Category::Forums,
            "archive" => Category::Archive,
            "trash" => Category::Trash,
            "spam" => Category::Spam,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn display_name(&self) -> String {
        inflections::case::to_title_case(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, alias = "from", alias = "sender")]
    pub from_address: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(alias = "date")]
    pub received_at: DateTime<Utc>,
    #[serde(default, alias = "read")]
    pub is_read: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl EmailSummary {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn add_label(&mut self, label: &str) {
        if !self.has_label(label) {
            self.labels.push(label.to_string());
        }
    }

    pub fn remove_label(&mut self, label: &str) {
        self.labels.retain(|l| l != label);
    }

    pub fn is_trashed(&self) -> bool {
        self.has_label(TRASH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default, alias = "limit")]
    pub per_page: u32,
    pub total: u64,
    #[serde(alias = "hasNext")]
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub emails: Vec<EmailSummary>,
    pub pagination: Pagination,
}

/// Fields the backend reports as changed by a mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdatedFields {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default, alias = "read")]
    pub is_read: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<UpdatedFields>,
}

impl MutationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_str(), "success" | "ok")
    }
}

#[cfg(test)]
pub(crate) fn email(id: &str, category: Category, labels: &[&str]) -> EmailSummary {
    EmailSummary {
        id: id.to_string(),
        thread_id: None,
        subject: Some(format!("Subject {}", id)),
        from_address: Some(format!("{}@example.com", id.to_lowercase())),
        snippet: None,
        received_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        is_read: !labels.contains(&UNREAD),
        category,
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}
