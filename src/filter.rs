use crate::models::{Category, EmailSummary, INBOX, TRASH};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Read,
    Unread,
}

impl ReadStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "read" => Some(ReadStatus::Read),
            "unread" => Some(ReadStatus::Unread),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStatus::Read => "read",
            ReadStatus::Unread => "unread",
        }
    }
}

/// Filter selectors as they arrive from the query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterParams {
    pub category: Option<Category>,
    pub status: Option<ReadStatus>,
    pub label: Option<String>,
    pub view: Option<String>,
}

/// The backend query a set of [`FilterParams`] resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub category: Option<Category>,
    pub status: Option<ReadStatus>,
    pub label: Option<String>,
    pub show_all: bool,
}

impl FilterParams {
    /// Parses `category=trash&status=unread&label=X&view=inbox`.
    /// Unknown keys and empty values are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut params = FilterParams::default();
        let query = query.trim_start_matches('?');
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_ref() {
                "category" => params.category = Some(Category::parse(&value)),
                "status" => params.status = ReadStatus::parse(&value),
                "label" => params.label = Some(value.into_owned()),
                "view" => params.view = Some(value.to_lowercase()),
                _ => {}
            }
        }
        params
    }

    pub fn to_query(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(category) = &self.category {
            serializer.append_pair("category", category.as_str());
        }
        if let Some(status) = &self.status {
            serializer.append_pair("status", status.as_str());
        }
        if let Some(label) = &self.label {
            serializer.append_pair("label", label);
        }
        if let Some(view) = &self.view {
            serializer.append_pair("view", view);
        }
        serializer.finish()
    }

    /// Applies the rules that tie selectors together: the inbox view pins the
    /// label to `INBOX`, and the trash category shows everything labelled
    /// `TRASH`.
    pub fn resolve(&self) -> ListQuery {
        let mut query = ListQuery {
            category: self.category.clone(),
            status: self.status,
            label: self.label.clone(),
            show_all: false,
        };

        if self.view.as_deref() == Some("inbox") {
            query.label = Some(INBOX.to_string());
        }

        if self.category == Some(Category::Trash) {
            query.show_all = true;
            query.label = Some(TRASH.to_string());
        }

        query
    }

    pub fn is_trash(&self) -> bool {
        self.category == Some(Category::Trash)
    }

    /// Short human-readable form for the filter bar.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        parts.push(
            self.category
                .as_ref()
                .map(|c| c.display_name())
                .unwrap_or_else(|| "All Mail".to_string()),
        );
        if let Some(status) = self.status {
            parts.push(status.as_str().to_string());
        }
        if let Some(label) = &self.label {
            parts.push(format!("label:{}", label));
        }
        if let Some(view) = &self.view {
            parts.push(format!("view:{}", view));
        }
        parts.join(" · ")
    }
}

impl ListQuery {
    /// Whether `email` still belongs in a list fetched with this query, as far
    /// as category and label go.
    pub fn matches_category_and_label(&self, email: &EmailSummary) -> bool {
        let category_ok = match &self.category {
            None => true,
            Some(Category::Inbox) => email.has_label(INBOX),
            Some(Category::Trash) => email.is_trashed() || email.category == Category::Trash,
            Some(category) => &email.category == category,
        };
        let label_ok = self
            .label
            .as_deref()
            .is_none_or(|label| email.has_label(label));
        category_ok && label_ok
    }

    pub fn is_trash(&self) -> bool {
        self.category == Some(Category::Trash)
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "category={} status={} label={} show_all={}",
            self.category.as_ref().map(|c| c.as_str()).unwrap_or("-"),
            self.status.map(|s| s.as_str()).unwrap_or("-"),
            self.label.as_deref().unwrap_or("-"),
            self.show_all
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::email;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_query_reads_all_selectors() {
        let params = FilterParams::from_query("?category=Social&status=unread&label=Work&view=INBOX");
        assert_eq!(
            params,
            FilterParams {
                category: Some(Category::Social),
                status: Some(ReadStatus::Unread),
                label: Some("Work".to_string()),
                view: Some("inbox".to_string()),
            }
        );
    }

    #[test]
    fn test_from_query_ignores_empty_and_unknown() {
        let params = FilterParams::from_query("category=&status=maybe&foo=bar");
        assert_eq!(params, FilterParams::default());
    }

    #[test]
    fn test_query_round_trips_through_string() {
        let params = FilterParams {
            category: Some(Category::Promotions),
            status: Some(ReadStatus::Read),
            label: Some("My Label".to_string()),
            view: None,
        };
        assert_eq!(FilterParams::from_query(&params.to_query()), params);
    }

    #[test]
    fn test_inbox_view_forces_inbox_label() {
        let params = FilterParams {
            label: Some("Work".to_string()),
            view: Some("inbox".to_string()),
            ..Default::default()
        };
        let query = params.resolve();
        assert_eq!(query.label.as_deref(), Some(INBOX));
        assert!(!query.show_all);
    }

    #[test]
    fn test_trash_category_forces_show_all_and_trash_label() {
        let params = FilterParams {
            category: Some(Category::Trash),
            label: Some("Work".to_string()),
            view: Some("inbox".to_string()),
            ..Default::default()
        };
        let query = params.resolve();
        assert_eq!(query.label.as_deref(), Some(TRASH));
        assert!(query.show_all);
        assert!(query.is_trash());
    }

    #[test]
    fn test_inbox_pseudo_category_matches_inbox_label() {
        let query = FilterParams {
            category: Some(Category::Inbox),
            ..Default::default()
        }
        .resolve();
        assert!(query.matches_category_and_label(&email("A", Category::Social, &[INBOX])));
        assert!(!query.matches_category_and_label(&email("B", Category::Archive, &[])));
    }

    #[test]
    fn test_label_filter_requires_label() {
        let query = FilterParams {
            label: Some("Work".to_string()),
            ..Default::default()
        }
        .resolve();
        assert!(query.matches_category_and_label(&email("A", Category::Primary, &["Work"])));
        assert!(!query.matches_category_and_label(&email("B", Category::Primary, &[INBOX])));
    }
}
