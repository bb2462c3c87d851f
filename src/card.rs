use crate::api::{ApiResult, EmailApi};
use crate::labels;
use crate::models::{Category, EmailSummary, INBOX, MutationResponse, TRASH, UNREAD};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    Archive,
    Trash,
    /// Move out of the trash and back into the inbox.
    Restore,
    MarkRead,
    MarkUnread,
    Recategorize(Category),
}

impl CardAction {
    /// Past-tense description for status messages.
    pub fn describe(&self) -> String {
        match self {
            CardAction::Archive => "Archived".to_string(),
            CardAction::Trash => "Moved to trash".to_string(),
            CardAction::Restore => "Restored to inbox".to_string(),
            CardAction::MarkRead => "Marked as read".to_string(),
            CardAction::MarkUnread => "Marked as unread".to_string(),
            CardAction::Recategorize(c) => format!("Moved to {}", c.display_name()),
        }
    }
}

/// One email in the list together with the actions it offers.
pub struct EmailCard<'a> {
    email: &'a EmailSummary,
    in_trash_view: bool,
}

impl<'a> EmailCard<'a> {
    pub fn new(email: &'a EmailSummary, in_trash_view: bool) -> Self {
        Self {
            email,
            in_trash_view,
        }
    }

    pub fn allows(&self, action: &CardAction) -> bool {
        match action {
            CardAction::Restore => self.in_trash_view,
            CardAction::Trash | CardAction::Archive => !self.in_trash_view,
            CardAction::MarkRead => !self.email.is_read,
            CardAction::MarkUnread => self.email.is_read,
            CardAction::Recategorize(c) => !self.in_trash_view && c != &self.email.category,
        }
    }

    /// The read toggle for this email.
    pub fn toggle_read_action(&self) -> CardAction {
        if self.email.is_read {
            CardAction::MarkUnread
        } else {
            CardAction::MarkRead
        }
    }

    /// Runs `action` against the backend and returns the email as it looks
    /// afterwards. The caller reports it to the list; nothing is refetched.
    pub async fn perform(&self, api: &dyn EmailApi, action: &CardAction) -> ApiResult<EmailSummary> {
        let id = self.email.id.as_str();
        debug!("Card action {:?} on {}", action, id);
        let response = match action {
            CardAction::Archive => api.archive(id).await?,
            CardAction::Trash => api.trash(id).await?,
            CardAction::Restore => {
                api.update_labels(id, &[INBOX.to_string()], &[TRASH.to_string()])
                    .await?
            }
            CardAction::MarkRead => api.update_labels(id, &[], &[UNREAD.to_string()]).await?,
            CardAction::MarkUnread => api.update_labels(id, &[UNREAD.to_string()], &[]).await?,
            CardAction::Recategorize(category) => api.update_category(id, category).await?,
        };
        Ok(apply(self.email, action, &response))
    }
}

/// Builds the post-mutation email: the locally implied change first, then
/// whatever the backend reported on top.
pub fn apply(email: &EmailSummary, action: &CardAction, response: &MutationResponse) -> EmailSummary {
    let mut updated = email.clone();
    match action {
        CardAction::Archive => {
            updated.remove_label(INBOX);
            updated.category = Category::Archive;
        }
        CardAction::Trash => {
            updated.remove_label(INBOX);
            updated.add_label(TRASH);
            updated.category = Category::Trash;
        }
        CardAction::Restore => {
            updated.remove_label(TRASH);
            updated.add_label(INBOX);
            updated.category = Category::Primary;
        }
        CardAction::MarkRead => {
            updated.remove_label(UNREAD);
            updated.is_read = true;
        }
        CardAction::MarkUnread => {
            updated.add_label(UNREAD);
            updated.is_read = false;
        }
        CardAction::Recategorize(category) => {
            updated.category = category.clone();
        }
    }

    if let Some(data) = &response.data {
        if let Some(labels) = &data.labels {
            updated.labels = labels.clone();
            updated.is_read = !updated.has_label(UNREAD);
        }
        if let Some(category) = &data.category {
            updated.category = category.clone();
        }
        if let Some(is_read) = data.is_read {
            updated.is_read = is_read;
        }
    }

    labels::normalize(&mut updated);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::testing::{MockApi, ok};
    use crate::labels::{CATEGORY_SOCIAL, PRIMARY};
    use crate::models::{UpdatedFields, email};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_archive_drops_inbox_and_sets_category() {
        let api = MockApi::new();
        let original = email("B", Category::Primary, &[INBOX, PRIMARY]);
        let updated = EmailCard::new(&original, false)
            .perform(&api, &CardAction::Archive)
            .await
            .unwrap();

        assert_eq!(api.calls(), vec!["archive B"]);
        assert_eq!(updated.category, Category::Archive);
        assert!(updated.labels.is_empty());
    }

    #[tokio::test]
    async fn test_trash_marks_email_trashed() {
        let api = MockApi::new();
        let original = email("A", Category::Social, &[INBOX, CATEGORY_SOCIAL]);
        let updated = EmailCard::new(&original, false)
            .perform(&api, &CardAction::Trash)
            .await
            .unwrap();
        assert!(updated.is_trashed());
        assert!(!updated.has_label(INBOX));
        assert!(!updated.has_label(CATEGORY_SOCIAL));
    }

    #[tokio::test]
    async fn test_restore_uses_label_update() {
        let api = MockApi::new();
        let original = email("A", Category::Trash, &[TRASH]);
        let updated = EmailCard::new(&original, true)
            .perform(&api, &CardAction::Restore)
            .await
            .unwrap();
        assert_eq!(api.calls(), vec!["labels A +[INBOX] -[TRASH]"]);
        assert_eq!(updated.labels, vec![INBOX, PRIMARY]);
        assert_eq!(updated.category, Category::Primary);
    }

    #[tokio::test]
    async fn test_read_toggle() {
        let api = MockApi::new();
        let original = email("A", Category::Primary, &[INBOX, UNREAD]);
        let card = EmailCard::new(&original, false);
        assert_eq!(card.toggle_read_action(), CardAction::MarkRead);

        let updated = card.perform(&api, &CardAction::MarkRead).await.unwrap();
        assert!(updated.is_read);
        assert!(!updated.has_label(UNREAD));
        assert_eq!(api.calls(), vec!["labels A +[] -[UNREAD]"]);
    }

    #[tokio::test]
    async fn test_server_fields_override_local_guess() {
        let api = MockApi::new().with_mutation(Ok(ok(Some(UpdatedFields {
            labels: Some(vec!["INBOX".to_string(), "CATEGORY_UPDATES".to_string()]),
            category: Some(Category::Updates),
            is_read: None,
        }))));
        let original = email("A", Category::Primary, &[INBOX, PRIMARY]);
        let updated = EmailCard::new(&original, false)
            .perform(&api, &CardAction::Recategorize(Category::Social))
            .await
            .unwrap();
        assert_eq!(updated.category, Category::Updates);
        assert_eq!(updated.labels, vec!["INBOX", "CATEGORY_UPDATES"]);
    }

    #[tokio::test]
    async fn test_recategorize_rewrites_mirror_label() {
        let api = MockApi::new();
        let original = email("A", Category::Primary, &[INBOX, PRIMARY]);
        let updated = EmailCard::new(&original, false)
            .perform(&api, &CardAction::Recategorize(Category::Social))
            .await
            .unwrap();
        assert_eq!(api.calls(), vec!["category A social"]);
        assert_eq!(updated.labels, vec![INBOX, CATEGORY_SOCIAL]);
    }

    #[tokio::test]
    async fn test_failure_is_returned_untouched() {
        let api = MockApi::new().with_mutation(Err(ApiError::Rejected("nope".to_string())));
        let original = email("A", Category::Primary, &[INBOX]);
        let result = EmailCard::new(&original, false)
            .perform(&api, &CardAction::Archive)
            .await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }

    #[test]
    fn test_trash_view_offers_restore_only() {
        let e = email("A", Category::Trash, &[TRASH]);
        let card = EmailCard::new(&e, true);
        assert!(card.allows(&CardAction::Restore));
        assert!(!card.allows(&CardAction::Trash));
        assert!(!card.allows(&CardAction::Archive));
        assert!(!card.allows(&CardAction::Recategorize(Category::Social)));

        let inbox = EmailCard::new(&e, false);
        assert!(!inbox.allows(&CardAction::Restore));
    }
}
