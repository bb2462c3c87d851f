//! Category-mirror labels.
//!
//! The backend attaches both a `category` field and `CATEGORY_*`/`PRIMARY`
//! labels to an email. The category field is authoritative here; mirror
//! labels are always derived from it through [`mirror_label`].

use crate::models::{Category, EmailSummary};

pub const PRIMARY: &str = "PRIMARY";
pub const CATEGORY_SOCIAL: &str = "CATEGORY_SOCIAL";
pub const CATEGORY_PROMOTIONS: &str = "CATEGORY_PROMOTIONS";
pub const CATEGORY_UPDATES: &str = "CATEGORY_UPDATES";
pub const CATEGORY_FORUMS: &str = "CATEGORY_FORUMS";

const MIRROR_LABELS: [(Category, &str); 5] = [
    (Category::Primary, PRIMARY),
    (Category::Social, CATEGORY_SOCIAL),
    (Category::Promotions, CATEGORY_PROMOTIONS),
    (Category::Updates, CATEGORY_UPDATES),
    (Category::Forums, CATEGORY_FORUMS),
];

/// The label that mirrors `category`, if it has one.
pub fn mirror_label(category: &Category) -> Option<&'static str> {
    MIRROR_LABELS
        .iter()
        .find(|(c, _)| c == category)
        .map(|(_, label)| *label)
}

pub fn is_mirror_label(label: &str) -> bool {
    label == PRIMARY || label.starts_with("CATEGORY_")
}

/// Rewrites the mirror labels of `email` so they agree with its category.
/// Non-mirror labels keep their order.
pub fn normalize(email: &mut EmailSummary) {
    let wanted = mirror_label(&email.category);
    email
        .labels
        .retain(|label| !is_mirror_label(label) || Some(label.as_str()) == wanted);
    if let Some(label) = wanted {
        email.add_label(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{INBOX, UNREAD, email};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_drops_stale_mirror_labels() {
        let mut e = email(
            "A",
            Category::Social,
            &[INBOX, PRIMARY, CATEGORY_PROMOTIONS, UNREAD],
        );
        normalize(&mut e);
        assert_eq!(e.labels, vec![INBOX, UNREAD, CATEGORY_SOCIAL]);
    }

    #[test]
    fn test_normalize_keeps_consistent_labels_in_place() {
        let mut e = email("A", Category::Primary, &[PRIMARY, INBOX]);
        normalize(&mut e);
        assert_eq!(e.labels, vec![PRIMARY, INBOX]);
    }

    #[test]
    fn test_normalize_archive_has_no_mirror() {
        let mut e = email("A", Category::Archive, &[PRIMARY]);
        normalize(&mut e);
        assert!(e.labels.is_empty());
    }
}
