use crate::models::EmailSummary;

/// Case-insensitive substring match on subject, sender and snippet. An empty
/// or blank term keeps everything.
pub fn filter_emails<'a>(emails: &'a [EmailSummary], term: &str) -> Vec<&'a EmailSummary> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return emails.iter().collect();
    }
    emails.iter().filter(|e| matches(e, &needle)).collect()
}

fn matches(email: &EmailSummary, needle: &str) -> bool {
    [&email.subject, &email.from_address, &email.snippet]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, email};

    fn with_subject(id: &str, subject: &str) -> EmailSummary {
        let mut e = email(id, Category::Primary, &[]);
        e.subject = Some(subject.to_string());
        e.from_address = Some("someone@example.com".to_string());
        e
    }

    #[test]
    fn test_matches_subject_case_insensitively() {
        let emails = vec![
            with_subject("1", "Invoice #1021"),
            with_subject("2", "Hello"),
            with_subject("3", "INVOICE ready"),
        ];
        let ids: Vec<&str> = filter_emails(&emails, "invoice")
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_matches_sender_and_snippet() {
        let mut a = with_subject("a", "Weekly");
        a.from_address = Some("Billing@Shop.example".to_string());
        let mut b = with_subject("b", "Weekly");
        b.snippet = Some("your parcel has shipped".to_string());
        let emails = vec![a, b];

        assert_eq!(filter_emails(&emails, "billing@shop")[0].id, "a");
        assert_eq!(filter_emails(&emails, "PARCEL")[0].id, "b");
    }

    #[test]
    fn test_blank_term_keeps_order() {
        let emails = vec![with_subject("1", "x"), with_subject("2", "y")];
        assert_eq!(filter_emails(&emails, "   ").len(), 2);
        assert_eq!(filter_emails(&emails, "")[1].id, "2");
    }

    #[test]
    fn test_missing_fields_do_not_match() {
        let mut e = with_subject("1", "x");
        e.subject = None;
        e.from_address = None;
        assert!(filter_emails(&[e], "x").is_empty());
    }
}
