//! Defines the core data structures used in the agent-sleuth application.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// One extracted contact, shaped for mailing-list import.
///
/// All fields default to the empty string when unknown; there is no separate
/// "absent" sentinel. The serialized field names match the CSV column layout
/// (`EMAIL, FIRSTNAME, LASTNAME, SMS`) so the JSON mirror and the CSV agree.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ContactRecord {
    /// The contact's email address, or empty if none was found.
    #[serde(rename = "EMAIL")]
    pub email: String,
    /// The contact's first name (all leading tokens of the display name).
    #[serde(rename = "FIRSTNAME")]
    pub first_name: String,
    /// The contact's last name (the final token of the display name).
    #[serde(rename = "LASTNAME")]
    pub last_name: String,
    /// The contact's phone number, surfaced under `SMS` for list imports.
    #[serde(rename = "SMS")]
    pub phone: String,
}

impl ContactRecord {
    /// A record is worth keeping only if it carries an email or a phone.
    pub(crate) fn has_contact(&self) -> bool {
        !self.email.is_empty() || !self.phone.is_empty()
    }

    /// Composite identity used for deduplication. Two records with the same
    /// key describe the same reachable person; the all-empty key is `"|"`.
    pub(crate) fn identity_key(&self) -> String {
        format!("{}|{}", self.email, self.phone)
    }
}

/// The kind of page a [`WorkItem`] points at, driving the handler dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageLabel {
    /// A paginated results page listing agent profiles.
    Search,
    /// A single agent's profile page.
    Profile,
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageLabel::Search => write!(f, "SEARCH"),
            PageLabel::Profile => write!(f, "PROFILE"),
        }
    }
}

/// A single unit of crawl work: one URL to visit and how to treat it.
/// Consumed exactly once; there is no retry of a processed item.
#[derive(Debug, Clone)]
pub(crate) struct WorkItem {
    pub url: Url,
    pub label: PageLabel,
}

impl WorkItem {
    pub(crate) fn search(url: Url) -> Self {
        Self {
            url,
            label: PageLabel::Search,
        }
    }

    pub(crate) fn profile(url: Url) -> Self {
        Self {
            url,
            label: PageLabel::Profile,
        }
    }
}

/// Collapses the accumulated records to one per unique `email|phone` identity,
/// preserving first-occurrence order and dropping records that carry neither
/// an email nor a phone.
pub(crate) fn dedupe_records(records: Vec<ContactRecord>) -> Vec<ContactRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut deduped = Vec::new();

    for record in records {
        if !record.has_contact() {
            continue;
        }
        if seen.insert(record.identity_key()) {
            deduped.push(record);
        }
    }

    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, phone: &str) -> ContactRecord {
        ContactRecord {
            email: email.to_string(),
            phone: phone.to_string(),
            ..ContactRecord::default()
        }
    }

    #[test]
    fn test_dedupe_distinct_keys_are_kept() {
        // Same email with and without a phone are different identities.
        let records = vec![
            record("a@x.com", ""),
            record("a@x.com", "555-1234"),
            record("", ""),
        ];
        let deduped = dedupe_records(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].identity_key(), "a@x.com|");
        assert_eq!(deduped[1].identity_key(), "a@x.com|555-1234");
    }

    #[test]
    fn test_dedupe_drops_empty_identity() {
        let deduped = dedupe_records(vec![record("", ""), record("", "")]);
        assert!(deduped.is_empty());
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut first = record("a@x.com", "555");
        first.first_name = "First".to_string();
        let mut second = record("a@x.com", "555");
        second.first_name = "Second".to_string();

        let deduped = dedupe_records(vec![first, second]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].first_name, "First");
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let records = vec![
            record("a@x.com", ""),
            record("b@y.com", "904-555-0100"),
            record("a@x.com", ""),
            record("", "904-555-0100"),
        ];
        let once = dedupe_records(records);
        let twice = dedupe_records(once.clone());
        assert_eq!(once, twice);
        assert!(once.iter().all(ContactRecord::has_contact));
    }
}
