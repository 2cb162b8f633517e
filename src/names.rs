//! Utility functions for cleaning and splitting agent display names.

/// Splits a raw display name into `(first_name, last_name)`.
///
/// Whitespace is normalized before splitting. An empty input yields two empty
/// strings; a single token becomes the first name; otherwise the final token
/// is the last name and everything before it, joined by single spaces, is the
/// first name.
pub(crate) fn split_full_name(full_name: &str) -> (String, String) {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.len() {
        0 => (String::new(), String::new()),
        1 => (parts[0].to_string(), String::new()),
        n => (parts[..n - 1].join(" "), parts[n - 1].to_string()),
    }
}

/// Strips trailing site-branding noise from a display name.
///
/// Directory sites commonly render profile titles as "Jane Doe | Brand Realty"
/// or "Jane Doe - Brand". The name is truncated at the first `|` or `-` that
/// is followed (case-insensitively, ignoring leading whitespace) by the
/// configured brand fragment. Hyphenated names survive because a bare `-`
/// inside a name is never followed by the brand.
pub(crate) fn strip_brand_suffix(name: &str, brand: &str) -> String {
    let brand_lower = brand.trim().to_lowercase();
    if brand_lower.is_empty() {
        return name.trim().to_string();
    }

    let name_lower = name.to_lowercase();
    for (idx, ch) in name.char_indices() {
        if ch != '|' && ch != '-' {
            continue;
        }
        let rest = name_lower[idx + ch.len_utf8()..].trim_start();
        if rest.starts_with(&brand_lower) {
            return name[..idx].trim().to_string();
        }
    }

    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_full_name_basic() {
        assert_eq!(
            split_full_name("Jane Doe"),
            ("Jane".to_string(), "Doe".to_string())
        );
    }

    #[test]
    fn test_split_full_name_multi_token_first_name() {
        let (first, last) = split_full_name("Mary Anne Van Der Beek");
        assert_eq!(first, "Mary Anne Van Der");
        assert_eq!(last, "Beek");
        // The token sequence is reconstructable.
        assert_eq!(format!("{} {}", first, last), "Mary Anne Van Der Beek");
    }

    #[test]
    fn test_split_full_name_single_token() {
        assert_eq!(split_full_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn test_split_full_name_empty_and_whitespace() {
        assert_eq!(split_full_name(""), (String::new(), String::new()));
        assert_eq!(split_full_name("   "), (String::new(), String::new()));
        assert_eq!(
            split_full_name("  Jane   Doe  "),
            ("Jane".to_string(), "Doe".to_string())
        );
    }

    #[test]
    fn test_strip_brand_suffix_pipe() {
        assert_eq!(
            strip_brand_suffix("Jane Doe | eXp Realty, LLC", "eXp"),
            "Jane Doe"
        );
    }

    #[test]
    fn test_strip_brand_suffix_dash_case_insensitive() {
        assert_eq!(strip_brand_suffix("Jane Doe - EXP Agent", "eXp"), "Jane Doe");
    }

    #[test]
    fn test_strip_brand_suffix_keeps_hyphenated_names() {
        assert_eq!(
            strip_brand_suffix("Mary-Jane Smith", "eXp"),
            "Mary-Jane Smith"
        );
    }

    #[test]
    fn test_strip_brand_suffix_no_brand_match() {
        assert_eq!(
            strip_brand_suffix("Jane Doe | Other Realty", "eXp"),
            "Jane Doe | Other Realty"
        );
    }
}
