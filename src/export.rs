//! Writes the deduplicated contact list as a CSV file and a JSON mirror.

use crate::error::Result;
use crate::models::ContactRecord;
use std::fs;
use std::path::Path;
use tracing::info;

/// Fixed column layout expected by mailing-list importers; the phone lands
/// under `SMS`.
const CSV_HEADER: &str = "EMAIL,FIRSTNAME,LASTNAME,SMS";

/// Renders the record list as CSV text with the fixed header.
fn render_csv(records: &[ContactRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&record.email),
            csv_field(&record.first_name),
            csv_field(&record.last_name),
            csv_field(&record.phone),
        ));
    }
    out
}

/// Quotes a CSV field only when it needs it (comma, quote, or newline).
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes the CSV export.
pub(crate) fn write_csv(records: &[ContactRecord], path: &str) -> Result<()> {
    let path = Path::new(path);
    ensure_parent_dir(path)?;
    fs::write(path, render_csv(records))?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Writes the JSON mirror: a pretty-printed array of the same records.
pub(crate) fn write_json(records: &[ContactRecord], path: &str) -> Result<()> {
    let path = Path::new(path);
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, first: &str, last: &str, phone: &str) -> ContactRecord {
        ContactRecord {
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn test_render_csv_header_and_rows() {
        let records = vec![
            record("a@x.com", "Jane", "Doe", "904-555-0100"),
            record("", "Doe, John", "Roe", "(904) 555-0101"),
        ];
        let csv = render_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "EMAIL,FIRSTNAME,LASTNAME,SMS");
        assert_eq!(lines[1], "a@x.com,Jane,Doe,904-555-0100");
        assert_eq!(lines[2], ",\"Doe, John\",Roe,(904) 555-0101");
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_json_mirror_uses_export_field_names() {
        let records = vec![record("a@x.com", "Jane", "Doe", "904-555-0100")];
        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("\"EMAIL\":\"a@x.com\""));
        assert!(json.contains("\"SMS\":\"904-555-0100\""));
    }
}
