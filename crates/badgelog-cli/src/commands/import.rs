//! Import command for ingesting swipe rows into the local `SQLite` store.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Args;
use serde::Deserialize;
use uuid::Uuid;

use badgelog_db::{Database, StoredSwipe};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Category to apply when incoming rows omit one.
    #[arg(long)]
    pub category: Option<String>,
}

pub fn run(db: &mut Database, args: &ImportArgs) -> Result<usize> {
    let stdin = io::stdin();
    let swipes = parse_swipes(stdin.lock(), args.category.as_deref())?;
    let inserted = db.insert_swipes(&swipes)?;
    Ok(inserted)
}

fn parse_swipes<R: BufRead>(reader: R, default_category: Option<&str>) -> Result<Vec<StoredSwipe>> {
    let mut swipes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: ImportSwipe = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        let stored = parsed
            .into_stored(default_category)
            .with_context(|| format!("invalid swipe on line {}", idx + 1))?;
        swipes.push(stored);
    }
    Ok(swipes)
}

#[derive(Debug, Deserialize)]
struct ImportSwipe {
    #[serde(default)]
    id: Option<String>,
    occurred_at: String,
    #[serde(default)]
    subject_id: Option<String>,
    #[serde(default)]
    subject_name: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ImportSwipe {
    fn into_stored(self, default_category: Option<&str>) -> Result<StoredSwipe> {
        // Validate up front so malformed timestamps fail the import rather
        // than surfacing on a later query.
        DateTime::parse_from_rfc3339(&self.occurred_at)
            .with_context(|| format!("invalid occurred_at '{}'", self.occurred_at))?;

        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        let category = match self.category {
            Some(category) if !category.trim().is_empty() => Some(category),
            _ => default_category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };
        let extra = if self.extra.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&self.extra)
                    .context("failed to encode extra fields")?,
            )
        };

        Ok(StoredSwipe {
            id,
            occurred_at: self.occurred_at,
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            action: self.action,
            category,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn parse_swipes_reads_json_lines() {
        let input = concat!(
            r#"{"id":"1","occurred_at":"2025-10-06T09:00:00Z","subject_id":"u-1","action":"Entry"}"#,
            "\n",
            r#"{"id":"2","occurred_at":"2025-10-06T09:05:00Z","subject_id":"u-1","action":"Exit"}"#,
        );
        let swipes = parse_swipes(Cursor::new(input), None).unwrap();
        assert_eq!(swipes.len(), 2);
        assert_eq!(swipes[0].id, "1");
        assert_eq!(swipes[1].action.as_deref(), Some("Exit"));
    }

    #[test]
    fn parse_swipes_skips_blank_lines() {
        let input = "\n\n";
        let swipes = parse_swipes(Cursor::new(input), None).unwrap();
        assert!(swipes.is_empty());
    }

    #[test]
    fn missing_id_gets_generated() {
        let input = r#"{"occurred_at":"2025-10-06T09:00:00Z","subject_id":"u-1","action":"Entry"}"#;
        let swipes = parse_swipes(Cursor::new(input), None).unwrap();
        assert_eq!(swipes.len(), 1);
        assert!(!swipes[0].id.is_empty());
    }

    #[test]
    fn default_category_fills_missing() {
        let input = r#"{"id":"1","occurred_at":"2025-10-06T09:00:00Z","subject_id":"u-1","action":"Entry"}"#;
        let swipes = parse_swipes(Cursor::new(input), Some("Study Hall")).unwrap();
        assert_eq!(swipes[0].category.as_deref(), Some("Study Hall"));
    }

    #[test]
    fn explicit_category_wins_over_default() {
        let input = r#"{"id":"1","occurred_at":"2025-10-06T09:00:00Z","category":"Front Desk","action":"Entry"}"#;
        let swipes = parse_swipes(Cursor::new(input), Some("Study Hall")).unwrap();
        assert_eq!(swipes[0].category.as_deref(), Some("Front Desk"));
    }

    #[test]
    fn extra_fields_are_preserved_as_json() {
        let input = r#"{"id":"1","occurred_at":"2025-10-06T09:00:00Z","reader":"north-door"}"#;
        let swipes = parse_swipes(Cursor::new(input), None).unwrap();
        let extra = swipes[0].extra.as_deref().unwrap();
        assert!(extra.contains("north-door"));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let input = r#"{"id":"1","occurred_at":"half past nine"}"#;
        let err = parse_swipes(Cursor::new(input), None).unwrap_err();
        assert!(err.to_string().contains("invalid swipe on line 1"));
    }
}
