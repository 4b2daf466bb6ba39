//! CSV-backed plan persistence.
//!
//! The on-disk format is a two-column CSV (`Date`, `Description`) with
//! day-month-year dates. Load accepts day-month-year or year-month-day and
//! normalizes to day-month-year on any re-save. Validation problems are
//! reported as structured outcomes so the conversation can surface them as
//! warnings instead of crashing the turn.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{format_plan_date, parse_plan_date, TrainingItem};
use crate::error::PlanStoreError;

/// Confirmation payload for a successful save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub path: String,
    pub rows_written: usize,
    pub date_range: DateRange,
}

/// Ascending date range of the written plan, day-month-year formatted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Result of loading the persisted plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum LoadOutcome {
    Ok { plan: Vec<TrainingItem> },
    NotFound { path: String },
    Failed { error: String, path: String },
}

/// Durable plan storage.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist the plan, sorted ascending by date.
    async fn save(&self, plan: &[TrainingItem]) -> Result<SaveOutcome, PlanStoreError>;

    /// Read the persisted plan back, strictly validating dates.
    async fn load(&self) -> Result<LoadOutcome, PlanStoreError>;
}

/// Two-column CSV store.
pub struct CsvPlanStore {
    path: PathBuf,
}

impl CsvPlanStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn path_string(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl PlanStore for CsvPlanStore {
    async fn save(&self, plan: &[TrainingItem]) -> Result<SaveOutcome, PlanStoreError> {
        if plan.is_empty() {
            return Err(PlanStoreError::WriteFailed {
                path: self.path_string(),
                reason: "refusing to write an empty plan".to_string(),
            });
        }

        let mut rows: Vec<&TrainingItem> = plan.iter().collect();
        rows.sort_by_key(|item| item.date);
        let start = rows[0].date;
        let end = rows[rows.len() - 1].date;

        let mut out = String::from("Date,Description\r\n");
        for item in &rows {
            out.push_str(&quote_field(&format_plan_date(item.date)));
            out.push(',');
            out.push_str(&quote_field(&item.description));
            out.push_str("\r\n");
        }

        tokio::fs::write(&self.path, out)
            .await
            .map_err(|e| PlanStoreError::WriteFailed {
                path: self.path_string(),
                reason: e.to_string(),
            })?;

        Ok(SaveOutcome {
            path: self.path_string(),
            rows_written: rows.len(),
            date_range: DateRange {
                start: format_plan_date(start),
                end: format_plan_date(end),
            },
        })
    }

    async fn load(&self) -> Result<LoadOutcome, PlanStoreError> {
        if !self.path.exists() {
            return Ok(LoadOutcome::NotFound {
                path: self.path_string(),
            });
        }

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PlanStoreError::ReadFailed {
                path: self.path_string(),
                reason: e.to_string(),
            })?;

        let records = parse_csv(&text);
        let Some(header) = records.first() else {
            return Ok(LoadOutcome::Failed {
                error: "CSV file is empty.".to_string(),
                path: self.path_string(),
            });
        };

        let date_col = header.iter().position(|c| c == "Date");
        let desc_col = header.iter().position(|c| c == "Description");
        let (Some(date_col), Some(desc_col)) = (date_col, desc_col) else {
            return Ok(LoadOutcome::Failed {
                error: "CSV must contain columns [\"Date\", \"Description\"].".to_string(),
                path: self.path_string(),
            });
        };

        let mut plan = Vec::new();
        for record in records.iter().skip(1) {
            let raw_date = record.get(date_col).map(String::as_str).unwrap_or("");
            let description = record.get(desc_col).cloned().unwrap_or_default();
            let Some(date) = parse_plan_date(raw_date) else {
                return Ok(LoadOutcome::Failed {
                    error: "Dates must be in \"DD-MM-YYYY\" format.".to_string(),
                    path: self.path_string(),
                });
            };
            plan.push(TrainingItem { date, description });
        }

        plan.sort_by_key(|item| item.date);
        Ok(LoadOutcome::Ok { plan })
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or line break.
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Minimal RFC-style CSV record parser (quoted fields, doubled quotes).
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' if field.is_empty() => in_quotes = true,
                ',' => record.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    // Drop blank trailing lines.
    records.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    records
}
