//! Domain schemas — training plan items, intent enums, questionnaire fields.

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Canonical on-disk and user-facing date format (day-month-year).
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Parse a plan date, accepting day-month-year or year-month-day.
///
/// Every other format is a validation failure, never a silent drop.
pub fn parse_plan_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Format a date in the canonical day-month-year form.
pub fn format_plan_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn deserialize_plan_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_plan_date(&raw)
        .ok_or_else(|| D::Error::custom(format!("Date must be DD-MM-YYYY or YYYY-MM-DD, got {raw:?}")))
}

fn serialize_plan_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_plan_date(*date))
}

/// One session of the training plan.
///
/// Field names match the persisted CSV columns and the structured-output
/// schema requested from the generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingItem {
    #[serde(
        rename = "Date",
        deserialize_with = "deserialize_plan_date",
        serialize_with = "serialize_plan_date"
    )]
    pub date: NaiveDate,
    #[serde(rename = "Description")]
    pub description: String,
}

/// Structured result of the plan-generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub plan: Vec<TrainingItem>,
    pub justification: String,
}

/// Entry intent: create a new plan or discuss an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    Make,
    Discuss,
}

/// Structured output of the entry-intent classification call.
#[derive(Debug, Clone, Deserialize)]
pub struct WelcomeRoute {
    pub mode: StartMode,
}

/// Modify intent: rework the current plan or keep discussing.
///
/// Only a literal `continue` keeps the conversation in discussion; any other
/// label the classifier emits deserializes to `Modify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyMode {
    Continue,
    Modify,
}

impl<'de> Deserialize<'de> for ModifyMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "continue" => ModifyMode::Continue,
            _ => ModifyMode::Modify,
        })
    }
}

/// Structured output of the modify-intent classification call.
#[derive(Debug, Clone, Deserialize)]
pub struct ModifyRoute {
    pub mode: ModifyMode,
}

/// The ordered questionnaire fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SpecField {
    Sport,
    Goal,
    TargetEventDate,
    CurrentWeeklyVolume,
    LongestRecent,
    WeeklyAvailability,
    Constraints,
    AdditionalRemarks,
}

impl SpecField {
    /// All fields, in interview order.
    pub const ALL: [SpecField; 8] = [
        SpecField::Sport,
        SpecField::Goal,
        SpecField::TargetEventDate,
        SpecField::CurrentWeeklyVolume,
        SpecField::LongestRecent,
        SpecField::WeeklyAvailability,
        SpecField::Constraints,
        SpecField::AdditionalRemarks,
    ];

    /// Fields that become derivable from telemetry once consent is given.
    pub const TELEMETRY_DERIVED: [SpecField; 2] =
        [SpecField::CurrentWeeklyVolume, SpecField::LongestRecent];

    /// Stable key used in spec maps and prompts.
    pub fn key(self) -> &'static str {
        match self {
            Self::Sport => "sport",
            Self::Goal => "goal",
            Self::TargetEventDate => "target_event_date",
            Self::CurrentWeeklyVolume => "current_weekly_volume",
            Self::LongestRecent => "longest_recent",
            Self::WeeklyAvailability => "weekly_availability",
            Self::Constraints => "constraints",
            Self::AdditionalRemarks => "additional_remarks",
        }
    }

    /// The generic question the questionnaire step rephrases for the user.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Sport => {
                "The sport (running / cycling / trail / triathlon) you want a program for"
            }
            Self::Goal => {
                "Goal (e.g., finish, 10k in 45:00, build base, comeback). \
                 If no event, plan length (weeks, e.g., 8 or 12):"
            }
            Self::TargetEventDate => "Target event date:",
            Self::CurrentWeeklyVolume => "Current weekly volume:",
            Self::LongestRecent => "Longest recent session:",
            Self::WeeklyAvailability => "Weekly availability (days + approx duration):",
            Self::Constraints => "Constraints (injuries, travel, equipment, surfaces)",
            Self::AdditionalRemarks => "Additional specification the user might want to work on ?",
        }
    }
}

impl std::fmt::Display for SpecField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
