//! Statistical summary of an activity snapshot.
//!
//! Summarizes the raw activity list into totals, per-week rates, per-sport
//! session averages, and an inferred primary sport. Missing metrics stay
//! absent rather than being zero-filled into averages.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

/// Aggregate over the whole window.
#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub sessions: usize,
    pub hours: f64,
    pub distance_km: f64,
    pub total_training_stress_score: Option<f64>,
    pub total_training_load: Option<f64>,
    pub avg_intensity_factor: Option<f64>,
    pub time_gap_days: Option<i64>,
}

/// Weekly rates, derived when the window spans at least a day.
#[derive(Debug, Clone, Serialize)]
pub struct PerWeek {
    pub sessions_per_week: f64,
    pub hours_per_week: f64,
    pub distance_km_per_week: f64,
    pub training_stress_score_per_week: Option<f64>,
    pub training_load_per_week: Option<f64>,
}

/// Session averages for one activity type.
#[derive(Debug, Clone, Serialize)]
pub struct SportAverages {
    pub avg_distance_km: Option<f64>,
    pub avg_session_min: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub avg_intensity_factor: Option<f64>,
    pub avg_training_stress_score: Option<f64>,
    pub avg_training_load: Option<f64>,
    pub sessions: usize,
}

/// The full summary handed to the coach prompt.
#[derive(Debug, Clone, Serialize)]
pub struct FitnessSummary {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_week: Option<PerWeek>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub per_sport: BTreeMap<String, SportAverages>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_sport: Option<String>,
}

impl FitnessSummary {
    fn empty(status: &str) -> Self {
        Self {
            status: status.to_string(),
            totals: None,
            per_week: None,
            per_sport: BTreeMap::new(),
            primary_sport: None,
        }
    }
}

#[derive(Debug, Default)]
struct Activity {
    start: Option<NaiveDateTime>,
    sport: Option<String>,
    distance_km: Option<f64>,
    minutes: Option<f64>,
    intensity_factor: Option<f64>,
    stress_score: Option<f64>,
    training_load: Option<f64>,
}

impl Activity {
    fn speed_kmh(&self) -> Option<f64> {
        match (self.distance_km, self.minutes) {
            (Some(km), Some(min)) if min > 0.0 => Some(km / (min / 60.0)),
            _ => None,
        }
    }
}

/// Summarize a raw activity snapshot.
pub fn fitness_summary(snapshot: &Value) -> FitnessSummary {
    let Some(activity_list) = snapshot
        .pointer("/result/SnapshotFitnessDetails/payload/activityList")
        .and_then(Value::as_array)
    else {
        return FitnessSummary::empty("No data found");
    };
    if activity_list.is_empty() {
        return FitnessSummary::empty("No activities");
    }

    let activities: Vec<Activity> = activity_list.iter().map(parse_activity).collect();

    let sessions = activities.len();
    let hours = activities.iter().filter_map(|a| a.minutes).sum::<f64>() / 60.0;
    let distance_km = activities.iter().filter_map(|a| a.distance_km).sum::<f64>();
    let total_tss = sum_present(activities.iter().map(|a| a.stress_score));
    let total_load = sum_present(activities.iter().map(|a| a.training_load));
    let avg_if = mean_present(activities.iter().map(|a| a.intensity_factor));

    let time_gap_days = {
        let starts: Vec<NaiveDateTime> = activities.iter().filter_map(|a| a.start).collect();
        match (starts.iter().min(), starts.iter().max()) {
            // clamped to >= 1 so per-week rates never divide by zero
            (Some(min), Some(max)) => Some(((*max - *min).num_days()).max(1)),
            _ => None,
        }
    };

    let totals = Totals {
        sessions,
        hours: round_to(hours, 2),
        distance_km: round_to(distance_km, 1),
        total_training_stress_score: total_tss.map(|v| round_to(v, 0)),
        total_training_load: total_load.map(|v| round_to(v, 0)),
        avg_intensity_factor: avg_if.map(|v| round_to(v, 3)),
        time_gap_days,
    };

    let per_week = time_gap_days.map(|gap| {
        let weeks = gap as f64 / 7.0;
        PerWeek {
            sessions_per_week: round_to(sessions as f64 / weeks, 1),
            hours_per_week: round_to(hours / weeks, 1),
            distance_km_per_week: round_to(distance_km / weeks, 1),
            training_stress_score_per_week: total_tss.map(|v| round_to(v / weeks, 1)),
            training_load_per_week: total_load.map(|v| round_to(v / weeks, 1)),
        }
    });

    let mut per_sport: BTreeMap<String, Vec<&Activity>> = BTreeMap::new();
    for activity in &activities {
        if let Some(sport) = &activity.sport {
            per_sport.entry(sport.clone()).or_default().push(activity);
        }
    }

    let sport_averages: BTreeMap<String, SportAverages> = per_sport
        .iter()
        .map(|(sport, group)| {
            (
                sport.clone(),
                SportAverages {
                    avg_distance_km: mean_present(group.iter().map(|a| a.distance_km))
                        .map(|v| round_to(v, 2)),
                    avg_session_min: mean_present(group.iter().map(|a| a.minutes))
                        .map(|v| round_to(v, 1)),
                    avg_speed_kmh: mean_present(group.iter().map(|a| a.speed_kmh()))
                        .map(|v| round_to(v, 2)),
                    avg_intensity_factor: mean_present(group.iter().map(|a| a.intensity_factor))
                        .map(|v| round_to(v, 3)),
                    avg_training_stress_score: mean_present(group.iter().map(|a| a.stress_score))
                        .map(|v| round_to(v, 1)),
                    avg_training_load: mean_present(group.iter().map(|a| a.training_load))
                        .map(|v| round_to(v, 1)),
                    sessions: group.len(),
                },
            )
        })
        .collect();

    // Primary sport by total distance, falling back to session frequency.
    let primary_sport = {
        let by_distance = per_sport
            .iter()
            .map(|(sport, group)| {
                (
                    sport.clone(),
                    group.iter().filter_map(|a| a.distance_km).sum::<f64>(),
                )
            })
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match by_distance {
            Some((sport, distance)) if distance > 0.0 => Some(sport),
            _ => per_sport
                .iter()
                .max_by_key(|(_, group)| group.len())
                .map(|(sport, _)| sport.clone()),
        }
    };

    FitnessSummary {
        status: "ok".to_string(),
        totals: Some(totals),
        per_week,
        per_sport: sport_averages,
        primary_sport,
    }
}

fn parse_activity(raw: &Value) -> Activity {
    let start = raw
        .get("startTimeLocal")
        .and_then(Value::as_str)
        .and_then(parse_start_time);
    let sport = raw
        .pointer("/activityType/typeKey")
        .and_then(Value::as_str)
        .map(str::to_string);
    let distance_km = number(raw, "distance").map(|m| m / 1000.0);
    let minutes = number(raw, "duration").map(|s| s / 60.0);

    Activity {
        start,
        sport,
        distance_km,
        minutes,
        intensity_factor: number(raw, "intensityFactor"),
        stress_score: number(raw, "trainingStressScore"),
        training_load: number(raw, "activityTrainingLoad"),
    }
}

fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    None
}

fn number(raw: &Value, key: &str) -> Option<f64> {
    raw.get(key).and_then(Value::as_f64)
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum())
    }
}

fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(activities: Vec<Value>) -> Value {
        json!({
            "result": {
                "SnapshotFitnessDetails": {
                    "payload": { "activityList": activities }
                }
            }
        })
    }

    fn run(start: &str, distance_m: f64, duration_s: f64) -> Value {
        json!({
            "startTimeLocal": start,
            "activityType": { "typeKey": "running" },
            "distance": distance_m,
            "duration": duration_s,
            "intensityFactor": 0.8,
            "trainingStressScore": 50.0,
            "activityTrainingLoad": 90.0
        })
    }

    #[test]
    fn missing_result_is_no_data() {
        let summary = fitness_summary(&json!({}));
        assert_eq!(summary.status, "No data found");
        assert!(summary.totals.is_none());
    }

    #[test]
    fn empty_activity_list_is_no_activities() {
        let summary = fitness_summary(&snapshot(vec![]));
        assert_eq!(summary.status, "No activities");
    }

    #[test]
    fn totals_and_per_week_rates() {
        let summary = fitness_summary(&snapshot(vec![
            run("2025-06-01 08:00:00", 10_000.0, 3600.0),
            run("2025-06-15 08:00:00", 12_000.0, 4200.0),
        ]));
        assert_eq!(summary.status, "ok");
        let totals = summary.totals.unwrap();
        assert_eq!(totals.sessions, 2);
        assert_eq!(totals.distance_km, 22.0);
        assert_eq!(totals.time_gap_days, Some(14));
        assert_eq!(totals.total_training_stress_score, Some(100.0));

        let per_week = summary.per_week.unwrap();
        assert_eq!(per_week.sessions_per_week, 1.0);
        assert_eq!(per_week.distance_km_per_week, 11.0);
    }

    #[test]
    fn same_day_window_clamps_gap_to_one_day() {
        let summary = fitness_summary(&snapshot(vec![
            run("2025-06-01 08:00:00", 5_000.0, 1800.0),
            run("2025-06-01 18:00:00", 5_000.0, 1800.0),
        ]));
        assert_eq!(summary.totals.unwrap().time_gap_days, Some(1));
        assert!(summary.per_week.is_some());
    }

    #[test]
    fn primary_sport_by_distance() {
        let mut cycling = run("2025-06-02 08:00:00", 40_000.0, 5400.0);
        cycling["activityType"]["typeKey"] = json!("cycling");
        let summary = fitness_summary(&snapshot(vec![
            run("2025-06-01 08:00:00", 10_000.0, 3600.0),
            run("2025-06-03 08:00:00", 8_000.0, 3000.0),
            cycling,
        ]));
        assert_eq!(summary.primary_sport.as_deref(), Some("cycling"));
        assert_eq!(summary.per_sport["running"].sessions, 2);
    }

    #[test]
    fn primary_sport_falls_back_to_frequency_without_distance() {
        let strength = |start: &str| {
            json!({
                "startTimeLocal": start,
                "activityType": { "typeKey": "strength_training" },
                "duration": 2400.0
            })
        };
        let mut yoga = strength("2025-06-05 08:00:00");
        yoga["activityType"]["typeKey"] = json!("yoga");
        let summary = fitness_summary(&snapshot(vec![
            strength("2025-06-01 08:00:00"),
            strength("2025-06-03 08:00:00"),
            yoga,
        ]));
        assert_eq!(summary.primary_sport.as_deref(), Some("strength_training"));
    }

    #[test]
    fn missing_metrics_stay_absent() {
        let bare = json!({
            "startTimeLocal": "2025-06-01 08:00:00",
            "activityType": { "typeKey": "running" },
            "duration": 3600.0
        });
        let summary = fitness_summary(&snapshot(vec![bare]));
        let totals = summary.totals.unwrap();
        assert_eq!(totals.total_training_stress_score, None);
        assert_eq!(totals.avg_intensity_factor, None);
        assert_eq!(summary.per_sport["running"].avg_distance_km, None);
    }
}
