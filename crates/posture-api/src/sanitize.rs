//! Boundary sanitization of client-supplied values.
//!
//! Nothing here fails: junk degrades to a safe default so a misbehaving
//! client cannot poison session statistics or stored logs.

use posture_core::{Frame, PostureStatus};
use posture_session::LoggedIssue;
use serde_json::{Map, Value};

/// Score in [0, 10]; non-numeric or non-finite input becomes 0
pub fn sanitize_score(value: &Value) -> f64 {
    clamp_score(number(value).unwrap_or(0.0))
}

pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 10.0)
    } else {
        0.0
    }
}

/// Known status, otherwise `Bad`
pub fn sanitize_status(value: &Value) -> PostureStatus {
    value
        .as_str()
        .and_then(PostureStatus::parse)
        .unwrap_or(PostureStatus::Bad)
}

/// Seconds as reported by the client, `NaN` when the value is not a number
pub fn sanitize_seconds(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// At most `max` issues, each reduced to bounded `type`/`severity`/`advice` strings
pub fn sanitize_issues(value: &Value, max: usize) -> Vec<LoggedIssue> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .take(max)
        .filter_map(Value::as_object)
        .map(|issue| {
            LoggedIssue::new(
                &text(issue.get("type")),
                &text(issue.get("severity")),
                &text(issue.get("advice")),
            )
        })
        .collect()
}

/// Frame from string-keyed landmarks, dropping indices above `max_index`
pub fn parse_frame(raw: &Map<String, Value>, max_index: u8) -> Frame {
    Frame::from_raw(raw)
        .iter()
        .filter(|(idx, _)| (*idx as u8) <= max_index)
        .map(|(idx, lm)| (idx, *lm))
        .collect()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
