//! Wire payload parsing for actor commands.
//!
//! Commands arrive as JSON objects. The `start` payload carries the
//! review-log directory, the entity selection (`aids`), and optional
//! parameter overrides; `add_feedback` carries the flattened feedback
//! fields, with a timestamp accepted as epoch seconds, RFC 3339, or
//! absent (now).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use reid_core::{EntityId, Error, Feedback, Result};

/// Entity selection in a `start` payload: an explicit id list, or
/// `"all"` to adopt every entity mentioned in the review log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AidSelection {
    All,
    Ids(Vec<EntityId>),
}

/// Pull the `action` string out of a payload, leaving the rest.
pub fn split_action(payload: &Value) -> Result<(String, Map<String, Value>)> {
    let obj = payload
        .as_object()
        .ok_or_else(|| Error::UnknownAction("payload must be a JSON object".to_string()))?;
    let mut rest = obj.clone();
    let action = rest
        .remove("action")
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .ok_or_else(|| Error::UnknownAction("payload must have an 'action' item".to_string()))?;
    Ok((action, rest))
}

/// Parse the `aids` field of a `start` payload.
pub fn parse_aids(value: Option<&Value>) -> Result<AidSelection> {
    match value {
        None => Ok(AidSelection::All),
        Some(Value::String(s)) if s == "all" => Ok(AidSelection::All),
        Some(Value::Array(items)) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                let id = item.as_i64().ok_or_else(|| {
                    Error::Serialization(format!("aid must be an integer, got {item}"))
                })?;
                ids.push(EntityId(id));
            }
            Ok(AidSelection::Ids(ids))
        }
        Some(other) => Err(Error::Serialization(format!(
            "aids must be a list or 'all', got {other}"
        ))),
    }
}

/// Parse an `add_feedback` payload body into a [`Feedback`].
///
/// Normalizes the timestamp field before handing off to serde: integer
/// epoch seconds and RFC 3339 strings are both accepted; a missing
/// timestamp means "now".
pub fn parse_feedback(mut body: Map<String, Value>) -> Result<Feedback> {
    let ts = match body.remove("timestamp") {
        None | Some(Value::Null) => Utc::now(),
        Some(Value::Number(n)) => {
            let secs = n.as_i64().ok_or_else(|| {
                Error::Serialization(format!("timestamp out of range: {n}"))
            })?;
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| Error::Serialization(format!("timestamp out of range: {secs}")))?
        }
        Some(Value::String(s)) => s
            .parse::<DateTime<Utc>>()
            .map_err(|e| Error::Serialization(format!("bad timestamp '{s}': {e}")))?,
        Some(other) => {
            return Err(Error::Serialization(format!(
                "timestamp must be a number or string, got {other}"
            )))
        }
    };
    body.insert("timestamp".to_string(), Value::String(ts.to_rfc3339()));
    let feedback: Feedback = serde_json::from_value(Value::Object(body))?;
    Ok(feedback)
}
