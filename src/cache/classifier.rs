//! Content-based classification of cached payloads
//!
//! Callers that don't know a payload's volatility up front can ask a
//! [`Classifier`] to inspect it. The cache itself never calls these during
//! `get`; they only feed the `classification` argument or `get_auto`.

use serde_json::Value;
use tracing::trace;

use super::types::DataClassification;

/// Strategy mapping a payload to a [`DataClassification`].
///
/// Any `Fn(&Value) -> DataClassification` closure is a classifier.
pub trait Classifier: Send + Sync {
    fn classify(&self, payload: &Value) -> DataClassification;

    /// Whether the payload contains events that are in progress
    fn has_live_markers(&self, payload: &Value) -> bool {
        self.classify(payload) == DataClassification::Live
    }
}

impl<F> Classifier for F
where
    F: Fn(&Value) -> DataClassification + Send + Sync,
{
    fn classify(&self, payload: &Value) -> DataClassification {
        self(payload)
    }
}

/// Reads `isLive` / `isCompleted` flags from `payload.events[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl DefaultClassifier {
    fn events(payload: &Value) -> &[Value] {
        payload
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn flag(event: &Value, name: &str) -> bool {
        event.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

impl Classifier for DefaultClassifier {
    fn classify(&self, payload: &Value) -> DataClassification {
        let events = Self::events(payload);
        if events.is_empty() {
            trace!("No events in payload, defaulting to scheduled");
            return DataClassification::Scheduled;
        }

        if self.has_live_markers(payload) {
            return DataClassification::Live;
        }

        let has_scheduled = events
            .iter()
            .any(|event| !Self::flag(event, "isLive") && !Self::flag(event, "isCompleted"));

        if has_scheduled {
            DataClassification::Scheduled
        } else {
            DataClassification::Finished
        }
    }

    fn has_live_markers(&self, payload: &Value) -> bool {
        let events = Self::events(payload);
        let live_count = events
            .iter()
            .filter(|event| Self::flag(event, "isLive"))
            .count();
        trace!(
            "Live events detected: {} live out of {} total events",
            live_count,
            events.len()
        );
        live_count > 0
    }
}

/// Status names used by ESPN scoreboards for play in progress
const ESPN_LIVE_NAMES: &[&str] = &[
    "live",
    "in progress",
    "halftime",
    "break",
    "first half",
    "second half",
    "extra time",
    "penalty",
    "overtime",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    Live,
    Scheduled,
    Finished,
    Unknown,
}

/// Counts live / scheduled / finished events and folds them into a classification.
fn fold_states(states: impl Iterator<Item = EventState>) -> DataClassification {
    let (mut live, mut scheduled, mut finished) = (false, false, false);
    for state in states {
        match state {
            EventState::Live => live = true,
            EventState::Scheduled => scheduled = true,
            EventState::Finished => finished = true,
            EventState::Unknown => {}
        }
    }

    if live {
        DataClassification::Live
    } else if finished && !scheduled {
        DataClassification::Finished
    } else {
        DataClassification::Scheduled
    }
}

/// Understands ESPN scoreboard payloads (`events[].status.type` or
/// `events[].competitions[0].status.type`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EspnClassifier;

impl EspnClassifier {
    fn events(payload: &Value) -> &[Value] {
        if let Some(events) = payload.get("events").and_then(Value::as_array) {
            return events;
        }
        payload.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    fn status_type(event: &Value) -> Option<&Value> {
        event
            .pointer("/status/type")
            .or_else(|| event.pointer("/competitions/0/status/type"))
    }

    fn event_state(event: &Value) -> EventState {
        let Some(status) = Self::status_type(event) else {
            return EventState::Unknown;
        };
        let state = status
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let name = status
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .replace('_', " ");

        if state == "in" || ESPN_LIVE_NAMES.iter().any(|live| name.contains(live)) {
            EventState::Live
        } else if state == "pre" || name.contains("scheduled") {
            EventState::Scheduled
        } else if state == "post" || name.contains("final") || name.contains("full time") {
            EventState::Finished
        } else {
            EventState::Unknown
        }
    }
}

impl Classifier for EspnClassifier {
    fn classify(&self, payload: &Value) -> DataClassification {
        fold_states(Self::events(payload).iter().map(Self::event_state))
    }
}

/// Understands esports match payloads that carry plain status strings on the
/// match itself or on items of `data[]`, `games[]` and `results[]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsportsClassifier;

impl EsportsClassifier {
    fn item_state(item: &Value) -> EventState {
        if item.get("live").and_then(Value::as_bool) == Some(true) {
            return EventState::Live;
        }
        let status = item
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase();
        match status.as_str() {
            "live" | "ongoing" => EventState::Live,
            "upcoming" | "scheduled" => EventState::Scheduled,
            "finished" | "completed" => EventState::Finished,
            _ => EventState::Unknown,
        }
    }

    fn items(payload: &Value) -> impl Iterator<Item = &Value> {
        let nested = ["data", "games", "results"]
            .into_iter()
            .filter_map(|field| payload.get(field).and_then(Value::as_array))
            .flatten();
        std::iter::once(payload).chain(nested)
    }
}

impl Classifier for EsportsClassifier {
    fn classify(&self, payload: &Value) -> DataClassification {
        fold_states(Self::items(payload).map(Self::item_state))
    }
}
