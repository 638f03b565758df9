//! Activity detection over heterogeneous status payloads
//!
//! Firmware revisions are inconsistent about exposing an explicit mining
//! flag, so classification is an ordered chain of fallbacks. Hashrate
//! inference comes last: a momentary zero reading does not prove the rig is
//! idle, but it is the best signal current builds expose.

use serde_json::Value;

/// What a miner is currently doing, as far as its payload tells us.
///
/// `Unknown` must never be collapsed into Active or Idle; the decision
/// layer holds off for a cycle instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Active,
    Idle,
    Unknown(String),
}

/// Explicit flags on older builds.
const FLAG_KEYS: [&str; 2] = ["is_mining", "mining"];

/// Mixed builds report a state string instead.
const STATE_KEY: &str = "miner_state";
const ACTIVE_STATES: [&str; 3] = ["running", "hashing", "mining"];

/// Realtime hashrate keys across firmware versions.
const HASHRATE_KEYS: [&str; 3] = ["hr_realtime", "instant_hashrate", "hashrate"];

/// Classify a status or summary payload. First definite verdict wins.
pub fn classify(payload: &Value) -> Activity {
    if !payload.is_object() {
        return Activity::Unknown("payload is not a JSON object".to_string());
    }

    explicit_flag(payload)
        .or_else(|| state_string(payload))
        .or_else(|| hashrate(payload))
        .unwrap_or_else(|| {
            Activity::Unknown("no mining flag, miner_state, or hashrate field".to_string())
        })
}

fn explicit_flag(payload: &Value) -> Option<Activity> {
    FLAG_KEYS.into_iter().find_map(|key| {
        let value = payload.get(key)?;
        // Ill-typed flags fall through to the next tier.
        as_bool(value).map(|on| if on { Activity::Active } else { Activity::Idle })
    })
}

fn state_string(payload: &Value) -> Option<Activity> {
    let state = payload.get(STATE_KEY)?.as_str()?.to_lowercase();
    // Other state strings fall through to hashrate inference.
    ACTIVE_STATES
        .contains(&state.as_str())
        .then_some(Activity::Active)
}

fn hashrate(payload: &Value) -> Option<Activity> {
    let mut recognized = false;

    for key in HASHRATE_KEYS {
        let Some(value) = payload.get(key) else {
            continue;
        };
        let Some(rate) = as_f64(value) else {
            continue;
        };
        recognized = true;
        if rate > 0.0 {
            return Some(Activity::Active);
        }
    }

    // Every recognized hashrate field reads zero: not hashing.
    recognized.then_some(Activity::Idle)
}

/// Flags show up as bool, 0/1 numbers, or strings thereof.
fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            s => s.parse::<f64>().ok().map(|n| n != 0.0),
        },
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
