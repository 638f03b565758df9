//! Home Assistant telemetry source
//!
//! Reads the battery state of charge from a Home Assistant sensor entity
//! via the REST states API.

use std::time::Duration;

use serde_json::Value;
use ureq::{Agent, AgentBuilder};

use crate::errors::TelemetryError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for one SoC sensor entity
pub struct HaClient {
    agent: Agent,
    states_url: String,
    token: String,
}

impl HaClient {
    pub fn new(base_url: &str, token: String, entity: &str) -> Self {
        let agent = AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let states_url = format!("{}/api/states/{}", base_url.trim_end_matches('/'), entity);

        Self {
            agent,
            states_url,
            token,
        }
    }

    /// Return the current battery SoC percentage.
    ///
    /// Always queries live state; retry policy belongs to the control loop.
    pub fn get_soc(&self) -> Result<f64, TelemetryError> {
        let response = self
            .agent
            .get(&self.states_url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => TelemetryError::Rejected(code),
                ureq::Error::Transport(t) => TelemetryError::Unreachable(t.to_string()),
            })?;

        let body: Value = response
            .into_json()
            .map_err(|e| TelemetryError::Malformed(e.to_string()))?;

        parse_soc(&body)
    }
}

/// Extract the numeric `state` field from a states API response.
///
/// Home Assistant reports every state as a string; a sensor that is down
/// reports "unavailable" or "unknown", which must fail here rather than
/// produce a SoC value.
fn parse_soc(body: &Value) -> Result<f64, TelemetryError> {
    let state = body
        .get("state")
        .ok_or_else(|| TelemetryError::Malformed("response lacks a state field".to_string()))?;

    let soc = match state {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|soc| soc.is_finite())
    .ok_or_else(|| TelemetryError::NotNumeric(state.to_string()))?;

    Ok(soc)
}
