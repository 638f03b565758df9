//! VNish web API transport
//!
//! Thin HTTP layer over one miner's control surface. Everything above this
//! talks in terms of [`MinerApi`] so session logic stays testable without a
//! live rig.

use std::time::Duration;

use serde_json::Value;
use ureq::{Agent, AgentBuilder};

use crate::errors::MinerError;

const PATH_UNLOCK: &str = "/api/v1/unlock";
const PATH_START: &str = "/api/v1/mining/start";
const PATH_STOP: &str = "/api/v1/mining/stop";
/// Newer firmware trees moved the status endpoint from /status to /summary.
const STATUS_PATHS: [&str; 2] = ["/api/v1/status", "/api/v1/summary"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport operations against one miner's web API.
pub trait MinerApi {
    /// Unlock the web GUI and return the session token.
    fn unlock(&self, addr: &str, password: &str) -> Result<String, MinerError>;

    /// Fetch the raw status payload using a cached token.
    fn fetch_status(&self, addr: &str, token: &str) -> Result<Value, MinerError>;

    /// Send a start (`true`) or stop (`false`) command.
    fn send_command(&self, addr: &str, token: &str, start: bool) -> Result<(), MinerError>;
}

/// Production transport on a blocking HTTP agent.
pub struct HttpApi {
    agent: Agent,
}

impl HttpApi {
    pub fn new() -> Self {
        Self {
            agent: AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    fn url(addr: &str, path: &str) -> String {
        format!("http://{}{}", addr, path)
    }
}

impl Default for HttpApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MinerApi for HttpApi {
    fn unlock(&self, addr: &str, password: &str) -> Result<String, MinerError> {
        let response = self
            .agent
            .post(&Self::url(addr, PATH_UNLOCK))
            .send_json(serde_json::json!({ "pw": password }))
            .map_err(|e| match e {
                ureq::Error::Status(401 | 403, _) => MinerError::AuthRejected,
                ureq::Error::Status(code, _) => MinerError::UnlockFailed(code),
                ureq::Error::Transport(t) => MinerError::Unreachable(t.to_string()),
            })?;

        let body: Value = response
            .into_json()
            .map_err(|e| MinerError::Malformed(e.to_string()))?;

        // Token field name depends on the firmware build.
        body.get("token")
            .or_else(|| body.get("access_token"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(MinerError::MissingToken)
    }

    fn fetch_status(&self, addr: &str, token: &str) -> Result<Value, MinerError> {
        for path in STATUS_PATHS {
            match self
                .agent
                .get(&Self::url(addr, path))
                .set("Authorization", token)
                .call()
            {
                Ok(response) => {
                    return response
                        .into_json()
                        .map_err(|e| MinerError::Malformed(e.to_string()))
                }
                Err(ureq::Error::Status(401, _)) => return Err(MinerError::SessionExpired),
                // Wrong firmware tree, try the next path.
                Err(ureq::Error::Status(404, _)) => continue,
                Err(ureq::Error::Status(code, _)) => return Err(MinerError::StatusFailed(code)),
                Err(ureq::Error::Transport(t)) => return Err(MinerError::Unreachable(t.to_string())),
            }
        }

        Err(MinerError::NoStatusEndpoint)
    }

    fn send_command(&self, addr: &str, token: &str, start: bool) -> Result<(), MinerError> {
        let path = if start { PATH_START } else { PATH_STOP };

        match self
            .agent
            .post(&Self::url(addr, path))
            .set("Authorization", token)
            .send_json(serde_json::json!({}))
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(401, _)) => Err(MinerError::SessionExpired),
            // Firmware answers 500 to a redundant start/stop: the rig is
            // already in the requested state.
            Err(ureq::Error::Status(500, _)) => Ok(()),
            Err(ureq::Error::Status(code, _)) => Err(MinerError::CommandFailed(code)),
            Err(ureq::Error::Transport(t)) => Err(MinerError::Unreachable(t.to_string())),
        }
    }
}
