//! Per-miner session lifecycle
//!
//! Each session exclusively owns the cached token for one rig; nothing here
//! is shared across miners. A session moves Unauthenticated -> Authenticated
//! on unlock and back on any detected expiry.

use serde_json::Value;
use tracing::debug;

use crate::config::MinerConfig;
use crate::errors::MinerError;
use crate::miner::activity::{classify, Activity};
use crate::miner::api::{HttpApi, MinerApi};

/// Authenticated access to one miner's control surface.
pub struct MinerSession<A: MinerApi = HttpApi> {
    api: A,
    addr: String,
    password: String,
    /// Cached session token; `None` means not known to be valid.
    token: Option<String>,
}

impl MinerSession<HttpApi> {
    pub fn new(config: &MinerConfig) -> Self {
        Self::with_api(HttpApi::new(), config.ip.to_string(), config.password.clone())
    }
}

impl<A: MinerApi> MinerSession<A> {
    pub fn with_api(api: A, addr: String, password: String) -> Self {
        Self {
            api,
            addr,
            password,
            token: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Discard any cached token and unlock the web GUI again.
    pub fn authenticate(&mut self) -> Result<(), MinerError> {
        self.token = None;
        self.ensure_token()?;
        Ok(())
    }

    fn ensure_token(&mut self) -> Result<String, MinerError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let token = self.api.unlock(&self.addr, &self.password)?;
        debug!(miner = %self.addr, "session unlocked");
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Run one authenticated operation under the bounded retry rule: on a
    /// reported expiry the token is discarded, one re-authentication is
    /// attempted and the operation retried exactly once. A second expiry
    /// surfaces as `ReauthFailed`; there is no third attempt.
    fn with_session<T>(
        &mut self,
        op: impl Fn(&A, &str, &str) -> Result<T, MinerError>,
    ) -> Result<T, MinerError> {
        let token = self.ensure_token()?;
        match op(&self.api, &self.addr, &token) {
            Err(MinerError::SessionExpired) => {
                debug!(miner = %self.addr, "session expired, re-authenticating");
                self.authenticate()?;
                let token = self.ensure_token()?;
                match op(&self.api, &self.addr, &token) {
                    Err(MinerError::SessionExpired) => {
                        self.token = None;
                        Err(MinerError::ReauthFailed)
                    }
                    result => result,
                }
            }
            result => result,
        }
    }

    /// Raw status payload, authenticating first when no token is cached.
    pub fn status(&mut self) -> Result<Value, MinerError> {
        self.with_session(|api, addr, token| api.fetch_status(addr, token))
    }

    /// Issue a start or stop command. A firmware "already in the requested
    /// state" response counts as success (handled in the transport).
    pub fn set_mining(&mut self, start: bool) -> Result<(), MinerError> {
        self.with_session(|api, addr, token| api.send_command(addr, token, start))
    }

    /// Classified activity from the current status payload.
    pub fn activity(&mut self) -> Result<Activity, MinerError> {
        Ok(classify(&self.status()?))
    }
}
