use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::error::{Error, Result};

const PUBLIC_TIMEOUT_SECS: u64 = 15;
const SESSION_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) xgaffer";

static PUBLIC: OnceCell<Client> = OnceCell::new();
static SESSION: OnceCell<Client> = OnceCell::new();

pub fn public_client() -> Result<&'static Client> {
    PUBLIC.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(PUBLIC_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network(format!("failed to build http client: {e}")))
    })
}

/// Client for the session proxy. Keeps the proxy's session cookie for the
/// lifetime of the process.
pub fn session_client() -> Result<&'static Client> {
    SESSION.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(SESSION_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build session client: {e}")))
    })
}
