//! Authenticated access through the session proxy.
//!
//! The proxy holds the upstream login cookies and hands back its own session
//! cookie, which the shared session client keeps for the life of the process.

use std::fmt;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fpl_api::{EntryInfo, decode};
use crate::http_cache::send_for_body;
use crate::http_client::session_client;
use crate::league::{LeagueStandings, parse_league_standings_json};
use crate::live::{LiveEvent, parse_live_event_json};
use crate::state::{Money, Pick};

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferSummary {
    /// Bank in tenths.
    pub bank: i32,
    #[serde(default)]
    pub value: Option<i32>,
    #[serde(default)]
    pub made: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub cost: i32,
}

impl TransferSummary {
    pub fn bank(&self) -> Money {
        Money(self.bank)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MyTeam {
    pub picks: Vec<Pick>,
    pub transfers: TransferSummary,
    #[serde(rename = "entryId")]
    pub entry_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MePlayer {
    pub entry: Option<u32>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub player: Option<MePlayer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferRecord {
    pub element_in: u32,
    #[serde(default)]
    pub element_in_cost: i32,
    pub element_out: u32,
    #[serde(default)]
    pub element_out_cost: i32,
    pub entry: u32,
    pub event: u32,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    success: bool,
}

/// What the application needs from an authenticated upstream session.
pub trait SessionApi {
    fn login(&self, credentials: &Credentials) -> Result<()>;
    fn my_team(&self) -> Result<MyTeam>;
    fn me(&self) -> Result<Me>;
    fn live_event(&self, event_id: u32) -> Result<LiveEvent>;
    fn entry(&self, entry_id: u32) -> Result<EntryInfo>;
    fn entry_transfers(&self, entry_id: u32) -> Result<Vec<TransferRecord>>;
    fn league_standings(&self, league_id: u32) -> Result<LeagueStandings>;
}

pub struct ProxySession {
    client: &'static Client,
    base: String,
}

impl ProxySession {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: session_client()?,
            base: config.proxy_base.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        authorized(self.client.get(&url), &url)
    }
}

/// 401 and 403 from the proxy mean the session is missing or expired.
fn authorized(req: RequestBuilder, url: &str) -> Result<String> {
    match send_for_body(req, url) {
        Err(Error::Upstream { status, .. })
            if status == StatusCode::UNAUTHORIZED.as_u16()
                || status == StatusCode::FORBIDDEN.as_u16() =>
        {
            Err(Error::Auth)
        }
        other => other,
    }
}

impl SessionApi for ProxySession {
    fn login(&self, credentials: &Credentials) -> Result<()> {
        let url = self.url("login");
        let body = authorized(self.client.post(&url).json(credentials), &url)?;
        let reply: LoginReply = decode(&body)?;
        if !reply.success {
            warn!("login rejected by proxy");
            return Err(Error::Auth);
        }
        info!("session established");
        Ok(())
    }

    fn my_team(&self) -> Result<MyTeam> {
        decode(&self.get("my-team")?)
    }

    fn me(&self) -> Result<Me> {
        decode(&self.get("me")?)
    }

    fn live_event(&self, event_id: u32) -> Result<LiveEvent> {
        parse_live_event_json(&self.get(&format!("event/{event_id}/live"))?)
    }

    fn entry(&self, entry_id: u32) -> Result<EntryInfo> {
        decode(&self.get(&format!("entry/{entry_id}"))?)
    }

    fn entry_transfers(&self, entry_id: u32) -> Result<Vec<TransferRecord>> {
        decode(&self.get(&format!("entry/{entry_id}/transfers"))?)
    }

    fn league_standings(&self, league_id: u32) -> Result<LeagueStandings> {
        parse_league_standings_json(&self.get(&format!("leagues-classic/{league_id}/standings"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("gaffer@example.com", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("gaffer@example.com"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn my_team_reads_proxy_entry_id() {
        let team: MyTeam = decode(
            r#"{"picks":[{"element":5,"position":1,"multiplier":1,"is_captain":false,"is_vice_captain":false}],
                "chips":[],
                "transfers":{"cost":4,"status":"cost","limit":1,"made":0,"bank":23,"value":1002},
                "entryId":4242}"#,
        )
        .unwrap();
        assert_eq!(team.entry_id, 4242);
        assert_eq!(team.transfers.bank(), Money(23));
        assert_eq!(team.picks[0].element, 5);
    }
}
