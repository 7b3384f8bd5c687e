use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http_cache::{fetch_json, fetch_json_cached};
use crate::http_client::public_client;
use crate::state::{Club, Gameweek, Money, Pick, Player, UserTeam};

const BOOTSTRAP_KEY: &str = "bootstrap_static";
const FIXTURES_KEY: &str = "fixtures";

#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub players: Vec<Player>,
    pub clubs: Vec<Club>,
    pub events: Vec<Gameweek>,
}

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    elements: Option<Vec<Player>>,
    teams: Option<Vec<Club>>,
    events: Option<Vec<Gameweek>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub id: u32,
    /// `None` while the fixture is unscheduled.
    #[serde(default)]
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    #[serde(default)]
    pub team_h_difficulty: Option<u8>,
    #[serde(default)]
    pub team_a_difficulty: Option<u8>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub kickoff_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRow {
    pub round: u32,
    #[serde(default)]
    pub total_points: i32,
    #[serde(default)]
    pub minutes: u32,
    /// Price at the time, in tenths.
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub opponent_team: u32,
    #[serde(default)]
    pub was_home: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingFixture {
    #[serde(default)]
    pub event: Option<u32>,
    pub difficulty: u8,
    #[serde(default)]
    pub is_home: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSummary {
    #[serde(default)]
    pub history: Vec<HistoryRow>,
    #[serde(default)]
    pub fixtures: Vec<UpcomingFixture>,
}

impl ElementSummary {
    pub fn next_difficulty(&self) -> Option<u8> {
        self.fixtures.first().map(|f| f.difficulty)
    }

    /// Mean points over the last `n` rounds played.
    pub fn recent_average(&self, n: usize) -> Option<f64> {
        let played: Vec<&HistoryRow> = self.history.iter().filter(|h| h.minutes > 0).collect();
        let recent = &played[played.len().saturating_sub(n)..];
        if recent.is_empty() {
            return None;
        }
        let total: i32 = recent.iter().map(|h| h.total_points).sum();
        Some(total as f64 / recent.len() as f64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryHistory {
    #[serde(default)]
    pub event: u32,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub rank: Option<u64>,
    #[serde(default)]
    pub overall_rank: Option<u64>,
    pub bank: i32,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub event_transfers: u32,
}

#[derive(Debug, Clone)]
pub struct TeamPicks {
    pub picks: Vec<Pick>,
    pub entry_history: EntryHistory,
}

#[derive(Debug, Deserialize)]
struct RawTeamPicks {
    picks: Option<Vec<Pick>>,
    entry_history: Option<EntryHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassicLeagueRef {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub entry_rank: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryLeagues {
    #[serde(default)]
    pub classic: Vec<ClassicLeagueRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryInfo {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub player_first_name: String,
    #[serde(default)]
    pub player_last_name: String,
    #[serde(default)]
    pub summary_overall_points: Option<i64>,
    #[serde(default)]
    pub summary_overall_rank: Option<u64>,
    #[serde(default)]
    pub summary_event_points: Option<i64>,
    #[serde(default)]
    pub summary_event_rank: Option<u64>,
    #[serde(default)]
    pub leagues: EntryLeagues,
}

impl EntryInfo {
    pub fn manager_name(&self) -> String {
        format!("{} {}", self.player_first_name, self.player_last_name)
            .trim()
            .to_string()
    }
}

/// Public competition data, served through the response cache where the
/// data is shared by every user.
pub struct FplApi {
    client: &'static Client,
    cache: Box<dyn CacheStore>,
    base: String,
    ttl: Duration,
}

impl FplApi {
    pub fn new(config: &Config, cache: Box<dyn CacheStore>) -> Result<Self> {
        Ok(Self {
            client: public_client()?,
            cache,
            base: config.api_base.clone(),
            ttl: config.cache_ttl,
        })
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn cached<T>(&self, path: &str, key: &str, parse: impl Fn(&str) -> Result<T>) -> Result<T> {
        fetch_json_cached(
            self.client,
            self.cache.as_ref(),
            &self.url(path),
            key,
            self.ttl,
            parse,
        )
    }

    pub fn bootstrap(&self) -> Result<Bootstrap> {
        let bootstrap = self.cached("bootstrap-static/", BOOTSTRAP_KEY, parse_bootstrap_json)?;
        info!(
            players = bootstrap.players.len(),
            clubs = bootstrap.clubs.len(),
            "bootstrap loaded"
        );
        Ok(bootstrap)
    }

    pub fn element_summary(&self, player_id: u32) -> Result<ElementSummary> {
        self.cached(
            &format!("element-summary/{player_id}/"),
            &format!("element_summary_{player_id}"),
            decode::<ElementSummary>,
        )
    }

    pub fn fixtures(&self) -> Result<Vec<Fixture>> {
        self.cached("fixtures/", FIXTURES_KEY, parse_fixtures_json)
    }

    pub fn team_picks(&self, entry_id: u32, event_id: u32) -> Result<TeamPicks> {
        let url = self.url(&format!("entry/{entry_id}/event/{event_id}/picks/"));
        parse_team_picks_json(&fetch_json(self.client, &url)?)
    }

    pub fn entry(&self, entry_id: u32) -> Result<EntryInfo> {
        let url = self.url(&format!("entry/{entry_id}/"));
        decode(&fetch_json(self.client, &url)?)
    }

    /// Picks and entry info are fetched in parallel; either failure fails both.
    pub fn load_team(&self, entry_id: u32, event_id: u32) -> Result<(TeamPicks, EntryInfo)> {
        let (picks, entry) = rayon::join(
            || self.team_picks(entry_id, event_id),
            || self.entry(entry_id),
        );
        Ok((picks?, entry?))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(Error::DataIncomplete("response body"));
    }
    Ok(serde_json::from_str(trimmed)?)
}

pub fn parse_bootstrap_json(raw: &str) -> Result<Bootstrap> {
    let raw: RawBootstrap = decode(raw)?;
    Ok(Bootstrap {
        players: raw.elements.ok_or(Error::DataIncomplete("elements"))?,
        clubs: raw.teams.ok_or(Error::DataIncomplete("teams"))?,
        events: raw.events.ok_or(Error::DataIncomplete("events"))?,
    })
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    decode(raw)
}

pub fn parse_team_picks_json(raw: &str) -> Result<TeamPicks> {
    let raw: RawTeamPicks = decode(raw)?;
    Ok(TeamPicks {
        picks: raw.picks.ok_or(Error::DataIncomplete("picks"))?,
        entry_history: raw
            .entry_history
            .ok_or(Error::DataIncomplete("entry_history"))?,
    })
}

/// Club id -> difficulty of that club's next unfinished fixture at or after
/// `from_event`.
pub fn next_fixture_difficulty(fixtures: &[Fixture], from_event: Option<u32>) -> HashMap<u32, u8> {
    let mut upcoming: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| !f.finished)
        .filter(|f| match (f.event, from_event) {
            (Some(e), Some(from)) => e >= from,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect();
    upcoming.sort_by_key(|f| (f.event, f.id));

    let mut out = HashMap::new();
    for f in upcoming {
        if let Some(d) = f.team_h_difficulty {
            out.entry(f.team_h).or_insert(d);
        }
        if let Some(d) = f.team_a_difficulty {
            out.entry(f.team_a).or_insert(d);
        }
    }
    out
}

/// Rebuilds the user team from a public picks + entry lookup, keeping the
/// local transfer count.
pub fn team_from_public(current: &UserTeam, picks: TeamPicks, entry: EntryInfo) -> UserTeam {
    let history = picks.entry_history;
    UserTeam {
        picks: picks.picks,
        bank: Money(history.bank),
        transfers: current.transfers,
        entry_id: Some(entry.id),
        team_name: entry.name.clone(),
        manager_name: entry.manager_name(),
        total_points: entry.summary_overall_points.unwrap_or(history.total_points),
        overall_rank: entry
            .summary_overall_rank
            .or(history.overall_rank)
            .unwrap_or_default(),
        event_points: entry.summary_event_points.unwrap_or(history.points),
        event_rank: entry
            .summary_event_rank
            .or(history.rank)
            .unwrap_or_default(),
    }
}
