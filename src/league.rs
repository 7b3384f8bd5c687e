use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fpl_api::decode;

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueInfo {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StandingRow {
    pub rank: u32,
    pub entry: u32,
    #[serde(default)]
    pub entry_name: String,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub event_total: i64,
}

#[derive(Debug, Clone)]
pub struct LeagueStandings {
    pub league: LeagueInfo,
    pub results: Vec<StandingRow>,
    pub has_next: bool,
}

impl LeagueStandings {
    pub fn row_for(&self, entry_id: u32) -> Option<&StandingRow> {
        self.results.iter().find(|r| r.entry == entry_id)
    }

    /// Points behind first place; zero for the leader.
    pub fn gap_to_leader(&self, entry_id: u32) -> Option<i64> {
        let leader = self.results.iter().map(|r| r.total).max()?;
        self.row_for(entry_id).map(|r| leader - r.total)
    }

    /// Highest gameweek score in the page.
    pub fn top_event_score(&self) -> Option<&StandingRow> {
        self.results.iter().max_by_key(|r| r.event_total)
    }
}

#[derive(Debug, Deserialize)]
struct RawStandings {
    league: Option<LeagueInfo>,
    standings: Option<RawStandingsPage>,
}

#[derive(Debug, Deserialize)]
struct RawStandingsPage {
    #[serde(default)]
    has_next: bool,
    results: Option<Vec<StandingRow>>,
}

pub fn parse_league_standings_json(raw: &str) -> Result<LeagueStandings> {
    let raw: RawStandings = decode(raw)?;
    let league = raw.league.ok_or(Error::DataIncomplete("league"))?;
    let page = raw.standings.ok_or(Error::DataIncomplete("standings"))?;
    let mut results = page
        .results
        .ok_or(Error::DataIncomplete("standings.results"))?;
    results.sort_by_key(|r| r.rank);
    Ok(LeagueStandings {
        league,
        results,
        has_next: page.has_next,
    })
}
