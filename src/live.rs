use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fpl_api::decode;
use crate::state::UserTeam;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStats {
    #[serde(default)]
    pub total_points: i32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub goals_scored: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub bonus: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveElement {
    pub id: u32,
    #[serde(default)]
    pub stats: LiveStats,
}

#[derive(Debug, Clone)]
pub struct LiveEvent {
    pub elements: Vec<LiveElement>,
}

impl LiveEvent {
    pub fn stats_for(&self, player_id: u32) -> Option<&LiveStats> {
        self.elements
            .iter()
            .find(|e| e.id == player_id)
            .map(|e| &e.stats)
    }
}

#[derive(Debug, Deserialize)]
struct RawLiveEvent {
    elements: Option<Vec<LiveElement>>,
}

/// Fails with `DataIncomplete` when the payload has no `elements` list.
pub fn parse_live_event_json(raw: &str) -> Result<LiveEvent> {
    let raw: RawLiveEvent = decode(raw)?;
    Ok(LiveEvent {
        elements: raw.elements.ok_or(Error::DataIncomplete("elements"))?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptainReturn {
    pub player_id: u32,
    /// Points before the captain multiplier.
    pub points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveScore {
    pub total_points: i64,
    pub captain: Option<CaptainReturn>,
    /// Picks that had a live stats row.
    pub counted: usize,
}

/// Sums live points over the squad, each weighted by its pick multiplier.
pub fn live_points(team: &UserTeam, live: &LiveEvent) -> LiveScore {
    let mut score = LiveScore::default();
    for pick in &team.picks {
        let Some(stats) = live.stats_for(pick.element) else {
            continue;
        };
        score.total_points += i64::from(stats.total_points) * i64::from(pick.multiplier);
        score.counted += 1;
    }
    score.captain = team.captain().map(|c| CaptainReturn {
        player_id: c.element,
        points: live.stats_for(c.element).map(|s| s.total_points).unwrap_or(0),
    });
    score
}
