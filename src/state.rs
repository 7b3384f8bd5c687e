use std::collections::HashMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use serde::{Deserialize, Deserializer, Serialize};

use crate::notifications::{Notification, NotificationLog};
use crate::watchlist::Watchlist;

/// Form is compared against this when computing consistency.
pub const PEAK_FORM: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Position {
    Keeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Keeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    pub fn short(self) -> &'static str {
        match self {
            Position::Keeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Position::Keeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(element_type: u8) -> Result<Self, Self::Error> {
        match element_type {
            1 => Ok(Position::Keeper),
            2 => Ok(Position::Defender),
            3 => Ok(Position::Midfielder),
            4 => Ok(Position::Forward),
            other => Err(format!("unknown element_type {other}")),
        }
    }
}

impl From<Position> for u8 {
    fn from(pos: Position) -> Self {
        pos.index() as u8 + 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Amount in tenths of a currency unit, the upstream price granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub i32);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_tenths(tenths: i32) -> Self {
        Money(tenths)
    }

    pub fn tenths(self) -> i32 {
        self.0
    }

    pub fn units(self) -> f64 {
        self.0 as f64 / 10.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "£{:.1}m", self.units())
    }
}

/// Metrics recomputed from the base fields every time a player list is ingested.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedStats {
    pub points_per_minute: f64,
    pub value_for_money: f64,
    pub consistency: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    pub id: u32,
    pub web_name: String,
    /// Club id.
    pub team: u32,
    #[serde(rename = "element_type")]
    pub position: Position,
    pub now_cost: Money,
    #[serde(default)]
    pub total_points: i32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub form: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub selected_by_percent: Option<f64>,
    /// `None` means fully available.
    #[serde(default)]
    pub chance_of_playing_next_round: Option<u8>,
    #[serde(default)]
    pub cost_change_event: i32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub news: String,
    /// Difficulty of the next fixture, 1 (easy) to 5 (hard).
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(skip)]
    pub derived: DerivedStats,
}

impl Player {
    pub fn is_fully_available(&self) -> bool {
        self.chance_of_playing_next_round.is_none_or(|c| c >= 100)
    }

    pub fn ownership(&self) -> f64 {
        self.selected_by_percent.unwrap_or(0.0)
    }

    fn compute_derived(&self) -> DerivedStats {
        let form = self.form.unwrap_or(0.0);
        let price = self.now_cost.units();
        let per_unit = |v: f64| if price > 0.0 { v / price } else { 0.0 };
        DerivedStats {
            points_per_minute: if self.minutes > 0 {
                self.total_points as f64 / self.minutes as f64
            } else {
                0.0
            },
            value_for_money: per_unit(self.total_points as f64),
            consistency: form / PEAK_FORM,
            efficiency: per_unit(form),
        }
    }
}

/// Upstream sends decimals as strings ("5.0"); accept numbers too.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(v)) => Some(v),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: Vec<Player>,
    index: HashMap<u32, usize>,
}

impl PlayerPool {
    pub fn from_players(players: Vec<Player>) -> Self {
        let mut pool = Self {
            players,
            index: HashMap::new(),
        };
        pool.reindex();
        pool
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (idx, player) in self.players.iter_mut().enumerate() {
            player.derived = player.compute_derived();
            self.index.insert(player.id, idx);
        }
    }

    pub fn get(&self, id: u32) -> Option<&Player> {
        self.index.get(&id).map(|&idx| &self.players[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Sets each player's difficulty from a club id -> difficulty map;
    /// clubs missing from the map fall back to neutral.
    pub fn apply_difficulty(&mut self, by_club: &HashMap<u32, u8>) {
        for player in &mut self.players {
            player.difficulty = by_club.get(&player.team).copied();
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Club {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gameweek {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_next: bool,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    /// Player id.
    pub element: u32,
    /// 1-based slot; 1..=11 start, 12..=15 bench.
    pub position: u8,
    #[serde(default = "default_multiplier")]
    pub multiplier: u8,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

fn default_multiplier() -> u8 {
    1
}

impl Pick {
    pub fn new(element: u32, slot: u8) -> Self {
        Self {
            element,
            position: slot,
            multiplier: 1,
            is_captain: false,
            is_vice_captain: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTeam {
    pub picks: Vec<Pick>,
    pub bank: Money,
    #[serde(default)]
    pub transfers: u32,
    #[serde(default)]
    pub entry_id: Option<u32>,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub manager_name: String,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub overall_rank: u64,
    #[serde(default)]
    pub event_points: i64,
    #[serde(default)]
    pub event_rank: u64,
}

impl Default for UserTeam {
    fn default() -> Self {
        Self {
            picks: Vec::new(),
            bank: Money(1000),
            transfers: 0,
            entry_id: None,
            team_name: "My Team".to_string(),
            manager_name: String::new(),
            total_points: 0,
            overall_rank: 0,
            event_points: 0,
            event_rank: 0,
        }
    }
}

impl UserTeam {
    pub fn contains(&self, player_id: u32) -> bool {
        self.picks.iter().any(|p| p.element == player_id)
    }

    pub fn captain(&self) -> Option<&Pick> {
        self.picks.iter().find(|p| p.is_captain)
    }

    /// Resolves picks against the pool, skipping ids the pool does not know.
    pub fn members<'a>(&'a self, pool: &'a PlayerPool) -> impl Iterator<Item = (&'a Pick, &'a Player)> {
        self.picks
            .iter()
            .filter_map(move |pick| pool.get(pick.element).map(|p| (pick, p)))
    }

    pub fn squad_value(&self, pool: &PlayerPool) -> Money {
        self.members(pool).map(|(_, p)| p.now_cost).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub pool: PlayerPool,
    pub clubs: Vec<Club>,
    pub events: Vec<Gameweek>,
    pub user_team: UserTeam,
    pub watchlist: Watchlist,
    pub notifications: NotificationLog,
    pub loading: bool,
    pub error: Option<String>,
    pub is_logged_in: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active gameweek, falling back to the first listed.
    pub fn current_gameweek(&self) -> Option<&Gameweek> {
        self.events
            .iter()
            .find(|e| e.is_current)
            .or_else(|| self.events.first())
    }

    pub fn club_name(&self, club_id: u32) -> &str {
        self.clubs
            .iter()
            .find(|c| c.id == club_id)
            .map(|c| c.name.as_str())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    Bootstrap {
        players: Vec<Player>,
        clubs: Vec<Club>,
        events: Vec<Gameweek>,
    },
    Difficulty(HashMap<u32, u8>),
    SetUserTeam(UserTeam),
    SetLoading(bool),
    SetError(Option<String>),
    SetLoggedIn(bool),
    Watch(u32),
    Unwatch(u32),
    Notify(Notification),
    ReadNotifications,
    ClearNotifications,
}

/// What a delta touched; broadcast to subscribers after it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    PlayersRefreshed,
    UserTeamChanged,
    StatusChanged,
    WatchlistChanged,
    NotificationsChanged,
}

impl StateEvent {
    pub fn is_persisted(self) -> bool {
        matches!(
            self,
            StateEvent::UserTeamChanged
                | StateEvent::WatchlistChanged
                | StateEvent::NotificationsChanged
        )
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) -> StateEvent {
    match delta {
        Delta::Bootstrap {
            players,
            clubs,
            events,
        } => {
            // Keep fixture difficulty across a player refresh.
            let difficulty: HashMap<u32, u8> = state
                .pool
                .iter()
                .filter_map(|p| p.difficulty.map(|d| (p.team, d)))
                .collect();
            state.pool = PlayerPool::from_players(players);
            if !difficulty.is_empty() {
                state.pool.apply_difficulty(&difficulty);
            }
            state.clubs = clubs;
            state.events = events;
            StateEvent::PlayersRefreshed
        }
        Delta::Difficulty(by_club) => {
            state.pool.apply_difficulty(&by_club);
            StateEvent::PlayersRefreshed
        }
        Delta::SetUserTeam(team) => {
            state.user_team = team;
            StateEvent::UserTeamChanged
        }
        Delta::SetLoading(loading) => {
            state.loading = loading;
            StateEvent::StatusChanged
        }
        Delta::SetError(error) => {
            state.error = error;
            state.loading = false;
            StateEvent::StatusChanged
        }
        Delta::SetLoggedIn(logged_in) => {
            state.is_logged_in = logged_in;
            StateEvent::StatusChanged
        }
        Delta::Watch(id) => {
            state.watchlist.add(id);
            StateEvent::WatchlistChanged
        }
        Delta::Unwatch(id) => {
            state.watchlist.remove(id);
            StateEvent::WatchlistChanged
        }
        Delta::Notify(notification) => {
            state.notifications.push(notification);
            StateEvent::NotificationsChanged
        }
        Delta::ReadNotifications => {
            state.notifications.mark_all_read();
            StateEvent::NotificationsChanged
        }
        Delta::ClearNotifications => {
            state.notifications.clear();
            StateEvent::NotificationsChanged
        }
    }
}
