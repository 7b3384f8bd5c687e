//! Player search over the pool: filter by position, club, name and the
//! hidden-gem flag, then sort by one column.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::advisor::GEM_MAX_OWNERSHIP;
use crate::projections::xp;
use crate::state::{Player, PlayerPool, Position};

pub const GEM_MIN_EFFICIENCY: f64 = 0.5;
pub const PAGE_SIZE: usize = 50;
pub const TOP_EFFICIENCY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Name,
    Price,
    #[default]
    Points,
    Ownership,
    Form,
    Xp,
    Consistency,
    ValueForMoney,
    PointsPerMinute,
}

impl SortKey {
    /// Numeric sort value; missing data sorts as zero.
    fn value(self, p: &Player) -> f64 {
        match self {
            SortKey::Name => 0.0,
            SortKey::Price => p.now_cost.units(),
            SortKey::Points => f64::from(p.total_points),
            SortKey::Ownership => p.ownership(),
            SortKey::Form => p.form.unwrap_or(0.0),
            SortKey::Xp => xp(p),
            SortKey::Consistency => p.derived.consistency,
            SortKey::ValueForMoney => p.derived.value_for_money,
            SortKey::PointsPerMinute => p.derived.points_per_minute,
        }
    }

    fn compare(self, a: &Player, b: &Player) -> Ordering {
        match self {
            SortKey::Name => a.web_name.to_lowercase().cmp(&b.web_name.to_lowercase()),
            key => key.value(a).total_cmp(&key.value(b)),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw.to_ascii_lowercase().as_str() {
            "name" => SortKey::Name,
            "price" => SortKey::Price,
            "points" => SortKey::Points,
            "ownership" | "selected" => SortKey::Ownership,
            "form" => SortKey::Form,
            "xp" => SortKey::Xp,
            "consistency" | "reliability" => SortKey::Consistency,
            "value" | "vfm" => SortKey::ValueForMoney,
            "ppm" => SortKey::PointsPerMinute,
            other => return Err(format!("unknown sort key {other:?}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerQuery {
    /// Case-insensitive substring of the player's name; empty matches all.
    pub search: String,
    pub position: Option<Position>,
    pub club: Option<u32>,
    pub gems_only: bool,
    pub sort: SortKey,
    pub dir: SortDir,
    pub limit: usize,
}

impl Default for PlayerQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            position: None,
            club: None,
            gems_only: false,
            sort: SortKey::default(),
            dir: SortDir::default(),
            limit: PAGE_SIZE,
        }
    }
}

impl PlayerQuery {
    pub fn matches(&self, p: &Player) -> bool {
        let search = self.search.trim().to_lowercase();
        (search.is_empty() || p.web_name.to_lowercase().contains(&search))
            && self.position.is_none_or(|pos| p.position == pos)
            && self.club.is_none_or(|club| p.team == club)
            && (!self.gems_only || is_gem(p))
    }

    /// Matching players in sort order, at most `limit` of them. Ties keep
    /// pool order.
    pub fn run<'a>(&self, pool: &'a PlayerPool) -> Vec<&'a Player> {
        let mut hits: Vec<&Player> = pool.iter().filter(|p| self.matches(p)).collect();
        hits.sort_by(|a, b| {
            let ord = self.sort.compare(a, b);
            match self.dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });
        hits.truncate(self.limit);
        hits
    }
}

/// Low ownership with a good return per million. Unknown ownership never qualifies.
pub fn is_gem(p: &Player) -> bool {
    p.selected_by_percent.is_some_and(|o| o < GEM_MAX_OWNERSHIP)
        && p.derived.efficiency > GEM_MIN_EFFICIENCY
}

/// The `n` players with the highest xEfficiency (form per £1m).
pub fn top_by_efficiency(pool: &PlayerPool, n: usize) -> Vec<&Player> {
    let mut ranked: Vec<&Player> = pool.iter().collect();
    ranked.sort_by(|a, b| b.derived.efficiency.total_cmp(&a.derived.efficiency));
    ranked.truncate(n);
    ranked
}
