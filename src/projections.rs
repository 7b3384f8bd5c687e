//! Expected-points (xP) projections.
//!
//! A single-week figure blends form with availability and the next fixture's
//! difficulty. The fixture term is zero at [`NEUTRAL_DIFFICULTY`] and moves
//! half a point per step either side. The multi-week series decays the form
//! term by [`WEEKLY_DECAY`] per week offset.

use rand::Rng;

use crate::state::{Player, PlayerPool, UserTeam};

pub const DEFAULT_FORM: f64 = 2.0;
pub const NEUTRAL_DIFFICULTY: u8 = 3;
pub const WEEKLY_DECAY: f64 = 0.95;
pub const DEFAULT_HORIZON: u32 = 5;
/// Upper bound (exclusive) of the display jitter added by [`RandomJitter`].
pub const JITTER_BOUND: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub player_id: u32,
    pub week_offset: u32,
    pub xp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekTotal {
    pub week_offset: u32,
    pub total_xp: f64,
}

/// Source of the small per-week noise added to multi-week projections.
pub trait JitterSource {
    fn next_jitter(&mut self) -> f64;
}

/// Deterministic source; projections become reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn next_jitter(&mut self) -> f64 {
        0.0
    }
}

pub struct RandomJitter<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn next_jitter(&mut self) -> f64 {
        self.rng.gen_range(0.0..JITTER_BOUND)
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn availability(player: &Player) -> f64 {
    f64::from(player.chance_of_playing_next_round.unwrap_or(100).min(100)) / 100.0
}

fn base_term(player: &Player) -> f64 {
    player.form.unwrap_or(DEFAULT_FORM) * availability(player)
}

fn difficulty_modifier(player: &Player) -> f64 {
    let difficulty = player
        .difficulty
        .filter(|d| (1..=5).contains(d))
        .unwrap_or(NEUTRAL_DIFFICULTY);
    (f64::from(NEUTRAL_DIFFICULTY) - f64::from(difficulty)) / 2.0
}

/// Single-week expected points, rounded to one decimal.
pub fn xp(player: &Player) -> f64 {
    round1(base_term(player) + difficulty_modifier(player))
}

/// Expected points for week offsets `1..=horizon`.
pub fn project(player: &Player, horizon: u32, jitter: &mut dyn JitterSource) -> Vec<Projection> {
    let base = base_term(player);
    let modifier = difficulty_modifier(player);
    (1..=horizon)
        .map(|week_offset| {
            let decay = WEEKLY_DECAY.powi(week_offset as i32);
            Projection {
                player_id: player.id,
                week_offset,
                xp: round1(base * decay + modifier + jitter.next_jitter()),
            }
        })
        .collect()
}

/// Per-week squad totals. Player series are fixed at construction, so
/// [`SquadProjection::iter`] yields the same sequence every time it is called.
#[derive(Debug, Clone, Default)]
pub struct SquadProjection {
    horizon: u32,
    series: Vec<Vec<Projection>>,
}

impl SquadProjection {
    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WeekTotal> + '_ {
        let weeks = if self.series.is_empty() { 0 } else { self.horizon };
        (1..=weeks).map(move |week_offset| {
            let idx = (week_offset - 1) as usize;
            let total: f64 = self
                .series
                .iter()
                .filter_map(|s| s.get(idx))
                .map(|p| p.xp)
                .sum();
            WeekTotal {
                week_offset,
                total_xp: round1(total),
            }
        })
    }
}

pub fn squad_projection(
    team: &UserTeam,
    pool: &PlayerPool,
    horizon: u32,
    jitter: &mut dyn JitterSource,
) -> SquadProjection {
    let series = team
        .members(pool)
        .map(|(_, player)| project(player, horizon, jitter))
        .collect();
    SquadProjection { horizon, series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Money, Pick, Position};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player(id: u32, form: Option<f64>, chance: Option<u8>, difficulty: Option<u8>) -> Player {
        Player {
            id,
            web_name: format!("P{id}"),
            team: 1,
            position: Position::Midfielder,
            now_cost: Money(60),
            total_points: 50,
            form,
            selected_by_percent: Some(10.0),
            chance_of_playing_next_round: chance,
            cost_change_event: 0,
            minutes: 900,
            news: String::new(),
            difficulty,
            derived: Default::default(),
        }
    }

    #[test]
    fn neutral_fixture_and_full_availability_equals_form() {
        for form in [0.0, 1.3, 4.0, 6.7, 11.2] {
            let p = player(1, Some(form), None, Some(3));
            assert_eq!(xp(&p), round1(form));
            let p = player(1, Some(form), Some(100), None);
            assert_eq!(xp(&p), round1(form));
        }
    }

    #[test]
    fn out_of_range_difficulty_is_neutral() {
        for difficulty in [0, 6, 200] {
            let p = player(1, Some(5.0), None, Some(difficulty));
            assert_eq!(xp(&p), 5.0);
        }
    }

    #[test]
    fn missing_form_and_difficulty_use_defaults() {
        let p = player(1, None, None, None);
        assert_eq!(xp(&p), 2.0);
    }

    #[test]
    fn availability_and_difficulty_shape_xp() {
        // 6.0 * 0.5 + (3 - 1) / 2
        assert_eq!(xp(&player(1, Some(6.0), Some(50), Some(1))), 4.0);
        assert_eq!(xp(&player(1, Some(6.0), None, Some(4))), 5.5);
        assert_eq!(xp(&player(1, Some(6.0), None, Some(5))), 5.0);
        assert_eq!(xp(&player(1, Some(6.0), Some(0), Some(3))), 0.0);
    }

    #[test]
    fn xp_is_monotone_in_form_and_difficulty() {
        let mut prev = f64::MIN;
        for tenths in 0..120 {
            let v = xp(&player(1, Some(tenths as f64 / 10.0), Some(75), Some(2)));
            assert!(v >= prev);
            prev = v;
        }
        let mut prev = f64::MAX;
        for d in 1..=5 {
            let v = xp(&player(1, Some(5.0), None, Some(d)));
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn projection_decays_without_jitter() {
        let p = player(1, Some(10.0), None, Some(3));
        let series = project(&p, 3, &mut NoJitter);
        let xps: Vec<f64> = series.iter().map(|s| s.xp).collect();
        assert_eq!(xps, vec![9.5, 9.0, 8.6]);
        assert_eq!(series[2].week_offset, 3);
    }

    #[test]
    fn random_jitter_stays_bounded() {
        let p = player(1, Some(4.0), None, Some(3));
        let plain = project(&p, 5, &mut NoJitter);
        let mut jitter = RandomJitter::new(StdRng::seed_from_u64(7));
        let noisy = project(&p, 5, &mut jitter);
        for (a, b) in plain.iter().zip(&noisy) {
            assert!(b.xp >= a.xp - 0.1 && b.xp <= a.xp + JITTER_BOUND + 0.1);
        }
    }

    #[test]
    fn squad_series_is_restartable() {
        let pool = PlayerPool::from_players(vec![
            player(1, Some(10.0), None, Some(3)),
            player(2, Some(4.0), None, Some(1)),
        ]);
        let team = UserTeam {
            picks: vec![Pick::new(1, 1), Pick::new(2, 2), Pick::new(99, 3)],
            ..Default::default()
        };
        let proj = squad_projection(&team, &pool, 2, &mut NoJitter);
        let first: Vec<WeekTotal> = proj.iter().collect();
        let second: Vec<WeekTotal> = proj.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        // 9.5 + (3.8 + 1.0), 9.0 + (3.6 + 1.0)
        assert_eq!(first[0].total_xp, 14.3);
        assert_eq!(first[1].total_xp, 13.6);
    }

    #[test]
    fn empty_squad_projects_nothing() {
        let proj = squad_projection(&UserTeam::default(), &PlayerPool::default(), 5, &mut NoJitter);
        assert_eq!(proj.iter().count(), 0);
    }
}
