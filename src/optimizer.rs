use thiserror::Error;

use crate::projections::{round1, xp};
use crate::state::{PlayerPool, Position, UserTeam};

pub const STARTERS: usize = 11;

/// (minimum, maximum) starters per position.
pub fn formation_bounds(position: Position) -> (usize, usize) {
    match position {
        Position::Keeper => (1, 1),
        Position::Defender => (3, 5),
        Position::Midfielder => (2, 5),
        Position::Forward => (1, 3),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineupError {
    #[error("need at least {need} {position}, squad has {have}")]
    PositionShort {
        position: Position,
        need: usize,
        have: usize,
    },
    #[error("need 11 starters, squad can field {have}")]
    TooFewPlayers { have: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lineup {
    /// Starter ids in the order they were chosen.
    pub starters: Vec<u32>,
    pub bench: Vec<u32>,
    /// Starters per position, indexed by [`Position::index`].
    pub counts: [usize; 4],
    pub total_xp: f64,
}

impl Lineup {
    /// Outfield shape, e.g. "3-4-3".
    pub fn formation(&self) -> String {
        format!("{}-{}-{}", self.counts[1], self.counts[2], self.counts[3])
    }
}

#[derive(Debug, Clone, Copy)]
struct Scored {
    id: u32,
    position: Position,
    xp: f64,
}

/// Picks the starting eleven by xP: positional minimums first, then the best
/// remaining players while positional maxima allow. Ties keep squad order.
///
/// Because each position's maximum only caps how many of that position's
/// best players are taken, filling greedily after the minimums yields the
/// highest-xP valid eleven for these bounds.
pub fn best_eleven(team: &UserTeam, pool: &PlayerPool) -> Result<Lineup, LineupError> {
    let mut ranked: Vec<Scored> = team
        .members(pool)
        .map(|(pick, p)| Scored {
            id: pick.element,
            position: p.position,
            xp: xp(p),
        })
        .collect();
    if ranked.len() < STARTERS {
        return Err(LineupError::TooFewPlayers { have: ranked.len() });
    }
    // Stable: equal xP keeps first-seen order.
    ranked.sort_by(|a, b| b.xp.total_cmp(&a.xp));

    let mut taken = vec![false; ranked.len()];
    let mut counts = [0usize; 4];
    let mut starters = Vec::with_capacity(STARTERS);

    for position in Position::ALL {
        let (min, _) = formation_bounds(position);
        let candidates: Vec<usize> = ranked
            .iter()
            .enumerate()
            .filter(|(_, s)| s.position == position)
            .map(|(idx, _)| idx)
            .take(min)
            .collect();
        if candidates.len() < min {
            return Err(LineupError::PositionShort {
                position,
                need: min,
                have: candidates.len(),
            });
        }
        for idx in candidates {
            taken[idx] = true;
            counts[position.index()] += 1;
            starters.push(ranked[idx].id);
        }
    }

    for (idx, s) in ranked.iter().enumerate() {
        if starters.len() >= STARTERS {
            break;
        }
        let (_, max) = formation_bounds(s.position);
        if taken[idx] || counts[s.position.index()] >= max {
            continue;
        }
        taken[idx] = true;
        counts[s.position.index()] += 1;
        starters.push(s.id);
    }
    if starters.len() < STARTERS {
        return Err(LineupError::TooFewPlayers {
            have: starters.len(),
        });
    }

    let total_xp = round1(
        ranked
            .iter()
            .zip(&taken)
            .filter(|(_, t)| **t)
            .map(|(s, _)| s.xp)
            .sum(),
    );
    let bench = ranked
        .iter()
        .zip(&taken)
        .filter(|(_, t)| !**t)
        .map(|(s, _)| s.id)
        .collect();

    Ok(Lineup {
        starters,
        bench,
        counts,
        total_xp,
    })
}
