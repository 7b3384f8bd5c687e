//! Squad construction rules and simulated transactions.

use thiserror::Error;
use tracing::info;

use crate::projections::xp;
use crate::state::{Money, Pick, Player, PlayerPool, Position, UserTeam};

pub const SQUAD_SIZE: usize = 15;
pub const MAX_PER_CLUB: usize = 3;
pub const MAX_REPLACEMENTS: usize = 20;

pub fn position_limit(position: Position) -> usize {
    match position {
        Position::Keeper => 2,
        Position::Defender => 5,
        Position::Midfielder => 5,
        Position::Forward => 3,
    }
}

/// Why a squad change was refused. Returned to the caller, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("player {0} is already in the squad")]
    AlreadyInSquad(u32),
    #[error("squad is full (15 players max)")]
    SquadFull,
    #[error("only {limit} {position} allowed")]
    PositionFull { position: Position, limit: usize },
    #[error("insufficient budget: need {required}, have {available}")]
    InsufficientFunds { required: Money, available: Money },
    #[error("only 3 players allowed from club {club}")]
    ClubLimit { club: u32 },
    #[error("player {0} is not in the squad")]
    NotInSquad(u32),
    #[error("unknown player {0}")]
    UnknownPlayer(u32),
    #[error("cannot replace a {out} with a {incoming}")]
    PositionMismatch { out: Position, incoming: Position },
}

fn count_position(team: &UserTeam, pool: &PlayerPool, position: Position) -> usize {
    team.members(pool)
        .filter(|(_, p)| p.position == position)
        .count()
}

fn count_club(team: &UserTeam, pool: &PlayerPool, club: u32, excluding: Option<u32>) -> usize {
    team.members(pool)
        .filter(|(pick, p)| p.team == club && Some(pick.element) != excluding)
        .count()
}

/// Checks, in order: duplicate, squad size, position limit, budget, club limit.
pub fn can_add(team: &UserTeam, pool: &PlayerPool, player: &Player) -> Result<(), Rejection> {
    if team.contains(player.id) {
        return Err(Rejection::AlreadyInSquad(player.id));
    }
    if team.picks.len() >= SQUAD_SIZE {
        return Err(Rejection::SquadFull);
    }
    let limit = position_limit(player.position);
    if count_position(team, pool, player.position) >= limit {
        return Err(Rejection::PositionFull {
            position: player.position,
            limit,
        });
    }
    if team.bank < player.now_cost {
        return Err(Rejection::InsufficientFunds {
            required: player.now_cost,
            available: team.bank,
        });
    }
    if count_club(team, pool, player.team, None) >= MAX_PER_CLUB {
        return Err(Rejection::ClubLimit { club: player.team });
    }
    Ok(())
}

/// Appends the player at the next slot and debits the bank.
pub fn add_player(team: &UserTeam, pool: &PlayerPool, player_id: u32) -> Result<UserTeam, Rejection> {
    let player = pool
        .get(player_id)
        .ok_or(Rejection::UnknownPlayer(player_id))?;
    can_add(team, pool, player)?;

    let mut next = team.clone();
    let slot = next.picks.len() as u8 + 1;
    next.picks.push(Pick::new(player_id, slot));
    next.bank = next.bank - player.now_cost;
    Ok(next)
}

/// Swaps `out_id` for `in_id` in place. The slot and captaincy flags stay with
/// the slot; the bank moves by the price difference and may not go negative.
pub fn simulate_transfer(
    team: &UserTeam,
    pool: &PlayerPool,
    out_id: u32,
    in_id: u32,
) -> Result<UserTeam, Rejection> {
    let slot = team
        .picks
        .iter()
        .position(|p| p.element == out_id)
        .ok_or(Rejection::NotInSquad(out_id))?;
    if team.contains(in_id) {
        return Err(Rejection::AlreadyInSquad(in_id));
    }
    let out = pool.get(out_id).ok_or(Rejection::UnknownPlayer(out_id))?;
    let incoming = pool.get(in_id).ok_or(Rejection::UnknownPlayer(in_id))?;
    if out.position != incoming.position {
        return Err(Rejection::PositionMismatch {
            out: out.position,
            incoming: incoming.position,
        });
    }
    if count_club(team, pool, incoming.team, Some(out_id)) >= MAX_PER_CLUB {
        return Err(Rejection::ClubLimit {
            club: incoming.team,
        });
    }
    let bank = team.bank - (incoming.now_cost - out.now_cost);
    if bank.is_negative() {
        return Err(Rejection::InsufficientFunds {
            required: incoming.now_cost,
            available: team.bank + out.now_cost,
        });
    }

    let mut next = team.clone();
    next.picks[slot].element = in_id;
    next.bank = bank;
    next.transfers += 1;
    info!(out = out_id, incoming = in_id, bank = %bank, "transfer simulated");
    Ok(next)
}

/// Gives the captaincy (and the 2x multiplier) to `player_id`.
pub fn set_captain(team: &UserTeam, player_id: u32) -> Result<UserTeam, Rejection> {
    if !team.contains(player_id) {
        return Err(Rejection::NotInSquad(player_id));
    }
    let mut next = team.clone();
    for pick in &mut next.picks {
        let is_new = pick.element == player_id;
        pick.is_captain = is_new;
        pick.multiplier = if is_new { 2 } else { 1 };
        if is_new {
            pick.is_vice_captain = false;
        }
    }
    Ok(next)
}

fn affordable_same_position<'a>(
    team: &'a UserTeam,
    pool: &'a PlayerPool,
    out: &'a Player,
) -> impl Iterator<Item = &'a Player> {
    let max_price = out.now_cost + team.bank;
    pool.iter().filter(move |p| {
        p.position == out.position
            && p.id != out.id
            && p.now_cost <= max_price
            && !team.contains(p.id)
    })
}

/// Affordable same-position replacements for `out_id`, best total points first.
pub fn replacement_candidates<'a>(
    team: &'a UserTeam,
    pool: &'a PlayerPool,
    out_id: u32,
) -> Vec<&'a Player> {
    let Some(out) = pool.get(out_id) else {
        return Vec::new();
    };
    let mut candidates: Vec<&Player> = affordable_same_position(team, pool, out).collect();
    candidates.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    candidates.truncate(MAX_REPLACEMENTS);
    candidates
}

/// The affordable same-position replacement with the highest xP.
pub fn best_replacement<'a>(team: &'a UserTeam, pool: &'a PlayerPool, out_id: u32) -> Option<&'a Player> {
    let out = pool.get(out_id)?;
    affordable_same_position(team, pool, out).fold(None, |best: Option<&Player>, p| match best {
        Some(b) if xp(b) >= xp(p) => Some(b),
        _ => Some(p),
    })
}
