//! Rule-based squad advice. Every rule is evaluated on its own; one firing
//! never suppresses another, and insights come out in rule order.

use serde::Serialize;

use crate::projections::xp;
use crate::state::{Money, Player, PlayerPool, UserTeam};

pub const SELL_MAX_XP: f64 = 3.0;
pub const SELL_MIN_PRICE: Money = Money(70);
pub const GEM_MAX_OWNERSHIP: f64 = 15.0;
pub const GEM_MIN_FORM: f64 = 5.0;
pub const MIN_SQUAD_VALUE: Money = Money(950);
pub const HARD_FIXTURE: u8 = 4;
pub const MAX_HARD_FIXTURES: usize = 2;
pub const MAX_FALLING_PRICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightCategory {
    SellAlert,
    BuyGem,
    CaptainCorrection,
    ValueWarning,
    FixtureRisk,
    AvailabilityAlert,
    PriceRisk,
}

impl InsightCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightCategory::SellAlert => "sell-alert",
            InsightCategory::BuyGem => "buy-gem",
            InsightCategory::CaptainCorrection => "captain-correction",
            InsightCategory::ValueWarning => "value-warning",
            InsightCategory::FixtureRisk => "fixture-risk",
            InsightCategory::AvailabilityAlert => "availability-alert",
            InsightCategory::PriceRisk => "price-risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub category: InsightCategory,
    /// The player the advice is about, when there is one.
    pub player_id: Option<u32>,
    pub message: String,
}

struct Context<'a> {
    team: &'a UserTeam,
    pool: &'a PlayerPool,
}

impl<'a> Context<'a> {
    fn squad(&self) -> impl Iterator<Item = &'a Player> + 'a {
        self.team.members(self.pool).map(|(_, p)| p)
    }
}

type Rule = fn(&Context<'_>) -> Option<Insight>;

const RULES: [Rule; 7] = [
    sell_alert,
    buy_gem,
    captain_correction,
    value_warning,
    fixture_risk,
    availability_alert,
    price_risk,
];

/// Lazily evaluates the rules against the squad. A squad with no picks the
/// pool can resolve yields nothing.
pub fn insights<'a>(team: &'a UserTeam, pool: &'a PlayerPool) -> impl Iterator<Item = Insight> + 'a {
    let ctx = Context { team, pool };
    let rules: &'static [Rule] = if ctx.squad().next().is_none() { &[] } else { &RULES };
    rules.iter().filter_map(move |rule| rule(&ctx))
}

fn sell_alert(ctx: &Context<'_>) -> Option<Insight> {
    let mut worst: Option<(&Player, f64)> = None;
    for p in ctx.squad() {
        let v = xp(p);
        if v >= SELL_MAX_XP || p.now_cost <= SELL_MIN_PRICE {
            continue;
        }
        if worst.is_none_or(|(_, w)| v < w) {
            worst = Some((p, v));
        }
    }
    let (p, v) = worst?;
    Some(Insight {
        category: InsightCategory::SellAlert,
        player_id: Some(p.id),
        message: format!(
            "High-priority sell: {} projects {v:.1} xP against a {} price tag.",
            p.web_name, p.now_cost
        ),
    })
}

fn buy_gem(ctx: &Context<'_>) -> Option<Insight> {
    let mut best: Option<(&Player, f64, f64)> = None;
    for p in ctx.pool.iter() {
        if ctx.team.contains(p.id) {
            continue;
        }
        // Players without ownership data are never gems.
        let Some(ownership) = p.selected_by_percent.filter(|o| *o < GEM_MAX_OWNERSHIP) else {
            continue;
        };
        let Some(form) = p.form.filter(|f| *f > GEM_MIN_FORM) else {
            continue;
        };
        if best.is_none_or(|(_, _, b)| form > b) {
            best = Some((p, ownership, form));
        }
    }
    let (p, ownership, form) = best?;
    Some(Insight {
        category: InsightCategory::BuyGem,
        player_id: Some(p.id),
        message: format!(
            "Hidden gem: {} ({ownership:.1}% ownership) is in form {form:.1}.",
            p.web_name
        ),
    })
}

fn captain_correction(ctx: &Context<'_>) -> Option<Insight> {
    let mut best: Option<(u32, &Player, f64)> = None;
    for (pick, p) in ctx.team.members(ctx.pool) {
        let v = xp(p);
        if best.is_none_or(|(_, _, b)| v > b) {
            best = Some((pick.element, p, v));
        }
    }
    let (id, p, v) = best?;
    if ctx.team.captain().is_some_and(|c| c.element == id) {
        return None;
    }
    Some(Insight {
        category: InsightCategory::CaptainCorrection,
        player_id: Some(id),
        message: format!(
            "Captaincy correction: {} projects {v:.1} xP, the best in your squad.",
            p.web_name
        ),
    })
}

fn value_warning(ctx: &Context<'_>) -> Option<Insight> {
    let value = ctx.team.squad_value(ctx.pool);
    if value >= MIN_SQUAD_VALUE {
        return None;
    }
    Some(Insight {
        category: InsightCategory::ValueWarning,
        player_id: None,
        message: format!("Value warning: squad value {value} is below {MIN_SQUAD_VALUE}."),
    })
}

fn fixture_risk(ctx: &Context<'_>) -> Option<Insight> {
    let hard = ctx
        .squad()
        .filter(|p| p.difficulty.is_some_and(|d| d >= HARD_FIXTURE))
        .count();
    if hard <= MAX_HARD_FIXTURES {
        return None;
    }
    Some(Insight {
        category: InsightCategory::FixtureRisk,
        player_id: None,
        message: format!("Fixture friction: {hard} players face difficult matches."),
    })
}

fn availability_alert(ctx: &Context<'_>) -> Option<Insight> {
    let p = ctx.squad().find(|p| !p.is_fully_available())?;
    let news = if p.news.is_empty() {
        "no news"
    } else {
        p.news.as_str()
    };
    Some(Insight {
        category: InsightCategory::AvailabilityAlert,
        player_id: Some(p.id),
        message: format!("Medical report: {} is flagged ({news}).", p.web_name),
    })
}

fn price_risk(ctx: &Context<'_>) -> Option<Insight> {
    let falling = ctx.squad().filter(|p| p.cost_change_event < 0).count();
    if falling <= MAX_FALLING_PRICES {
        return None;
    }
    Some(Insight {
        category: InsightCategory::PriceRisk,
        player_id: None,
        message: format!("Budget bleed: {falling} players are losing value this gameweek."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Pick, Position};

    fn player(id: u32, price: i32, form: f64) -> Player {
        Player {
            id,
            web_name: format!("P{id}"),
            team: id,
            position: Position::Midfielder,
            now_cost: Money(price),
            total_points: 0,
            form: Some(form),
            selected_by_percent: Some(30.0),
            chance_of_playing_next_round: None,
            cost_change_event: 0,
            minutes: 0,
            news: String::new(),
            difficulty: Some(3),
            derived: Default::default(),
        }
    }

    fn team_of(ids: &[u32], captain: Option<u32>) -> UserTeam {
        UserTeam {
            picks: ids
                .iter()
                .enumerate()
                .map(|(i, &id)| Pick {
                    is_captain: Some(id) == captain,
                    multiplier: if Some(id) == captain { 2 } else { 1 },
                    ..Pick::new(id, i as u8 + 1)
                })
                .collect(),
            ..Default::default()
        }
    }

    fn categories(team: &UserTeam, pool: &PlayerPool) -> Vec<InsightCategory> {
        insights(team, pool).map(|i| i.category).collect()
    }

    #[test]
    fn empty_squad_has_no_advice() {
        let pool = PlayerPool::from_players(vec![player(1, 50, 9.0)]);
        assert!(categories(&UserTeam::default(), &pool).is_empty());
    }

    #[test]
    fn unresolved_picks_have_no_advice() {
        let pool = PlayerPool::from_players(vec![player(1, 50, 9.0)]);
        let team = team_of(&[40, 41, 42], Some(40));
        assert!(categories(&team, &pool).is_empty());
    }

    #[test]
    fn sell_alert_names_lowest_xp_expensive_player() {
        let mut pool_players: Vec<Player> = (1..=15).map(|id| player(id, 70, 6.0)).collect();
        pool_players[0] = player(1, 120, 2.5);
        pool_players[1] = player(2, 95, 1.0);
        pool_players[2] = player(3, 70, 0.5);
        let pool = PlayerPool::from_players(pool_players);
        let team = team_of(&(1..=15).collect::<Vec<_>>(), Some(4));
        let sell: Vec<Insight> = insights(&team, &pool)
            .filter(|i| i.category == InsightCategory::SellAlert)
            .collect();
        assert_eq!(sell.len(), 1);
        assert_eq!(sell[0].player_id, Some(2));
    }

    #[test]
    fn gem_is_top_form_outsider() {
        let mut outsider = player(20, 45, 7.5);
        outsider.selected_by_percent = Some(3.2);
        let mut popular = player(21, 45, 9.0);
        popular.selected_by_percent = Some(40.0);
        let mut second = player(22, 45, 6.0);
        second.selected_by_percent = Some(1.0);
        let pool = PlayerPool::from_players(vec![player(1, 100, 6.0), outsider, popular, second]);
        let team = team_of(&[1], Some(1));
        let gem = insights(&team, &pool)
            .find(|i| i.category == InsightCategory::BuyGem)
            .unwrap();
        assert_eq!(gem.player_id, Some(20));
    }

    #[test]
    fn unknown_ownership_is_not_a_gem() {
        let mut unknown = player(20, 45, 9.5);
        unknown.selected_by_percent = None;
        let pool = PlayerPool::from_players(vec![player(1, 100, 6.0), unknown]);
        let team = team_of(&[1], Some(1));
        assert!(!categories(&team, &pool).contains(&InsightCategory::BuyGem));
    }

    #[test]
    fn rules_fire_independently_in_order() {
        let mut players: Vec<Player> = (1..=5).map(|id| player(id, 50, 4.0)).collect();
        for p in players.iter_mut().take(3) {
            p.difficulty = Some(5);
        }
        for p in players.iter_mut().skip(1) {
            p.cost_change_event = -1;
        }
        players[4].chance_of_playing_next_round = Some(25);
        players[4].news = "Knee injury".to_string();
        players[3].form = Some(8.0);
        let pool = PlayerPool::from_players(players);
        let team = team_of(&[1, 2, 3, 4, 5], Some(1));
        assert_eq!(
            categories(&team, &pool),
            vec![
                InsightCategory::CaptainCorrection,
                InsightCategory::ValueWarning,
                InsightCategory::FixtureRisk,
                InsightCategory::AvailabilityAlert,
                InsightCategory::PriceRisk,
            ]
        );
        let medical = insights(&team, &pool)
            .find(|i| i.category == InsightCategory::AvailabilityAlert)
            .unwrap();
        assert!(medical.message.contains("Knee injury"));
    }

    #[test]
    fn captain_already_best_is_quiet() {
        let pool = PlayerPool::from_players(vec![player(1, 500, 9.0), player(2, 500, 4.0)]);
        let team = team_of(&[1, 2], Some(1));
        assert!(categories(&team, &pool).is_empty());
    }
}
