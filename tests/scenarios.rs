use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use xgaffer::advisor::{InsightCategory, insights};
use xgaffer::optimizer::{STARTERS, best_eleven, formation_bounds};
use xgaffer::projections::{round1, xp};
use xgaffer::squad::{Rejection, add_player, can_add, simulate_transfer};
use xgaffer::state::{Money, Pick, Player, PlayerPool, Position, UserTeam};

const SHAPE: [(Position, usize); 4] = [
    (Position::Keeper, 2),
    (Position::Defender, 5),
    (Position::Midfielder, 5),
    (Position::Forward, 3),
];

fn player(id: u32, club: u32, position: Position, price: i32, form: f64) -> Player {
    Player {
        id,
        web_name: format!("Player {id}"),
        team: club,
        position,
        now_cost: Money(price),
        total_points: 0,
        form: Some(form),
        selected_by_percent: Some(20.0),
        chance_of_playing_next_round: None,
        cost_change_event: 0,
        minutes: 900,
        news: String::new(),
        difficulty: Some(3),
        derived: Default::default(),
    }
}

/// A legal 15-man squad (ids 1..=15, one club per two players) with the
/// given per-player price and form.
fn full_squad(price: i32, form: impl Fn(u32) -> f64) -> Vec<Player> {
    let mut id: u32 = 0;
    let mut players = Vec::new();
    for (position, count) in SHAPE {
        for _ in 0..count {
            id += 1;
            players.push(player(id, id.div_ceil(2), position, price, form(id)));
        }
    }
    players
}

fn team_of(players: &[Player], bank: i32) -> UserTeam {
    UserTeam {
        picks: players
            .iter()
            .enumerate()
            .map(|(i, p)| Pick::new(p.id, i as u8 + 1))
            .collect(),
        bank: Money(bank),
        ..Default::default()
    }
}

fn has(team: &UserTeam, pool: &PlayerPool, category: InsightCategory) -> bool {
    insights(team, pool).any(|i| i.category == category)
}

#[test]
fn like_for_like_swap_keeps_bank_and_raises_xp() {
    let mut squad = full_squad(50, |_| 5.0);
    let a = squad[2].clone();
    assert_eq!(a.position, Position::Defender);
    let b = player(100, 40, Position::Defender, 50, 7.0);
    squad.push(b.clone());
    let pool = PlayerPool::from_players(squad.clone());
    let team = team_of(&squad[..15], 0);

    let next = simulate_transfer(&team, &pool, a.id, b.id).expect("swap should be allowed");
    assert_eq!(next.bank, Money(0));
    assert_eq!(next.transfers, 1);
    assert_eq!(next.picks[2].element, b.id);
    assert_eq!(next.picks[2].position, 3);
    assert_eq!(xp(pool.get(b.id).unwrap()), 7.0);
    assert_eq!(xp(&a), 5.0);
    assert!(!has(&next, &pool, InsightCategory::SellAlert));
}

#[test]
fn squad_value_threshold_drives_value_warning() {
    let cheap = full_squad(60, |_| 5.0);
    let pool = PlayerPool::from_players(cheap.clone());
    let team = team_of(&cheap, 0);
    assert_eq!(team.squad_value(&pool), Money(900));
    assert!(has(&team, &pool, InsightCategory::ValueWarning));

    let pricier = full_squad(64, |_| 5.0);
    let pool = PlayerPool::from_players(pricier.clone());
    let team = team_of(&pricier, 0);
    assert_eq!(team.squad_value(&pool), Money(960));
    assert!(!has(&team, &pool, InsightCategory::ValueWarning));
}

#[test]
fn sixteenth_player_is_rejected() {
    let mut squad = full_squad(40, |_| 4.0);
    squad.push(player(16, 30, Position::Midfielder, 40, 4.0));
    let pool = PlayerPool::from_players(squad.clone());
    let team = team_of(&squad[..15], 1000);
    assert_eq!(team.picks.len(), 15);

    assert_eq!(can_add(&team, &pool, &squad[15]), Err(Rejection::SquadFull));
    assert_eq!(add_player(&team, &pool, 16), Err(Rejection::SquadFull));
}

#[test]
fn building_a_squad_from_empty_respects_every_limit() {
    let squad = full_squad(55, |_| 4.0);
    let pool = PlayerPool::from_players(squad.clone());
    let mut team = UserTeam::default();
    for p in &squad {
        team = add_player(&team, &pool, p.id).expect("legal squad should build");
    }
    assert_eq!(team.picks.len(), 15);
    assert_eq!(team.bank, Money(1000 - 15 * 55));
    let slots: Vec<u8> = team.picks.iter().map(|p| p.position).collect();
    assert_eq!(slots, (1..=15).collect::<Vec<u8>>());
}

#[test]
fn transfers_conserve_bank_plus_squad_value() {
    let mut players = full_squad(50, |id| f64::from(id % 7));
    let replacements = [
        player(101, 41, Position::Defender, 45, 6.0),
        player(102, 42, Position::Midfielder, 62, 6.0),
        player(103, 43, Position::Forward, 71, 6.0),
        player(104, 44, Position::Keeper, 40, 6.0),
    ];
    players.extend(replacements.iter().cloned());
    let pool = PlayerPool::from_players(players.clone());
    let mut team = team_of(&players[..15], 30);
    let total = |t: &UserTeam| t.bank + t.squad_value(&pool);
    let before = total(&team);

    for (out, incoming) in [(4, 101), (9, 102), (14, 103), (1, 104), (101, 5)] {
        let out_price = pool.get(out).unwrap().now_cost;
        let in_price = pool.get(incoming).unwrap().now_cost;
        match simulate_transfer(&team, &pool, out, incoming) {
            Ok(next) => {
                assert_eq!(next.bank, team.bank - (in_price - out_price));
                assert_eq!(total(&next), before);
                team = next;
            }
            Err(Rejection::InsufficientFunds { .. }) => {
                assert!((team.bank - (in_price - out_price)).is_negative());
            }
            Err(Rejection::AlreadyInSquad(id)) => assert_eq!(id, incoming),
            Err(other) => panic!("unexpected rejection {other:?}"),
        }
    }
    assert!(!team.bank.is_negative());
    assert_eq!(team.picks.len(), 15);
}

#[test]
fn transfer_that_would_overdraw_is_refused() {
    let mut players = full_squad(50, |_| 4.0);
    players.push(player(200, 50, Position::Forward, 120, 9.0));
    let pool = PlayerPool::from_players(players.clone());
    let team = team_of(&players[..15], 10);
    let err = simulate_transfer(&team, &pool, 15, 200).unwrap_err();
    assert_eq!(
        err,
        Rejection::InsufficientFunds {
            required: Money(120),
            available: Money(60)
        }
    );
}

#[test]
fn xp_is_monotone_in_form_and_difficulty() {
    let mut p = player(1, 1, Position::Midfielder, 50, 0.0);
    for chance in [None, Some(75), Some(25)] {
        p.chance_of_playing_next_round = chance;
        for difficulty in 1..=5u8 {
            p.difficulty = Some(difficulty);
            let mut last = f64::MIN;
            for tenths in 0..=120u32 {
                p.form = Some(f64::from(tenths) / 10.0);
                let v = xp(&p);
                assert!(v >= last, "form {tenths} d{difficulty}: {v} < {last}");
                last = v;
            }
        }
        p.form = Some(5.5);
        let by_difficulty: Vec<f64> = (1..=5u8)
            .map(|d| {
                p.difficulty = Some(d);
                xp(&p)
            })
            .collect();
        assert!(by_difficulty.windows(2).all(|w| w[0] >= w[1]));
    }
}

fn brute_force_best(ranked: &[(Position, f64)]) -> f64 {
    let n = ranked.len();
    let mut best = f64::MIN;
    for mask in 0u32..(1 << n) {
        if mask.count_ones() as usize != STARTERS {
            continue;
        }
        let mut counts = [0usize; 4];
        let mut total = 0.0;
        for (i, (pos, v)) in ranked.iter().enumerate() {
            if mask & (1 << i) != 0 {
                counts[pos.index()] += 1;
                total += v;
            }
        }
        let legal = Position::ALL.iter().all(|pos| {
            let (min, max) = formation_bounds(*pos);
            (min..=max).contains(&counts[pos.index()])
        });
        if legal && total > best {
            best = total;
        }
    }
    round1(best)
}

#[test]
fn best_eleven_matches_exhaustive_search() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..25 {
        let forms: Vec<f64> = (0..15).map(|_| f64::from(rng.gen_range(0..100u32)) / 10.0).collect();
        let squad = full_squad(50, |id| forms[(id - 1) as usize]);
        let pool = PlayerPool::from_players(squad.clone());
        let team = team_of(&squad, 0);

        let lineup = best_eleven(&team, &pool).expect("full squad fields eleven");
        assert_eq!(lineup.starters.len(), STARTERS);
        assert_eq!(lineup.bench.len(), 4);
        for pos in Position::ALL {
            let (min, max) = formation_bounds(pos);
            assert!((min..=max).contains(&lineup.counts[pos.index()]));
        }

        let scored: Vec<(Position, f64)> = squad.iter().map(|p| (p.position, xp(p))).collect();
        assert_eq!(lineup.total_xp, brute_force_best(&scored));
    }
}

#[test]
fn dominant_players_always_start() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
        let star = rng.gen_range(1..=15u32);
        let squad = full_squad(50, |id| {
            if id == star {
                20.0
            } else {
                f64::from((id * 7) % 5)
            }
        });
        let pool = PlayerPool::from_players(squad.clone());
        let team = team_of(&squad, 0);
        let lineup = best_eleven(&team, &pool).unwrap();

        let star_position = pool.get(star).unwrap().position;
        let beaten_by_all_peers = squad
            .iter()
            .filter(|p| p.position == star_position && p.id != star)
            .all(|p| xp(p) < xp(pool.get(star).unwrap()));
        assert!(beaten_by_all_peers);
        assert!(lineup.starters.contains(&star), "star {star} benched");
    }
}
