use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use rand::thread_rng;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use xgaffer::advisor;
use xgaffer::cache::{CacheStore, MemoryCache, SqliteCache, now_secs};
use xgaffer::config::Config;
use xgaffer::export::{export_squad_csv, report_file_name};
use xgaffer::fpl_api::FplApi;
use xgaffer::optimizer::best_eleven;
use xgaffer::persist::{JsonFileRepository, MemoryRepository, Repository};
use xgaffer::players::{PlayerQuery, SortDir, TOP_EFFICIENCY, top_by_efficiency};
use xgaffer::projections::{self, RandomJitter, squad_projection};
use xgaffer::session::{Credentials, ProxySession, SessionApi};
use xgaffer::state::{AppState, Position};
use xgaffer::store::Store;

const USAGE: &str = "usage: xgaffer <command>

commands:
  bootstrap              refresh players, clubs and gameweeks
  team <entry-id>        load a public entry's squad for the current gameweek
  projections            multi-week xP for the saved squad
  lineup                 best starting eleven for the saved squad
  advice                 squad insights
  players [filters]      search the player pool
                         --pos GKP|DEF|MID|FWD  --club <id>  --search <text>  --gems
                         --sort name|price|points|ownership|form|xp|consistency|value|ppm
                         --asc  --limit <n>
  top-value [n]          players with the best xEfficiency (xP per £1m)
  add <player-id>        add a player to the saved squad
  transfer <out> <in>    simulate a transfer
  captain <player-id>    hand the armband to a squad player
  watch <player-id>      add a player to the watchlist
  unwatch <player-id>    remove a player from the watchlist
  notifications          list notifications and mark them read
  login                  sync the account via the session proxy (XGAFFER_EMAIL, XGAFFER_PASSWORD)
  live <gameweek>        live points of the saved squad
  league <league-id>     classic league standings
  export [path]          write the squad CSV report";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = Config::from_env();
    let mut store = Store::open(open_repository(&config));

    match command.as_str() {
        "bootstrap" => {
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            println!(
                "{} players, {} clubs, {} gameweeks",
                state.pool.len(),
                state.clubs.len(),
                state.events.len()
            );
            if let Some(gw) = state.current_gameweek() {
                println!("current: {}", gw.name);
            }
        }
        "team" => {
            let entry_id = id_arg(&args, 1, "entry-id")?;
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            store
                .load_team(&api, entry_id)
                .with_context(|| format!("load team for entry {entry_id}"))?;
            print_team(store.state());
        }
        "projections" => {
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            let mut jitter = RandomJitter::new(thread_rng());
            let projection = squad_projection(&state.user_team, &state.pool, config.horizon, &mut jitter);
            if projection.is_empty() {
                println!("squad is empty");
            }
            for week in projection.iter() {
                println!("GW+{}  {:>6.1} xP", week.week_offset, week.total_xp);
            }
        }
        "lineup" => {
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            let lineup = best_eleven(&state.user_team, &state.pool)?;
            println!("formation {}  total {:.1} xP", lineup.formation(), lineup.total_xp);
            for id in &lineup.starters {
                println!("  {}", player_label(state, *id));
            }
            println!("bench:");
            for id in &lineup.bench {
                println!("  {}", player_label(state, *id));
            }
        }
        "advice" => {
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            let mut any = false;
            for insight in advisor::insights(&state.user_team, &state.pool) {
                any = true;
                println!("[{}] {}", insight.category.as_str(), insight.message);
            }
            if !any {
                println!("no advice for this squad");
            }
        }
        "players" => {
            let query = parse_player_query(&args[1..])?;
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            let hits = query.run(&state.pool);
            if hits.is_empty() {
                println!("no players match");
            }
            for p in hits {
                println!(
                    "{:>4}  {}  {:>4} pts  form {:>4}  {:>5.1} xP  {:>5.1}%  rel {:.2}",
                    p.id,
                    player_label(state, p.id),
                    p.total_points,
                    p.form.map(|f| format!("{f:.1}")).unwrap_or_else(|| "-".to_string()),
                    projections::xp(p),
                    p.ownership(),
                    p.derived.consistency
                );
            }
        }
        "top-value" => {
            let n = match args.get(1) {
                Some(_) => id_arg(&args, 1, "n")? as usize,
                None => TOP_EFFICIENCY,
            };
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            let state = store.state();
            for (rank, p) in top_by_efficiency(&state.pool, n).into_iter().enumerate() {
                println!(
                    "{:>2}. {}  {:.2} xP/£m",
                    rank + 1,
                    player_label(state, p.id),
                    p.derived.efficiency
                );
            }
        }
        "add" => {
            let player_id = id_arg(&args, 1, "player-id")?;
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            store.add_player(player_id)?;
            print_team(store.state());
        }
        "transfer" => {
            let out_id = id_arg(&args, 1, "out")?;
            let in_id = id_arg(&args, 2, "in")?;
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            store.transfer(out_id, in_id)?;
            print_team(store.state());
        }
        "captain" => {
            let player_id = id_arg(&args, 1, "player-id")?;
            store.set_captain(player_id)?;
            println!("captain set to {player_id}");
        }
        "watch" => {
            let player_id = id_arg(&args, 1, "player-id")?;
            if !store.watch(player_id) {
                println!("{player_id} is already watched");
            }
        }
        "unwatch" => {
            let player_id = id_arg(&args, 1, "player-id")?;
            if !store.unwatch(player_id) {
                println!("{player_id} was not watched");
            }
        }
        "notifications" => {
            for n in store.state().notifications.iter() {
                let marker = if n.read { " " } else { "*" };
                println!(
                    "{marker} {} {}: {}",
                    n.timestamp.format("%Y-%m-%d %H:%M"),
                    n.title,
                    n.message
                );
            }
            store.mark_notifications_read();
        }
        "login" => {
            let email = env::var("XGAFFER_EMAIL").context("XGAFFER_EMAIL is not set")?;
            let password = env::var("XGAFFER_PASSWORD").context("XGAFFER_PASSWORD is not set")?;
            let session = ProxySession::new(&config)?;
            store
                .sync_account(&session, &Credentials::new(email, password))
                .context("account sync failed")?;
            print_team(store.state());
        }
        "live" => {
            let event_id = id_arg(&args, 1, "gameweek")?;
            let session = ProxySession::new(&config)?;
            let score = store
                .live_score(&session, event_id)
                .with_context(|| format!("live data for gameweek {event_id}"))?;
            println!("GW{event_id}: {} pts", score.total_points);
            if let Some(captain) = score.captain {
                println!("captain {} returned {} pts", captain.player_id, captain.points);
            }
        }
        "league" => {
            let league_id = id_arg(&args, 1, "league-id")?;
            let session = ProxySession::new(&config)?;
            let standings = session
                .league_standings(league_id)
                .with_context(|| format!("standings for league {league_id}"))?;
            println!("{}", standings.league.name);
            for row in &standings.results {
                println!(
                    "{:>4}  {:<28} {:<22} {:>5} ({:+})",
                    row.rank, row.entry_name, row.player_name, row.total, row.event_total
                );
            }
        }
        "export" => {
            let api = public_api(&config)?;
            refresh(&mut store, &api)?;
            if store.state().user_team.picks.is_empty() {
                bail!("no squad data to export");
            }
            let path = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(report_file_name(chrono::Local::now().date_naive())));
            let report = export_squad_csv(&path, store.state())
                .with_context(|| format!("write {}", path.display()))?;
            println!("wrote {} rows to {}", report.rows, path.display());
        }
        other => {
            eprintln!("unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn open_repository(config: &Config) -> Box<dyn Repository> {
    match config.state_path() {
        Some(path) => Box::new(JsonFileRepository::new(path)),
        None => Box::new(MemoryRepository::new()),
    }
}

fn open_cache(config: &Config) -> Box<dyn CacheStore> {
    let Some(path) = config.cache_db_path() else {
        return Box::new(MemoryCache::new());
    };
    match SqliteCache::open(&path) {
        Ok(cache) => {
            if let Err(err) = cache.purge_expired(now_secs()) {
                warn!(error = %err, "cache purge failed");
            }
            Box::new(cache)
        }
        Err(err) => {
            warn!(error = %err, path = %path.display(), "falling back to in-memory cache");
            Box::new(MemoryCache::new())
        }
    }
}

fn public_api(config: &Config) -> Result<FplApi> {
    FplApi::new(config, open_cache(config)).context("build upstream client")
}

fn refresh(store: &mut Store, api: &FplApi) -> Result<()> {
    store.refresh_bootstrap(api).context("load bootstrap data")?;
    if let Err(err) = store.refresh_fixtures(api) {
        warn!(error = %err, "fixture difficulty unavailable");
    }
    Ok(())
}

fn id_arg(args: &[String], idx: usize, name: &str) -> Result<u32> {
    let raw = args
        .get(idx)
        .ok_or_else(|| anyhow!("missing <{name}>\n\n{USAGE}"))?;
    raw.parse()
        .with_context(|| format!("<{name}> must be a number, got {raw:?}"))
}

fn parse_player_query(args: &[String]) -> Result<PlayerQuery> {
    let mut query = PlayerQuery::default();
    let mut rest = args.iter();
    while let Some(flag) = rest.next() {
        let mut value = |name: &str| {
            rest.next()
                .cloned()
                .ok_or_else(|| anyhow!("{flag} needs <{name}>\n\n{USAGE}"))
        };
        match flag.as_str() {
            "--pos" => {
                let raw = value("position")?;
                query.position = Some(
                    Position::ALL
                        .into_iter()
                        .find(|p| p.short().eq_ignore_ascii_case(&raw))
                        .ok_or_else(|| anyhow!("unknown position {raw:?}"))?,
                );
            }
            "--club" => {
                let raw = value("club-id")?;
                query.club = Some(
                    raw.parse()
                        .with_context(|| format!("<club-id> must be a number, got {raw:?}"))?,
                );
            }
            "--search" => query.search = value("text")?,
            "--gems" => query.gems_only = true,
            "--sort" => query.sort = value("key")?.parse().map_err(|e: String| anyhow!(e))?,
            "--asc" => query.dir = SortDir::Asc,
            "--limit" => {
                let raw = value("n")?;
                query.limit = raw
                    .parse()
                    .with_context(|| format!("<n> must be a number, got {raw:?}"))?;
            }
            other => bail!("unknown players flag {other:?}\n\n{USAGE}"),
        }
    }
    Ok(query)
}

fn player_label(state: &AppState, id: u32) -> String {
    match state.pool.get(id) {
        Some(p) => format!(
            "{:<18} {} {:<14} {}",
            p.web_name,
            p.position.short(),
            state.club_name(p.team),
            p.now_cost
        ),
        None => format!("#{id}"),
    }
}

fn print_team(state: &AppState) {
    let team = &state.user_team;
    println!(
        "{} ({}), bank {}, transfers {}",
        team.team_name, team.manager_name, team.bank, team.transfers
    );
    for pick in &team.picks {
        let armband = if pick.is_captain {
            " (C)"
        } else if pick.is_vice_captain {
            " (V)"
        } else {
            ""
        };
        println!("{:>2}. {}{armband}", pick.position, player_label(state, pick.element));
    }
}
