//! Owns the application state. Every change goes through [`Store::dispatch`],
//! which applies the delta, persists user-owned data and notifies subscribers.

use std::sync::mpsc;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fpl_api::{FplApi, next_fixture_difficulty, team_from_public};
use crate::live::{LiveScore, live_points};
use crate::notifications::{Notification, NotificationKind};
use crate::persist::{PersistedState, Repository};
use crate::session::{Credentials, SessionApi};
use crate::squad::{self, Rejection};
use crate::state::{AppState, Delta, StateEvent, UserTeam, apply_delta};

pub struct Store {
    state: AppState,
    repo: Box<dyn Repository>,
    subscribers: Vec<mpsc::Sender<StateEvent>>,
}

impl Store {
    /// Restores persisted user data. A repository that fails to load is
    /// logged and the store starts from defaults.
    pub fn open(repo: Box<dyn Repository>) -> Self {
        let mut state = AppState::new();
        match repo.load() {
            Ok(saved) => saved.restore_into(&mut state),
            Err(err) => warn!(error = %err, "could not load saved state"),
        }
        Self {
            state,
            repo,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<StateEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn dispatch(&mut self, delta: Delta) -> StateEvent {
        let event = apply_delta(&mut self.state, delta);
        if event.is_persisted() {
            self.persist();
        }
        self.subscribers.retain(|tx| tx.send(event).is_ok());
        event
    }

    fn persist(&self) {
        if let Err(err) = self.repo.save(&PersistedState::from_state(&self.state)) {
            warn!(error = %err, "could not save state");
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.dispatch(Delta::SetError(Some(err.to_string())));
        err
    }

    fn notify(&mut self, kind: NotificationKind, title: &str, message: String) {
        self.dispatch(Delta::Notify(Notification::new(kind, title, message)));
    }

    pub fn refresh_bootstrap(&mut self, api: &FplApi) -> Result<()> {
        self.dispatch(Delta::SetLoading(true));
        match api.bootstrap() {
            Ok(bootstrap) => {
                self.dispatch(Delta::Bootstrap {
                    players: bootstrap.players,
                    clubs: bootstrap.clubs,
                    events: bootstrap.events,
                });
                self.dispatch(Delta::SetError(None));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Attaches each club's next fixture difficulty to its players, counting
    /// from the gameweek after the current one.
    pub fn refresh_fixtures(&mut self, api: &FplApi) -> Result<()> {
        let fixtures = match api.fixtures() {
            Ok(fixtures) => fixtures,
            Err(err) => return Err(self.fail(err)),
        };
        let from = self.state.current_gameweek().map(|gw| {
            if gw.finished || gw.is_current {
                gw.id + 1
            } else {
                gw.id
            }
        });
        let by_club = next_fixture_difficulty(&fixtures, from);
        self.dispatch(Delta::Difficulty(by_club));
        Ok(())
    }

    /// Loads a public entry's picks for the current gameweek. Nothing is
    /// committed unless both the picks and the entry lookup succeed.
    pub fn load_team(&mut self, api: &FplApi, entry_id: u32) -> Result<()> {
        let Some(event_id) = self.state.current_gameweek().map(|gw| gw.id) else {
            return Err(self.fail(Error::DataIncomplete("events")));
        };
        self.dispatch(Delta::SetLoading(true));
        match api.load_team(entry_id, event_id) {
            Ok((picks, entry)) => {
                let team = team_from_public(&self.state.user_team, picks, entry);
                info!(entry_id, event_id, picks = team.picks.len(), "team loaded");
                self.dispatch(Delta::SetUserTeam(team));
                self.dispatch(Delta::SetError(None));
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn add_player(&mut self, player_id: u32) -> std::result::Result<(), Rejection> {
        let team = squad::add_player(&self.state.user_team, &self.state.pool, player_id)?;
        self.dispatch(Delta::SetUserTeam(team));
        Ok(())
    }

    pub fn transfer(&mut self, out_id: u32, in_id: u32) -> std::result::Result<(), Rejection> {
        let team = squad::simulate_transfer(&self.state.user_team, &self.state.pool, out_id, in_id)?;
        let name = |id: u32, state: &AppState| {
            state
                .pool
                .get(id)
                .map(|p| p.web_name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let message = format!(
            "Out: {} / In: {}. Bank now {}.",
            name(out_id, &self.state),
            name(in_id, &self.state),
            team.bank
        );
        self.dispatch(Delta::SetUserTeam(team));
        self.notify(NotificationKind::Success, "Transfer complete", message);
        Ok(())
    }

    pub fn set_captain(&mut self, player_id: u32) -> std::result::Result<(), Rejection> {
        let team = squad::set_captain(&self.state.user_team, player_id)?;
        self.dispatch(Delta::SetUserTeam(team));
        Ok(())
    }

    /// Returns false when the player was already watched.
    pub fn watch(&mut self, player_id: u32) -> bool {
        if self.state.watchlist.contains(player_id) {
            return false;
        }
        self.dispatch(Delta::Watch(player_id));
        true
    }

    pub fn unwatch(&mut self, player_id: u32) -> bool {
        if !self.state.watchlist.contains(player_id) {
            return false;
        }
        self.dispatch(Delta::Unwatch(player_id));
        true
    }

    pub fn mark_notifications_read(&mut self) {
        self.dispatch(Delta::ReadNotifications);
    }

    pub fn clear_notifications(&mut self) {
        self.dispatch(Delta::ClearNotifications);
    }

    /// Logs in through the session, then replaces the user team with the
    /// account's private squad and profile. Any failure leaves the team as it
    /// was and the session marked logged out.
    pub fn sync_account(&mut self, session: &dyn SessionApi, credentials: &Credentials) -> Result<()> {
        self.dispatch(Delta::SetLoading(true));
        let synced = session.login(credentials).and_then(|()| {
            let my_team = session.my_team()?;
            let profile = session.entry(my_team.entry_id)?;
            Ok((my_team, profile))
        });
        let (my_team, profile) = match synced {
            Ok(pair) => pair,
            Err(err) => {
                self.dispatch(Delta::SetLoggedIn(false));
                return Err(self.fail(err));
            }
        };

        let team = UserTeam {
            picks: my_team.picks,
            bank: my_team.transfers.bank(),
            entry_id: Some(my_team.entry_id),
            team_name: profile.name.clone(),
            manager_name: profile.manager_name(),
            total_points: profile.summary_overall_points.unwrap_or_default(),
            overall_rank: profile.summary_overall_rank.unwrap_or_default(),
            event_points: profile.summary_event_points.unwrap_or_default(),
            event_rank: profile.summary_event_rank.unwrap_or_default(),
            ..self.state.user_team.clone()
        };
        info!(entry_id = my_team.entry_id, "account synced");
        self.dispatch(Delta::SetUserTeam(team));
        self.dispatch(Delta::SetLoggedIn(true));
        self.dispatch(Delta::SetError(None));
        self.notify(
            NotificationKind::Info,
            "Account synced",
            format!("Loaded {} from your account.", profile.name),
        );
        Ok(())
    }

    /// Live points of the current squad; state is not modified.
    pub fn live_score(&self, session: &dyn SessionApi, event_id: u32) -> Result<LiveScore> {
        let live = session.live_event(event_id)?;
        Ok(live_points(&self.state.user_team, &live))
    }
}
