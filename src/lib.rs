pub mod advisor;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod fpl_api;
pub mod http_cache;
pub mod http_client;
pub mod league;
pub mod live;
pub mod notifications;
pub mod optimizer;
pub mod persist;
pub mod players;
pub mod projections;
pub mod session;
pub mod squad;
pub mod state;
pub mod store;
pub mod watchlist;

pub use error::{Error, Result};
