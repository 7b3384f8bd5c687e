use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://fantasy.premierleague.com/api";
pub const DEFAULT_PROXY_BASE: &str = "http://localhost:5000/api/fpl";
const APP_DIR: &str = "xgaffer";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub proxy_base: String,
    pub cache_ttl: Duration,
    pub horizon: u32,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
            cache_ttl: Duration::from_secs(3600),
            horizon: 5,
            data_dir: app_data_dir(),
        }
    }
}

impl Config {
    /// Reads `XGAFFER_*` variables; callers load `.env` files beforehand.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base = non_empty_var("XGAFFER_API_BASE").unwrap_or(defaults.api_base);
        let proxy_base = non_empty_var("XGAFFER_PROXY_BASE").unwrap_or(defaults.proxy_base);
        let ttl_secs = env::var("XGAFFER_CACHE_TTL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(3600)
            .max(60);
        let horizon = env::var("XGAFFER_HORIZON")
            .ok()
            .and_then(|val| val.parse::<u32>().ok())
            .unwrap_or(5)
            .clamp(1, 10);
        let data_dir = non_empty_var("XGAFFER_DATA_DIR")
            .map(PathBuf::from)
            .or(defaults.data_dir);

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            proxy_base: proxy_base.trim_end_matches('/').to_string(),
            cache_ttl: Duration::from_secs(ttl_secs),
            horizon,
            data_dir,
        }
    }

    pub fn cache_db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("cache.sqlite"))
    }

    pub fn state_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("state.json"))
    }
}

pub fn app_data_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Some(base) = non_empty_var("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = non_empty_var("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
