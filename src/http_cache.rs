use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use tracing::{debug, warn};

use crate::cache::{CacheStore, now_secs};
use crate::error::{Error, Result};

/// Serves `key` from `cache` while fresh, otherwise fetches `url` once.
/// A body is stored for `ttl` only after `parse` accepts it; a cached body
/// that no longer parses is evicted and refetched. Cache write failures are
/// logged, not returned.
pub fn fetch_json_cached<T>(
    client: &Client,
    cache: &dyn CacheStore,
    url: &str,
    key: &str,
    ttl: Duration,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<T> {
    let now = now_secs();
    match cache.get(key, now) {
        Ok(Some(body)) => match parse(&body) {
            Ok(value) => {
                debug!(key, "cache hit");
                return Ok(value);
            }
            Err(err) => {
                warn!(key, error = %err, "evicting unreadable cache entry");
                if let Err(err) = cache.remove(key) {
                    warn!(key, error = %err, "cache remove failed");
                }
            }
        },
        Ok(None) => {}
        Err(err) => warn!(key, error = %err, "cache read failed"),
    }

    let body = fetch_json(client, url)?;
    let value = parse(&body)?;
    if let Err(err) = cache.set(key, &body, ttl, now) {
        warn!(key, error = %err, "cache write failed");
    }
    Ok(value)
}

pub fn fetch_json(client: &Client, url: &str) -> Result<String> {
    send_for_body(client.get(url), url)
}

/// Sends once; no retry. Non-success statuses surface as `Upstream`.
pub fn send_for_body(req: RequestBuilder, url: &str) -> Result<String> {
    debug!(url, "request");
    let resp = req.send()?;
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(Error::Upstream {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(body)
}
