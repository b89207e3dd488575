use crate::clock::Clock;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::session::{SessionCodec, SESSION_COOKIE};
use axum::extract::FromRef;
use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use rand::RngCore;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tracing::warn;
use zeroize::Zeroize;

/// Application state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionCodec>,
    pub clock: Arc<dyn Clock>,
    cookie_key: Key,
}

impl AppState {
    /// Build state from loaded config. Without a configured cookie secret a
    /// random one is generated, so sessions do not survive a restart.
    ///
    /// The secret moves into the session codec; the shared config keeps an
    /// empty `admin.cookie_secret`.
    pub fn new(pool: DbPool, mut config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        let mut secret = if config.admin.cookie_secret.is_empty() {
            warn!("No cookie secret configured; generating a random one for this process");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            let secret = hex::encode(bytes);
            bytes.zeroize();
            secret
        } else {
            std::mem::take(&mut config.admin.cookie_secret)
        };

        // Key needs 64 bytes of material; SHA-512 stretches any secret to that.
        let cookie_key = Key::from(Sha512::digest(secret.as_bytes()).as_slice());
        let sessions = SessionCodec::new(secret.as_bytes());
        secret.zeroize();

        Self {
            pool,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            clock,
            cookie_key,
        }
    }

    /// Whether the request carries a valid admin session token.
    pub fn is_authed(&self, jar: &SignedCookieJar, headers: &HeaderMap) -> bool {
        let cookie = jar.get(SESSION_COOKIE);
        self.sessions.verify(
            cookie.as_ref().map(|c| c.value()),
            user_agent(headers),
            self.clock.now_millis(),
        )
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Raw `User-Agent` bytes, empty when the header is missing.
pub fn user_agent(headers: &HeaderMap) -> &[u8] {
    headers
        .get(header::USER_AGENT)
        .map(|v| v.as_bytes())
        .unwrap_or_default()
}

/// `Host` header, if any.
pub fn host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|v| v.to_str().ok())
}

/// Scheme the client used. The first `X-Forwarded-Proto` entry from a TLS
/// terminating proxy wins; anything but `https` counts as `http`.
pub fn scheme(headers: &HeaderMap) -> &'static str {
    let forwarded = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim);

    match forwarded {
        Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    }
}

/// `{scheme}://{host}` as seen by the client.
pub fn request_origin(headers: &HeaderMap) -> String {
    format!("{}://{}", scheme(headers), host(headers).unwrap_or("localhost"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use axum::http::HeaderValue;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_user_agent_keeps_raw_bytes() {
        let mut map = HeaderMap::new();
        map.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(b"Mozilla/5.0 (Galaxy \xC4)").unwrap(),
        );
        assert_eq!(user_agent(&map), b"Mozilla/5.0 (Galaxy \xC4)");
        assert_eq!(user_agent(&HeaderMap::new()), b"");
    }

    #[test]
    fn test_request_origin() {
        assert_eq!(request_origin(&headers(&[("host", "keys.test")])), "http://keys.test");
        assert_eq!(
            request_origin(&headers(&[("host", "keys.test"), ("x-forwarded-proto", "https")])),
            "https://keys.test"
        );
        assert_eq!(
            request_origin(&headers(&[("host", "keys.test"), ("x-forwarded-proto", "HTTPS, http")])),
            "https://keys.test"
        );
        assert_eq!(
            request_origin(&headers(&[("x-forwarded-proto", "gopher")])),
            "http://localhost"
        );
    }

    #[tokio::test]
    async fn test_cookie_secret_not_kept_in_config() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy("sqlite::memory:")
            .unwrap();
        let mut config = AppConfig::default();
        config.admin.cookie_secret = "super-secret".to_string();

        let clock = FixedClock::new(1000, NaiveDate::from_ymd_opt(2026, 3, 25).unwrap());
        let state = AppState::new(pool, config, Arc::new(clock));

        assert!(state.config.admin.cookie_secret.is_empty());
        let same = SessionCodec::new("super-secret");
        let token = same.mint(1000, b"UA");
        assert!(state.sessions.verify(Some(&token), b"UA", 1000));
    }
}
