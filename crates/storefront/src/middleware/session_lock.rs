//! Per-session serialization of state-changing requests.
//!
//! Handlers load the session record, change it, and the session layer writes
//! it back after the response. Two writes on one session that overlap would
//! both start from the same record and the later save would drop the
//! earlier change. This middleware sits outside the session layer and holds
//! a per-session mutex from before the record is loaded until after it is
//! saved.
//!
//! Only non-safe methods that present a session cookie are serialized. Reads
//! and cookieless requests pass straight through.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::COOKIE},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Upper bound on tracked sessions.
const MAX_TRACKED_SESSIONS: u64 = 100_000;

/// Locks for sessions idle this long are dropped.
const LOCK_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Registry of per-session mutexes, keyed by session cookie value.
#[derive(Clone)]
pub struct SessionLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder()
            .max_capacity(MAX_TRACKED_SESSIONS)
            .time_to_idle(LOCK_IDLE_TIMEOUT)
            .build();
        Self { locks }
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: String) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(session_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// The session cookie's value, if the request carries one.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
}

/// Run state-changing requests of one session one at a time.
pub async fn serialize_session_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method().is_safe() {
        return next.run(request).await;
    }

    let Some(session_id) = session_cookie(request.headers()) else {
        return next.run(request).await;
    };

    let _guard = state.session_locks().acquire(session_id).await;
    next.run(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_session_cookie_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE_NAME}=abc123; lang=hi"))
                .unwrap(),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_no_session_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[tokio::test]
    async fn test_same_session_waits_other_sessions_do_not() {
        let locks = SessionLocks::new();
        let held = locks.acquire("asha".to_string()).await;

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire("asha".to_string()),
        )
        .await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire("ravi".to_string()),
        )
        .await;
        assert!(other.is_ok());

        drop(held);
        let reacquired = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire("asha".to_string()),
        )
        .await;
        assert!(reacquired.is_ok());
    }
}
