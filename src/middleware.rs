//! Cross-cutting response middleware (spec §6): a per-user soft rate
//! limit here, and the mandatory security response headers as
//! `tower_http::set_header` layers applied directly in `main.rs`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use crate::auth::AuthenticatedUser;
use crate::errors::AppError;
use crate::ids::Id;
use crate::state::AppState;

/// A fixed 60-second window counter per user id. Grounded on the
/// teacher's `Arc<Mutex<..>>`-guarded in-memory state pattern; this
/// crate has no separate cache tier to lean on.
pub struct RateLimiter {
    limit_per_minute: u32,
    windows: Mutex<HashMap<Id, (Instant, u32)>>,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        RateLimiter {
            limit_per_minute,
            windows: Mutex::new(HashMap::new()),
        }
    }

    async fn check(&self, key: Id) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();
        let entry = windows.entry(key).or_insert((now, 0));
        if now.duration_since(entry.0) >= Duration::from_secs(60) {
            *entry = (now, 0);
        }
        entry.1 += 1;
        entry.1 <= self.limit_per_minute
    }
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.rate_limiter.check(auth.user.id).await {
        return Err(AppError::RateLimit);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_configured_limit() {
        let limiter = RateLimiter::new(3);
        let key = crate::ids::new_id();
        assert!(limiter.check(key).await);
        assert!(limiter.check(key).await);
        assert!(limiter.check(key).await);
        assert!(!limiter.check(key).await);
    }

    #[tokio::test]
    async fn tracks_each_key_independently() {
        let limiter = RateLimiter::new(1);
        let a = crate::ids::new_id();
        let b = crate::ids::new_id();
        assert!(limiter.check(a).await);
        assert!(limiter.check(b).await);
        assert!(!limiter.check(a).await);
    }
}
