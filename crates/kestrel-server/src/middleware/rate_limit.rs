//! Rate-limit guard for route groups.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use kestrel_core::Actor;

use crate::error::AppError;
use crate::rate_limit::{ClientKey, EndpointClass, RateLimitDecision, RateLimiter};

pub static RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub static RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Limiter bound to the endpoint class of one route group.
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: RateLimiter,
    class: EndpointClass,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter, class: EndpointClass) -> Self {
        Self { limiter, class }
    }

    pub fn class(&self) -> EndpointClass {
        self.class
    }
}

/// Identity of the caller: the authenticated actor when present, the peer
/// address otherwise.
fn client_of(request: &Request) -> ClientKey {
    let user = request.extensions().get::<Actor>().map(|actor| actor.id);
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    ClientKey::resolve(user, addr)
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(
        RATE_LIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    if let Ok(reset) = HeaderValue::from_str(&decision.reset_time_rfc3339()) {
        headers.insert(RATE_LIMIT_RESET.clone(), reset);
    }
}

/// Counts the request and rejects it with 429 once the window is spent.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn rate_limit_guard(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_of(&request);
    let decision = guard.limiter.check(&client, guard.class).await;

    let mut response = if decision.limited {
        let now = guard.limiter.clock().now_millis();
        AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(now),
        }
        .into_response()
    } else {
        next.run(request).await
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use kestrel_core::{Role, UserId};

    #[test]
    fn test_actor_wins_over_address() {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 4000))));
        assert_eq!(client_of(&request).to_string(), "ip:10.0.0.1");

        request
            .extensions_mut()
            .insert(Actor::new(UserId::new(7), Role::User));
        assert_eq!(client_of(&request).to_string(), "user:7");
    }

    #[test]
    fn test_headers_from_decision() {
        let decision = RateLimitDecision {
            limited: false,
            limit: 200,
            remaining: 150,
            reset_time_ms: 60_000,
            count: 50,
            degraded: false,
        };
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &decision);

        assert_eq!(headers[&RATE_LIMIT_LIMIT], "200");
        assert_eq!(headers[&RATE_LIMIT_REMAINING], "150");
        assert_eq!(headers[&RATE_LIMIT_RESET], "1970-01-01T00:01:00.000Z");
    }
}
