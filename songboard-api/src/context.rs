//! Request-scoped caller identity
//!
//! `resolve_caller` runs on every request: it looks up the bearer token (if
//! any) and stores a [`RequestContext`] in the request extensions. Handlers
//! take the context as an extractor and pass it to every service call.
//!
//! An unknown or malformed token degrades to an anonymous caller; routes
//! that need a signed-in user extract [`Authenticated`] instead, which
//! answers 401 for anonymous callers.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use songboard_common::auth::{hash_token, parse_bearer};
use songboard_common::{Role, User};
use tracing::debug;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::AppState;

/// A signed-in user plus the token they presented
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    /// SHA-256 of the presented bearer token
    pub token_hash: String,
}

impl Caller {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub caller: Option<Caller>,
    pub request_id: String,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            caller: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn for_caller(caller: Caller) -> Self {
        Self {
            caller: Some(caller),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.caller.as_ref().map(Caller::role)
    }

    pub fn actor_id(&self) -> Option<i64> {
        self.caller.as_ref().map(Caller::id)
    }

    pub fn is_admin(&self) -> bool {
        self.role().map_or(false, |r| r.is_admin())
    }
}

/// Middleware: resolve the bearer token into a [`RequestContext`]
pub async fn resolve_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer)
        .map(str::to_string);

    let caller = match token {
        Some(token) => {
            let token_hash = hash_token(&token);
            match state.users.find_by_token(&token_hash).await? {
                Some(user) => Some(Caller { user, token_hash }),
                None => {
                    debug!("Unknown bearer token; continuing as anonymous");
                    None
                }
            }
        }
        None => None,
    };

    let ctx = match caller {
        Some(caller) => RequestContext::for_caller(caller),
        None => RequestContext::anonymous(),
    };
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(RequestContext::anonymous))
    }
}

/// Context of a request made by a signed-in user
#[derive(Debug, Clone)]
pub struct Authenticated(pub RequestContext);

impl Authenticated {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.caller.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state).await?;
        if ctx.caller.is_none() {
            return Err(ServiceError::Unauthenticated);
        }
        Ok(Authenticated(ctx))
    }
}
