// ViewerContext extractors for handlers

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::Response,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

use crate::app_state::AppState;
use crate::entities::User;
use crate::infrastructure::viewer::ViewerContext;
use crate::render::found;

/// Request viewer, anonymous or not.
///
/// Derefs to `ViewerContext`, so handlers read `vc.user` directly. Cloning
/// only clones the inner `Arc`.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A viewer that must be signed in.
///
/// Anonymous requests are rejected with a redirect to the login page whose
/// `next` parameter carries the original path and query.
#[derive(Debug, Clone)]
pub struct AuthenticatedViewer {
    pub user: User,
    pub vc: Vc,
}

impl<S> FromRequestParts<S> for AuthenticatedViewer
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let vc = Vc::from_request_parts(parts, state)
            .await
            .map_err(axum::response::IntoResponse::into_response)?;

        match vc.user.clone() {
            Some(user) => Ok(AuthenticatedViewer { user, vc }),
            None => {
                let app_state = AppState::from_ref(state);
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                Err(login_redirect(&app_state.config.auth.login_url, next))
            }
        }
    }
}

pub fn login_redirect(login_url: &str, next: &str) -> Response {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    found(&format!("{}{}next={}", login_url, separator, encode_next(next)))
}

/// Unreserved characters plus `/` stay readable in `next`
const NEXT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

fn encode_next(value: &str) -> String {
    utf8_percent_encode(value, NEXT_SET).to_string()
}
