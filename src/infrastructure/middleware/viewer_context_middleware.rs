// ViewerContext Middleware - creates the request-scoped viewer from the
// identity provider's header and injects it into request extensions

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    app_state::AppState,
    config::AuthConfig,
    entities::User,
    error::{AppError, AppResult},
    infrastructure::{database::DatabaseInterface, viewer::ViewerContext},
};

pub async fn viewer_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let viewer = resolve_viewer(state.db.as_ref(), &state.config.auth, request.headers()).await?;
    debug!(
        request_id = %viewer.request_id,
        user = viewer.user.as_ref().map(|u| u.username.as_str()).unwrap_or("anonymous"),
        "Resolved viewer"
    );

    request.extensions_mut().insert(Arc::new(viewer));
    Ok(next.run(request).await)
}

/// Map the remote-user header onto a stored user.
///
/// A missing, empty or malformed header yields an anonymous viewer.
pub async fn resolve_viewer(
    db: &dyn DatabaseInterface,
    auth: &AuthConfig,
    headers: &HeaderMap,
) -> AppResult<ViewerContext> {
    let request_id = ViewerContext::new_request_id();

    let username = match remote_username(headers, &auth.remote_user_header) {
        Some(username) => username,
        None => return Ok(ViewerContext::anonymous(request_id)),
    };

    if !User::is_valid_username(&username) {
        warn!("Ignoring malformed remote user '{}'", username);
        return Ok(ViewerContext::anonymous(request_id));
    }

    if let Some(user) = db.get_user_by_username(&username).await? {
        return Ok(ViewerContext::authenticated(user, request_id));
    }

    if !auth.create_unknown_users {
        debug!("Remote user '{}' is not provisioned", username);
        return Ok(ViewerContext::anonymous(request_id));
    }

    let user = match db.create_user(&username).await {
        Ok(user) => {
            info!("Provisioned user '{}' from identity provider", username);
            user
        }
        // Another request provisioned the same user first.
        Err(AppError::Conflict(_)) => db
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User '{}' vanished", username)))?,
        Err(e) => return Err(e),
    };
    Ok(ViewerContext::authenticated(user, request_id))
}

fn remote_username(headers: &HeaderMap, header_name: &str) -> Option<String> {
    let value = headers.get(header_name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
