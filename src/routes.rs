use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    app_state::AppState,
    infrastructure::middleware::viewer_context_middleware,
    views,
};

pub fn create_router(state: AppState) -> Router {
    let media_prefix = state.config.media.url.trim_end_matches('/').to_string();
    let media_files = ServeDir::new(state.config.media.root.clone());
    let body_limit = state.config.media.max_upload_bytes;

    Router::new()
        // Listings
        .route("/", get(views::index))
        .route("/group/{slug}/", get(views::group_list))
        .route("/profile/{username}/", get(views::profile))
        .route("/follow/", get(views::follow_index))

        // Posts
        .route("/posts/{post_id}/", get(views::post_detail))
        .route("/create/", get(views::post_create_form).post(views::post_create))
        .route(
            "/posts/{post_id}/edit/",
            get(views::post_edit_form).post(views::post_edit),
        )
        .route(
            "/posts/{post_id}/comment/",
            get(views::add_comment_redirect).post(views::add_comment),
        )

        // Follow toggles
        .route(
            "/profile/{username}/follow/",
            get(views::profile_follow).post(views::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(views::profile_unfollow).post(views::profile_unfollow),
        )

        .nest_service(&media_prefix, media_files)
        .fallback(views::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
