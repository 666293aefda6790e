// HTTP handlers for the blog pages

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::Uri,
    response::{IntoResponse, Response},
    Form,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    app_state::AppState,
    entities::{PostFilter, PostView, User},
    error::{AppError, AppResult},
    forms::{CommentForm, FormErrors, PostForm},
    infrastructure::{
        media::MediaStorage,
        middleware::{AuthenticatedViewer, Vc},
    },
    pagination::{Page, PageQuery},
    render::found,
    services::FollowOutcome,
};

pub const INDEX_TEMPLATE: &str = "posts/index.html";
pub const GROUP_LIST_TEMPLATE: &str = "posts/group_list.html";
pub const PROFILE_TEMPLATE: &str = "posts/profile.html";
pub const POST_DETAIL_TEMPLATE: &str = "posts/post_detail.html";
pub const CREATE_POST_TEMPLATE: &str = "posts/create_post.html";
pub const FOLLOW_TEMPLATE: &str = "posts/follow.html";

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn index_cache_key(uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("index:{}", path_and_query)
}

fn post_json(post: &PostView, media: &MediaStorage) -> Value {
    json!({
        "id": post.id,
        "text": post.text,
        "pub_date": post.pub_date,
        "author": post.author,
        "group": post.group,
        "image": post.image.as_ref().map(|name| json!({
            "name": name,
            "url": media.url(name),
        })),
    })
}

fn page_json(page: Page<PostView>, media: &MediaStorage) -> Value {
    json!(page.map(|post| post_json(&post, media)))
}

/// Non-numeric ids cannot name a post.
fn parse_post_id(raw: &str) -> AppResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| AppError::NotFound(format!("Post {} not found", raw)))
}

async fn load_post(state: &AppState, raw_id: &str) -> AppResult<PostView> {
    let post_id = parse_post_id(raw_id)?;
    state
        .db
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
}

async fn load_author(state: &AppState, username: &str) -> AppResult<User> {
    state
        .db
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))
}

/// Paginated listing of every post, served from the page cache when fresh.
///
/// The cached body carries no viewer-specific data.
pub async fn index(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let key = index_cache_key(&uri);
    if let Some(page) = state.cache.get_page(&key).await {
        debug!("Serving {} from page cache", key);
        return Ok(page.into_response());
    }

    let page_obj = state
        .paginator
        .paginate(state.db.as_ref(), PostFilter::All, query.page.as_deref())
        .await?;
    let page = state.render(
        INDEX_TEMPLATE,
        &json!({ "page_obj": page_json(page_obj, &state.media) }),
    )?;

    state
        .cache
        .put_page(&key, page.clone(), state.config.cache.index_ttl())
        .await;
    Ok(page.into_response())
}

pub async fn group_list(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let group = state
        .db
        .get_group_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {} not found", slug)))?;

    let page_obj = state
        .paginator
        .paginate(state.db.as_ref(), PostFilter::Group(group.id), query.page.as_deref())
        .await?;

    let context = json!({
        "group": group,
        "page_obj": page_json(page_obj, &state.media),
    });
    Ok(state.render(GROUP_LIST_TEMPLATE, &context)?.into_response())
}

pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    vc: Vc,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let author = load_author(&state, &username).await?;

    let page_obj = state
        .paginator
        .paginate(state.db.as_ref(), PostFilter::Author(author.id), query.page.as_deref())
        .await?;
    let following = state.follows.is_following(vc.user.as_ref(), &author).await?;

    let context = json!({
        "author": author.to_ref(),
        "posts_count": page_obj.count,
        "following": following,
        "page_obj": page_json(page_obj, &state.media),
    });
    Ok(state.render(PROFILE_TEMPLATE, &context)?.into_response())
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    let post = load_post(&state, &post_id).await?;
    let comments = state.db.list_comments(post.id).await?;
    let posts_count = state
        .db
        .count_posts(PostFilter::Author(post.author.id))
        .await?;

    let context = json!({
        "post": post_json(&post, &state.media),
        "posts_count": posts_count,
        "comments": comments,
        "form": CommentForm::empty_context(),
    });
    Ok(state.render(POST_DETAIL_TEMPLATE, &context)?.into_response())
}

async fn render_post_form(
    state: &AppState,
    form: &PostForm,
    errors: &FormErrors,
    editing: Option<i64>,
) -> AppResult<Response> {
    let groups = state.db.list_groups().await?;
    let context = json!({
        "form": form.context(errors),
        "is_edit": editing.is_some(),
        "post_id": editing,
        "groups": groups,
    });
    Ok(state.render(CREATE_POST_TEMPLATE, &context)?.into_response())
}

pub async fn post_create_form(
    State(state): State<AppState>,
    _viewer: AuthenticatedViewer,
) -> AppResult<Response> {
    render_post_form(&state, &PostForm::default(), &FormErrors::new(), None).await
}

/// An unreadable body binds as an empty form and fails validation.
fn bound_form(form: Result<PostForm, AppError>) -> PostForm {
    form.unwrap_or_else(|e| {
        debug!("Unreadable post form: {}", e);
        PostForm::default()
    })
}

pub async fn post_create(
    State(state): State<AppState>,
    viewer: AuthenticatedViewer,
    form: Result<PostForm, AppError>,
) -> AppResult<Response> {
    let form = bound_form(form);
    match form.save_new(state.db.as_ref(), &state.media, &viewer.user).await? {
        Ok(post) => {
            info!(request_id = %viewer.vc.request_id, "Post {} created by {}", post.id, viewer.user.username);
            Ok(found(&profile_url(&viewer.user.username)))
        }
        Err(errors) => render_post_form(&state, &form, &errors, None).await,
    }
}

pub async fn post_edit_form(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    viewer: AuthenticatedViewer,
) -> AppResult<Response> {
    let post = load_post(&state, &post_id).await?;
    if post.author.id != viewer.user.id {
        return Ok(found(&post_detail_url(post.id)));
    }
    render_post_form(&state, &PostForm::from_post(&post), &FormErrors::new(), Some(post.id)).await
}

/// Only text and group change; an uploaded image is ignored on edit.
pub async fn post_edit(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    viewer: AuthenticatedViewer,
    form: Result<PostForm, AppError>,
) -> AppResult<Response> {
    let post = load_post(&state, &post_id).await?;
    if post.author.id != viewer.user.id {
        debug!("{} may not edit post {}", viewer.user.username, post.id);
        return Ok(found(&post_detail_url(post.id)));
    }
    let form = bound_form(form);

    match form.save_edit(state.db.as_ref(), post.id).await? {
        Ok(()) => {
            info!(request_id = %viewer.vc.request_id, "Post {} edited", post.id);
            Ok(found(&post_detail_url(post.id)))
        }
        Err(errors) => render_post_form(&state, &form, &errors, Some(post.id)).await,
    }
}

/// GET on the comment route carries no form; send the user to the post.
pub async fn add_comment_redirect(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    _viewer: AuthenticatedViewer,
) -> AppResult<Response> {
    let post = load_post(&state, &post_id).await?;
    Ok(found(&post_detail_url(post.id)))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    viewer: AuthenticatedViewer,
    form: Result<Form<CommentForm>, FormRejection>,
) -> AppResult<Response> {
    let post = load_post(&state, &post_id).await?;
    let form = form.map(|Form(form)| form).unwrap_or_default();

    match form.save(state.db.as_ref(), post.id, &viewer.user).await? {
        Ok(comment) => info!("Comment {} added to post {}", comment.id, post.id),
        Err(errors) => debug!("Comment rejected: {:?}", errors),
    }
    Ok(found(&post_detail_url(post.id)))
}

pub async fn profile_follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: AuthenticatedViewer,
) -> AppResult<Response> {
    let author = load_author(&state, &username).await?;
    match state.follows.follow(&viewer.user, &author).await? {
        FollowOutcome::Followed => {}
        FollowOutcome::AlreadyFollowing => {
            debug!("{} already follows {}", viewer.user.username, author.username)
        }
        FollowOutcome::SelfFollow => debug!("{} tried to follow themselves", author.username),
    }
    Ok(found(&profile_url(&author.username)))
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    viewer: AuthenticatedViewer,
) -> AppResult<Response> {
    let author = load_author(&state, &username).await?;
    state.follows.unfollow(&viewer.user, &author).await?;
    Ok(found(&profile_url(&author.username)))
}

/// Posts by followed authors. Never cached.
pub async fn follow_index(
    State(state): State<AppState>,
    viewer: AuthenticatedViewer,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let page_obj = state
        .follows
        .feed(&state.paginator, &viewer.user, query.page.as_deref())
        .await?;
    let context = json!({ "page_obj": page_json(page_obj, &state.media) });
    Ok(state.render(FOLLOW_TEMPLATE, &context)?.into_response())
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_cache_key_includes_query() {
        let uri: Uri = "/?page=2".parse().unwrap();
        assert_eq!(index_cache_key(&uri), "index:/?page=2");
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(index_cache_key(&uri), "index:/");
    }

    #[test]
    fn test_parse_post_id() {
        assert_eq!(parse_post_id("12").unwrap(), 12);
        assert!(matches!(parse_post_id("abc"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_urls() {
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(post_detail_url(3), "/posts/3/");
    }
}
