use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use yatube::{
    app_state::AppState,
    config::Config,
    create_router,
    entities::{NewGroup, NewPost, PostFilter, User},
    infrastructure::{
        cache_layer::LocalPageCache, database::DatabaseInterface,
        sqlite_database::SqliteDatabase,
    },
    render::JsonRenderer,
};

const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\
\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

const BOUNDARY: &str = "yatube-test-boundary";

struct TestApp {
    app: Router,
    state: AppState,
    _media_dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.root = media_dir.path().to_path_buf();

        let db: Arc<dyn DatabaseInterface> =
            Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let cache = Arc::new(LocalPageCache::new(100).unwrap());
        let state = AppState::with_components(config, db, cache, Arc::new(JsonRenderer));

        Self {
            app: create_router(state.clone()),
            state,
            _media_dir: media_dir,
        }
    }

    fn db(&self) -> &dyn DatabaseInterface {
        self.state.db.as_ref()
    }

    async fn user(&self, username: &str) -> User {
        self.db().create_user(username).await.unwrap()
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, user: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-remote-user", user);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, user: Option<&str>, body: &str) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = user {
            builder = builder.header("x-remote-user", user);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn object_list(body: &Value) -> &Vec<Value> {
    body["context"]["page_obj"]["object_list"].as_array().unwrap()
}

fn multipart_body(text: &str, filename: &str, image: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n\
             Content-Type: image/gif\r\n\r\n",
            b = BOUNDARY,
            text = text,
            filename = filename,
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[tokio::test]
async fn test_anonymous_mutations_redirect_to_login() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let post = app
        .db()
        .create_post(NewPost::new(author.id, "Hello"))
        .await
        .unwrap();

    let edit = format!("/posts/{}/edit/", post.id);
    let comment = format!("/posts/{}/comment/", post.id);

    let response = app.get("/create/", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/?next=/create/");

    let response = app.post_form("/create/", None, "text=Sneaky").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/login/?next=/create/");

    let response = app.get(&edit, None).await;
    assert_eq!(location(&response), format!("/auth/login/?next={}", edit));

    let response = app.post_form(&comment, None, "text=Hi").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/auth/login/?next={}", comment));

    let response = app.get("/follow/", None).await;
    assert_eq!(location(&response), "/auth/login/?next=/follow/");

    assert_eq!(app.db().count_posts(PostFilter::All).await.unwrap(), 1);
    assert_eq!(app.db().count_comments().await.unwrap(), 0);
}

#[tokio::test]
async fn test_non_author_edit_redirects_to_detail() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    app.user("katya").await;
    let post = app
        .db()
        .create_post(NewPost::new(author.id, "Original"))
        .await
        .unwrap();
    let edit = format!("/posts/{}/edit/", post.id);

    let response = app.get(&edit, Some("katya")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let response = app.post_form(&edit, Some("katya"), "text=Hijacked").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let stored = app.db().get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Original");
}

#[tokio::test]
async fn test_non_author_edit_with_unreadable_body_redirects() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    app.user("mallory").await;
    let post = app
        .db()
        .create_post(NewPost::new(author.id, "Original"))
        .await
        .unwrap();
    let edit = format!("/posts/{}/edit/", post.id);

    let bare = Request::builder()
        .method("POST")
        .uri(edit.as_str())
        .header("x-remote-user", "mallory")
        .body(Body::empty())
        .unwrap();
    let json = Request::builder()
        .method("POST")
        .uri(edit.as_str())
        .header("x-remote-user", "mallory")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text":"Hijacked"}"#))
        .unwrap();

    for request in [bare, json] {
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), format!("/posts/{}/", post.id));
    }

    let stored = app.db().get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Original");
}

#[tokio::test]
async fn test_bare_create_redisplays_form_with_errors() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/create/")
        .header("x-remote-user", "leo")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["template"], "posts/create_post.html");
    assert!(body["context"]["form"]["errors"]["text"].is_array());
    assert_eq!(app.db().count_posts(PostFilter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn test_author_edits_post() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let group = app
        .db()
        .create_group(NewGroup::new("Cats", "cats", "All about cats"))
        .await
        .unwrap();
    let post = app
        .db()
        .create_post(NewPost::new(author.id, "Original"))
        .await
        .unwrap();
    let edit = format!("/posts/{}/edit/", post.id);

    let response = app.get(&edit, Some("leo")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["template"], "posts/create_post.html");
    assert_eq!(body["context"]["is_edit"], true);
    assert_eq!(body["context"]["form"]["fields"]["text"], "Original");

    let form = format!("text=Edited&group={}", group.id);
    let response = app.post_form(&edit, Some("leo"), &form).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/posts/{}/", post.id));

    let stored = app.db().get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Edited");
    assert_eq!(stored.group.map(|g| g.slug), Some("cats".to_string()));

    // Invalid input re-renders the form and keeps the post
    let response = app.post_form(&edit, Some("leo"), "text=").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["context"]["form"]["errors"]["text"].is_array());
    let stored = app.db().get_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Edited");
}

#[tokio::test]
async fn test_listings_paginate_fourteen_posts() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let group = app
        .db()
        .create_group(NewGroup::new("Cats", "cats", "All about cats"))
        .await
        .unwrap();
    for i in 0..14 {
        app.db()
            .create_post(NewPost::new(author.id, format!("Post {}", i)).group(group.id))
            .await
            .unwrap();
    }

    for listing in ["/", "/group/cats/", "/profile/leo/"] {
        let first = json_body(app.get(listing, None).await).await;
        assert_eq!(object_list(&first).len(), 10, "{} page 1", listing);
        assert_eq!(object_list(&first)[0]["text"], "Post 13");

        let second = json_body(app.get(&format!("{}?page=2", listing), None).await).await;
        assert_eq!(object_list(&second).len(), 4, "{} page 2", listing);
        assert_eq!(second["context"]["page_obj"]["number"], 2);
    }

    let profile = json_body(app.get("/profile/leo/", None).await).await;
    assert_eq!(profile["template"], "posts/profile.html");
    assert_eq!(profile["context"]["posts_count"], 14);
    assert_eq!(profile["context"]["author"]["username"], "leo");

    let group_page = json_body(app.get("/group/cats/", None).await).await;
    assert_eq!(group_page["context"]["group"]["title"], "Cats");
}

#[tokio::test]
async fn test_follow_is_unique_and_unfollow_idempotent() {
    let app = TestApp::new().await;
    app.user("leo").await;
    app.user("katya").await;

    let response = app.get("/profile/leo/unfollow/", Some("katya")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");
    assert_eq!(app.db().count_follows().await.unwrap(), 0);

    for _ in 0..2 {
        let response = app.get("/profile/leo/follow/", Some("katya")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/profile/leo/");
    }
    assert_eq!(app.db().count_follows().await.unwrap(), 1);

    let profile = json_body(app.get("/profile/leo/", Some("katya")).await).await;
    assert_eq!(profile["context"]["following"], true);

    let response = app.post_form("/profile/leo/unfollow/", Some("katya"), "").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.db().count_follows().await.unwrap(), 0);

    // Self-follow creates nothing
    app.get("/profile/leo/follow/", Some("leo")).await;
    assert_eq!(app.db().count_follows().await.unwrap(), 0);
}

#[tokio::test]
async fn test_feed_shows_followed_authors_only() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let other = app.user("misha").await;
    app.user("katya").await;
    app.db()
        .create_post(NewPost::new(author.id, "From leo"))
        .await
        .unwrap();
    app.db()
        .create_post(NewPost::new(other.id, "From misha"))
        .await
        .unwrap();

    let feed = json_body(app.get("/follow/", Some("katya")).await).await;
    assert_eq!(feed["template"], "posts/follow.html");
    assert!(object_list(&feed).is_empty());

    app.get("/profile/leo/follow/", Some("katya")).await;
    let feed = json_body(app.get("/follow/", Some("katya")).await).await;
    let texts: Vec<_> = object_list(&feed).iter().map(|p| p["text"].clone()).collect();
    assert_eq!(texts, vec![Value::from("From leo")]);

    app.get("/profile/leo/unfollow/", Some("katya")).await;
    let feed = json_body(app.get("/follow/", Some("katya")).await).await;
    assert!(object_list(&feed).is_empty());
}

#[tokio::test]
async fn test_index_is_stale_until_cache_cleared() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;

    let before = json_body(app.get("/", None).await).await;
    assert!(object_list(&before).is_empty());

    app.db()
        .create_post(NewPost::new(author.id, "Fresh post"))
        .await
        .unwrap();

    let cached = json_body(app.get("/", None).await).await;
    assert!(object_list(&cached).is_empty());

    app.state.cache.clear().await;
    let after = json_body(app.get("/", None).await).await;
    assert_eq!(object_list(&after).len(), 1);
    assert_eq!(object_list(&after)[0]["text"], "Fresh post");
}

#[tokio::test]
async fn test_created_post_with_image_round_trips() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/create/")
        .header("x-remote-user", "leo")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("Picture post", "small.gif", SMALL_GIF)))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");

    let posts = app.db().list_posts(PostFilter::All, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].image.as_deref(), Some("posts/small.gif"));

    let detail = json_body(app.get(&format!("/posts/{}/", posts[0].id), None).await).await;
    assert_eq!(detail["template"], "posts/post_detail.html");
    assert_eq!(detail["context"]["post"]["text"], "Picture post");
    let url = detail["context"]["post"]["image"]["url"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(url, "/media/posts/small.gif");

    let response = app.get(&url, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], SMALL_GIF);
}

#[tokio::test]
async fn test_create_post_validation() {
    let app = TestApp::new().await;

    let response = app.get("/create/", Some("leo")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["context"]["is_edit"], false);
    assert!(body["context"]["groups"].is_array());

    let response = app.post_form("/create/", Some("leo"), "text=&group=42").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["context"]["form"]["errors"]["text"].is_array());
    assert!(body["context"]["form"]["errors"]["group"].is_array());
    assert_eq!(app.db().count_posts(PostFilter::All).await.unwrap(), 0);

    let response = app.post_form("/create/", Some("leo"), "text=Hello+world").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/profile/leo/");
    assert_eq!(app.db().count_posts(PostFilter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_comments_are_added_and_listed() {
    let app = TestApp::new().await;
    let author = app.user("leo").await;
    let post = app
        .db()
        .create_post(NewPost::new(author.id, "Discuss"))
        .await
        .unwrap();
    let comment = format!("/posts/{}/comment/", post.id);
    let detail = format!("/posts/{}/", post.id);

    let response = app.post_form(&comment, Some("katya"), "text=Nice+post").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), detail);

    // Empty comment and GET both redirect without writing
    let response = app.post_form(&comment, Some("katya"), "text=").await;
    assert_eq!(location(&response), detail);
    let response = app.get(&comment, Some("katya")).await;
    assert_eq!(location(&response), detail);
    assert_eq!(app.db().count_comments().await.unwrap(), 1);

    let body = json_body(app.get(&detail, None).await).await;
    let comments = body["context"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Nice post");
    assert_eq!(comments[0]["author"]["username"], "katya");
    assert_eq!(body["context"]["posts_count"], 1);
}

#[tokio::test]
async fn test_missing_entities_are_not_found() {
    let app = TestApp::new().await;
    app.user("leo").await;

    for uri in [
        "/group/missing/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
        "/unexisting_page/",
    ] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let response = app.get("/profile/nobody/follow/", Some("leo")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.get("/posts/999/edit/", Some("leo")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
