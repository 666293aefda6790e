use yatube::{
    config::Config,
    entities::{NewComment, NewGroup, NewPost},
    error::AppResult,
    infrastructure::{database::DatabaseInterface, sqlite_database::SqliteDatabase},
};

#[tokio::main]
async fn main() -> AppResult<()> {
    let config = Config::from_env()?;

    println!("🚀 Generating demo data for Yatube");
    println!("Initializing database at {}", config.database.url);
    let database = SqliteDatabase::connect(&config.database.url).await?;
    let db: &dyn DatabaseInterface = &database;

    // Groups
    let sample_groups = vec![
        ("Cats", "cats", "Pictures and stories about cats"),
        ("Travel", "travel", "Notes from the road"),
        ("Books", "books", "What we are reading"),
    ];

    println!("\n📚 Creating {} groups...", sample_groups.len());
    let mut group_ids = Vec::new();
    for (title, slug, description) in sample_groups {
        let group = match db.get_group_by_slug(slug).await? {
            Some(existing) => existing,
            None => db.create_group(NewGroup::new(title, slug, description)).await?,
        };
        group_ids.push(group.id);
        println!("  ✓ Group '{}' with ID: {}", group.title, group.id);
    }

    // Users
    let sample_users = vec!["leo", "katya", "misha", "anna", "oleg"];

    println!("\n👥 Creating {} users...", sample_users.len());
    let mut users = Vec::new();
    for username in sample_users {
        let user = match db.get_user_by_username(username).await? {
            Some(existing) => existing,
            None => db.create_user(username).await?,
        };
        println!("  ✓ User '{}' with ID: {}", user.username, user.id);
        users.push(user);
    }

    // Posts, spread over groups; every third post has no group
    println!("\n📝 Creating sample posts...");
    let mut post_ids = Vec::new();
    for i in 0..24 {
        let author = &users[i % users.len()];
        let mut new_post = NewPost::new(
            author.id,
            format!("Demo post number {} written by {}", i + 1, author.username),
        );
        if i % 3 != 0 {
            new_post = new_post.group(group_ids[i % group_ids.len()]);
        }
        let post = db.create_post(new_post).await?;
        post_ids.push(post.id);
    }
    println!("  ✓ Created {} posts", post_ids.len());

    // Comments
    println!("\n💬 Creating comments...");
    for (i, post_id) in post_ids.iter().enumerate().step_by(2) {
        let author = &users[(i + 1) % users.len()];
        db.create_comment(NewComment {
            post_id: *post_id,
            author_id: author.id,
            text: format!("Nice one! ({})", author.username),
        })
        .await?;
    }
    println!("  ✓ {} comments stored", db.count_comments().await?);

    // Follows (unidirectional)
    println!("\n🤝 Creating follows...");
    let follows = vec![(0, 1), (0, 2), (1, 0), (2, 3), (3, 4), (4, 0)];
    for (from_idx, to_idx) in follows {
        let (follower, author) = (&users[from_idx], &users[to_idx]);
        if db.follow_exists(follower.id, author.id).await? {
            continue;
        }
        db.create_follow(follower.id, author.id).await?;
        println!("  ✓ {} -> {}", follower.username, author.username);
    }

    println!("\n✅ Demo data ready");
    Ok(())
}
