use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use mixfeed::{SqlitePostSource, User};

#[derive(Parser, Debug)]
struct Args {
    /// SQLite database to write the sample data to
    #[arg(long, default_value = "feed.db")]
    database: String,
}

/// User 1 writes posts 1-6 and likes posts 7-10, written by users 2 and 3.
/// Their mixed feed reads 6, 10, 5, 9, 4, 8, 3, 7, 2, 1.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("Opening {}...", args.database);
    let source = SqlitePostSource::open(&args.database)?;
    source.initialize_db().await?;

    for (id, username, full_name) in [
        (1, "johnkennedy", "John Kennedy"),
        (2, "paulwasher", "Paul Washer"),
        (3, "ronaldkey", "Ronald Key"),
    ] {
        source
            .insert_user(&User {
                id,
                username: username.to_owned(),
                full_name: full_name.to_owned(),
                profile_picture: None,
            })
            .await?;
    }

    let now = Utc::now();
    for (id, owner) in [
        (1, 1),
        (2, 1),
        (3, 1),
        (4, 1),
        (5, 1),
        (6, 1),
        (7, 2),
        (8, 2),
        (9, 3),
        (10, 3),
    ] {
        source
            .insert_post(id, owner, &format!("post {id}"), None, now)
            .await?;
    }

    for post_id in 7..=10 {
        source.like_post(1, post_id).await?;
    }

    println!("Seeded 3 users, 10 posts and 4 likes");
    Ok(())
}
