use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Client;
use serde_json::Value;

#[derive(Parser, Debug)]
struct Args {
    /// Local URL/Port to use for requests
    /// Ex: http://0.0.0.0:3030
    #[arg(long)]
    local_url: String,

    /// User whose feed is walked
    #[arg(long, default_value_t = 1)]
    user: i64,

    /// Page size
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

/// Walks a user's feed page by page and fails if a post shows up twice.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = Client::new();
    let url = format!("{}/users/{}/feed", args.local_url, args.user);

    let mut seen = HashSet::new();
    let mut cursor: Option<u64> = None;
    let mut page_number = 1;

    loop {
        let mut request = client.get(&url).query(&[("limit", args.limit.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor.to_string())]);
        }
        let response = request.send().await.context("Feed request failed")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read feed response text")?;
        let page: Value = serde_json::from_str(&body).context("Failed to parse feed JSON")?;

        if !status.is_success() {
            bail!("Feed request returned {status}: {page}");
        }

        let ids: Vec<i64> = page["posts"]
            .as_array()
            .context("posts not found")?
            .iter()
            .filter_map(|post| post["id"].as_i64())
            .collect();
        println!("Page {page_number} (cursor {cursor:?}): {ids:?}");

        for id in &ids {
            if !seen.insert(*id) {
                bail!("Post {id} was delivered twice");
            }
        }

        match page["nextCursor"].as_u64() {
            Some(next) => cursor = Some(next),
            None => break,
        }
        page_number += 1;
    }

    println!("Walked {} posts without duplicates", seen.len());
    Ok(())
}
