use std::convert::Infallible;
use std::sync::Arc;

use log::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::Config;
use crate::models::{ErrorBody, FeedQuery, UserId};
use crate::{FeedError, MixedPosts, PostSource};

/// The feed API: `GET /users/{user_id}/feed?cursor=<u64>&limit=<usize>`.
///
/// Replies with a JSON `FeedPage`, or with `{"error": ...}` and a 400, 404 or 503 status.
pub fn routes<S>(
    feed: Arc<MixedPosts<S>>,
    config: Config,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone
where
    S: PostSource + Send + Sync + 'static,
{
    warp::path!("users" / UserId / "feed")
        .and(warp::get())
        .and(warp::query::<FeedQuery>())
        .and(warp::any().map(move || feed.clone()))
        .and(warp::any().map(move || config.clone()))
        .and_then(get_feed::<S>)
        .recover(handle_rejection)
}

/// Binds `config.address` and serves the feed API until the process exits.
///
/// # Panics
///
/// Panics if unable to bind to the configured address.
pub async fn serve<S>(source: S, config: Config)
where
    S: PostSource + Send + Sync + 'static,
{
    let address = config.address;
    let api = routes(Arc::new(MixedPosts::new(source)), config).with(warp::log::custom(|info| {
        let method = info.method();
        let path = info.path();
        let status = info.status();
        let elapsed = info.elapsed().as_millis();

        if status.is_success() {
            info!(
                "Method: {}, Path: {}, Status: {}, Elapsed Time: {}ms",
                method, path, status, elapsed
            );
        } else {
            error!(
                "Method: {}, Path: {}, Status: {}, Elapsed Time: {}ms",
                method, path, status, elapsed,
            );
        }
    }));

    info!("Serving feed on {address}");
    warp::serve(api).run(address).await
}

async fn get_feed<S>(
    user_id: UserId,
    query: FeedQuery,
    feed: Arc<MixedPosts<S>>,
    config: Config,
) -> Result<impl Reply, Rejection>
where
    S: PostSource + Send + Sync,
{
    let limit = query.limit.unwrap_or(config.default_page_size);
    if limit == 0 || limit > config.max_page_size {
        return Err(warp::reject::custom(FeedError::invalid(format!(
            "limit must be between 1 and {}",
            config.max_page_size
        ))));
    }

    let page = feed
        .get_mixed_feed_posts(user_id, query.cursor, limit)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&page))
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(err) = rejection.find::<FeedError>() {
        if let FeedError::SourceUnavailable(cause) = err {
            error!("Post source failed: {cause}");
        }
        (err.status(), err.to_string())
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "invalid argument: cursor and limit must be non-negative integers".to_owned(),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_owned())
    } else if rejection
        .find::<warp::reject::MethodNotAllowed>()
        .is_some()
    {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_owned())
    } else {
        error!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_owned(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: message }),
        status,
    ))
}
