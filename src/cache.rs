//! Collection-keyed caching of rendered list payloads.
//!
//! Every create/update/delete of a post or comment (and every like edge
//! mutation, since rendered payloads embed like counts) must drop the
//! affected collection from the cache before the handler reports success.
//! Keys carry the viewer's identity so per-viewer fields (`liked`) never
//! leak between actors.

use moka::future::Cache;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schemas::CachedData;

/// Entity collections that are cached and invalidated as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Posts,
    Comments,
}

impl Collection {
    fn prefix(self) -> &'static str {
        match self {
            Collection::Posts => "posts:",
            Collection::Comments => "comments:",
        }
    }
}

fn viewer_key(viewer: Option<Uuid>) -> String {
    viewer
        .map(|v| v.to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Cache key for the post list rendered for `viewer`.
pub fn post_list_key(
    viewer: Option<Uuid>,
    author_filter: Option<Uuid>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> String {
    format!(
        "posts:{}:{}:{}:{}",
        viewer_key(viewer),
        author_filter.map(|a| a.to_string()).unwrap_or_default(),
        limit.map(|l| l.to_string()).unwrap_or_default(),
        offset.map(|o| o.to_string()).unwrap_or_default(),
    )
}

/// Cache key for the comment list of `post` rendered for `viewer`.
pub fn comment_list_key(viewer: Option<Uuid>, post: Uuid) -> String {
    format!("comments:{}:{}", viewer_key(viewer), post)
}

/// Drop every cached payload belonging to `collection`.
///
/// Called synchronously from mutation handlers before they return. A
/// failure here means the cache can no longer be trusted to match the
/// store, so it surfaces to the caller instead of being ignored.
pub fn invalidate(
    cache: &Cache<String, CachedData>,
    collection: Collection,
) -> Result<(), ApiError> {
    let prefix = collection.prefix();
    cache
        .invalidate_entries_if(move |key, _| key.starts_with(prefix))
        .map_err(|e| {
            ApiError::Conflict(format!(
                "cache invalidation for {:?} failed: {}",
                collection, e
            ))
        })?;
    Ok(())
}
