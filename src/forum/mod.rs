//! Access to the forum: profiles and post history.
//!
//! [`ForumSource`] is the seam campaign commands depend on; [`ForumClient`]
//! implements it over HTTP and scrapes the returned pages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::{ParseError, ParsedPost};

pub mod client;
pub mod pacer;
pub mod posts;
pub mod profile;

pub use client::ForumClient;
pub use pacer::RequestPacer;

#[derive(Debug, Error)]
pub enum ForumError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("profile {uid} is missing fields: {}", .missing.join(", "))]
    MissingProfileFields {
        uid: u64,
        missing: Vec<&'static str>,
    },
    #[error("profile {uid} has a non-numeric {field}: '{value}'")]
    InvalidNumber {
        uid: u64,
        field: &'static str,
        value: String,
    },
    #[error("post on the history page is missing its {0}")]
    IncompletePost(&'static str),
    #[error("could not parse post date '{value}'")]
    InvalidPostDate {
        value: String,
        #[source]
        source: Option<ParseError>,
    },
    #[error("start of the window ({0}) is in the future")]
    StartInFuture(DateTime<Utc>),
    #[error("failed to parse content of post {link}: {source}")]
    Content {
        link: String,
        #[source]
        source: ParseError,
    },
}

/// Public profile figures of a forum user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: u64,
    pub name: String,
    pub post_count: i64,
    pub activity: i64,
    pub merit: i64,
    pub rank: String,
}

/// One collected post, as persisted for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub content: ParsedPost,
    pub datetime_utc: String,
    pub link: String,
}

/// Time window for post collection. `until` is open-ended when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostWindow {
    pub since: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

impl PostWindow {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.since && self.until.is_none_or(|until| at <= until)
    }
}

/// Source of forum data.
#[async_trait]
pub trait ForumSource: Send + Sync {
    /// Fetch the public profile of `uid`.
    async fn fetch_profile(&self, uid: u64) -> Result<Profile, ForumError>;

    /// Fetch every post by `uid` inside `window`, newest first.
    async fn fetch_posts(&self, uid: u64, window: PostWindow)
        -> Result<Vec<PostRecord>, ForumError>;
}
