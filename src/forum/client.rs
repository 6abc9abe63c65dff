use async_trait::async_trait;
use chrono::{Local, Utc};
use tracing::{debug, info, warn};

use super::pacer::RequestPacer;
use super::posts::parse_posts_page;
use super::profile::parse_profile;
use super::{ForumError, ForumSource, PostRecord, PostWindow, Profile};
use crate::config::Config;
use crate::parser::{format_utc, PostContentParser};

/// HTTP client for the forum's profile and post history pages.
#[derive(Debug)]
pub struct ForumClient {
    http: reqwest::Client,
    base_url: String,
    pacer: RequestPacer,
    posts_per_page: usize,
    max_pages: usize,
}

impl ForumClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, ForumError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ForumError::Client)?;

        Ok(Self {
            http,
            base_url: config.forum_base_url.trim_end_matches('?').to_string(),
            pacer: RequestPacer::new(config.request_delay),
            posts_per_page: config.posts_per_page,
            max_pages: config.max_history_pages,
        })
    }

    fn profile_url(&self, uid: u64) -> String {
        format!("{}?action=profile;u={uid}", self.base_url)
    }

    fn posts_url(&self, uid: u64, start: usize) -> String {
        format!(
            "{}?action=profile;u={uid};sa=showPosts;start={start}",
            self.base_url
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<String, ForumError> {
        self.pacer.wait().await;
        debug!(url = %url, "Fetching forum page");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ForumError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForumError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| ForumError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ForumSource for ForumClient {
    async fn fetch_profile(&self, uid: u64) -> Result<Profile, ForumError> {
        let html = self.fetch_page(&self.profile_url(uid)).await?;
        let profile = parse_profile(&html, uid)?;
        info!(uid, name = %profile.name, "Fetched forum profile");
        Ok(profile)
    }

    async fn fetch_posts(
        &self,
        uid: u64,
        window: PostWindow,
    ) -> Result<Vec<PostRecord>, ForumError> {
        if window.since > Utc::now() {
            return Err(ForumError::StartInFuture(window.since));
        }

        let parser = PostContentParser::with_today(Local::now().date_naive());
        let mut records = Vec::new();

        for page in 0..self.max_pages {
            let start = page * self.posts_per_page;
            let html = self.fetch_page(&self.posts_url(uid, start)).await?;
            let summaries = parse_posts_page(&html, parser.today())?;

            if summaries.is_empty() {
                debug!(uid, start, "No more posts in history");
                return Ok(records);
            }

            for summary in summaries {
                if summary.posted_at < window.since {
                    debug!(uid, link = %summary.link, "Reached post older than window start");
                    return Ok(records);
                }
                if !window.contains(summary.posted_at) {
                    continue;
                }

                let content = parser
                    .parse_post_content(&summary.body_html)
                    .map_err(|source| ForumError::Content {
                        link: summary.link.clone(),
                        source,
                    })?;
                records.push(PostRecord {
                    content,
                    datetime_utc: format_utc(&summary.posted_at),
                    link: summary.link,
                });
            }
        }

        warn!(
            uid,
            max_pages = self.max_pages,
            "Stopped post collection at page limit"
        );
        Ok(records)
    }
}
