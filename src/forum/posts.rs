//! Post history page scraping.
//!
//! A history page lists a user's posts newest first, each in its own table:
//! the first row holds the topic link and the `on: <date>` cell, a later row
//! holds the `div.post` body.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::ForumError;
use crate::parser::dates::{EXPLICIT_PATTERN, TIME_PATTERN};
use crate::parser::ForumTimestamp;

static POST_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#bodyarea div.post").expect("Invalid selector"));

static EXPLICIT_POSTED_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^on: (?P<datetime>{EXPLICIT_PATTERN})")).expect("Invalid regex")
});

static TODAY_POSTED_ON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^on: Today at (?P<time>{TIME_PATTERN})")).expect("Invalid regex")
});

/// A post as listed on a history page, body not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSummary {
    pub link: String,
    pub posted_at: DateTime<Utc>,
    /// Outer HTML of the `div.post` element.
    pub body_html: String,
}

/// Extract every post listed on a history page, in page order.
///
/// # Errors
///
/// Returns [`ForumError::IncompletePost`] if a post lacks its link or date,
/// and [`ForumError::InvalidPostDate`] if the date cannot be read.
pub fn parse_posts_page(html: &str, today: NaiveDate) -> Result<Vec<PostSummary>, ForumError> {
    let document = Html::parse_document(html);
    document
        .select(&POST_SELECTOR)
        .map(|post| summarize(post, today))
        .collect()
}

fn summarize(post: ElementRef<'_>, today: NaiveDate) -> Result<PostSummary, ForumError> {
    let table = post
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "table")
        .ok_or(ForumError::IncompletePost("table"))?;
    let header_row = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "tr")
        .ok_or(ForumError::IncompletePost("header row"))?;
    let cells: Vec<ElementRef<'_>> = header_row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .collect();

    let link = cells
        .get(1)
        .and_then(|cell| {
            cell.descendants()
                .filter_map(ElementRef::wrap)
                .filter(|element| element.value().name() == "a")
                .last()
        })
        .and_then(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.is_empty())
        .ok_or(ForumError::IncompletePost("link"))?;

    let date_text = cells
        .get(2)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ForumError::IncompletePost("date"))?;

    Ok(PostSummary {
        link: link.to_string(),
        posted_at: parse_posted_on(&date_text, today)?,
        body_html: post.html(),
    })
}

/// Parse the `on: ...` cell of a history page entry.
///
/// # Errors
///
/// Returns [`ForumError::InvalidPostDate`] if neither timestamp form matches
/// or the matched timestamp is not a real date.
pub fn parse_posted_on(text: &str, today: NaiveDate) -> Result<DateTime<Utc>, ForumError> {
    let timestamp = if let Some(caps) = EXPLICIT_POSTED_ON.captures(text) {
        ForumTimestamp::Explicit(caps.name("datetime").map_or("", |m| m.as_str()))
    } else if let Some(caps) = TODAY_POSTED_ON.captures(text) {
        ForumTimestamp::Today(caps.name("time").map_or("", |m| m.as_str()))
    } else {
        return Err(ForumError::InvalidPostDate {
            value: text.to_string(),
            source: None,
        });
    };

    timestamp
        .resolve(today)
        .map_err(|source| ForumError::InvalidPostDate {
            value: text.to_string(),
            source: Some(source),
        })
}
