use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use tracing::debug;

use super::dates::{format_utc, ForumTimestamp, EXPLICIT_PATTERN, TIME_PATTERN};
use super::walker::has_class;
use super::{ParseError, PostContentParser, Quote, QuoteAttribution};

/// `Quote from: <username> on January 05, 2023, 03:04:05 PM`
static EXPLICIT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^Quote from: (?P<username>[\w ]{{0,25}}) on (?P<datetime>{EXPLICIT_PATTERN})"
    ))
    .expect("Invalid explicit quote header regex")
});

/// `Quote from: <username> on Today at 03:04:05 PM`
static TODAY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^Quote from: (?P<username>[\w ]{{0,25}}) on Today at (?P<time>{TIME_PATTERN})"
    ))
    .expect("Invalid today quote header regex")
});

impl PostContentParser {
    /// Build a quote from its header element and the quote body that follows it.
    pub(super) fn process_quote(&self, header: ElementRef<'_>) -> Result<Quote, ParseError> {
        let header_text = header_text(header);

        let Some(body) = quote_body(header) else {
            debug!(header = %header_text, "Quote header not followed by a quote body");
            return Ok(Quote::body_missing(header_text));
        };

        let attribution = match header_link(header) {
            Some(url) => match self.attribute(&header_text)? {
                Some((username, datetime_utc)) => QuoteAttribution::Attributed {
                    url,
                    username,
                    datetime_utc,
                },
                None => QuoteAttribution::Unattributed {
                    url: Some(url),
                    header: header_text,
                },
            },
            None => QuoteAttribution::Unattributed {
                url: None,
                header: header_text,
            },
        };

        let (children, errors) = self.process_children(body)?;
        Ok(Quote {
            attribution,
            children,
            errors,
        })
    }

    /// Match the header against the explicit-date grammar, then the `Today`
    /// grammar. Returns `(username, datetime_utc)` on a match.
    fn attribute(&self, header: &str) -> Result<Option<(String, String)>, ParseError> {
        let (username, timestamp) = if let Some(caps) = EXPLICIT_HEADER.captures(header) {
            let datetime = caps.name("datetime").map_or("", |m| m.as_str());
            (caps["username"].to_string(), ForumTimestamp::Explicit(datetime))
        } else if let Some(caps) = TODAY_HEADER.captures(header) {
            let time = caps.name("time").map_or("", |m| m.as_str());
            (caps["username"].to_string(), ForumTimestamp::Today(time))
        } else {
            return Ok(None);
        };

        let datetime = timestamp.resolve(self.today)?;
        Ok(Some((username, format_utc(&datetime))))
    }
}

/// All descendant text of the header, each run trimmed, joined by spaces.
fn header_text(header: ElementRef<'_>) -> String {
    header
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The node right after the header, if it is a quote body.
fn quote_body(header: ElementRef<'_>) -> Option<ElementRef<'_>> {
    header
        .next_sibling()
        .and_then(ElementRef::wrap)
        .filter(|sibling| has_class(*sibling, "quote"))
}

/// The non-empty href of the first anchor in the header.
fn header_link(header: ElementRef<'_>) -> Option<String> {
    header
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "a")
        .and_then(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}
