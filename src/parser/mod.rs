//! Post body parsing.
//!
//! Turns the markup of one forum post into a [`ParsedPost`]: an ordered tree
//! of text, links, images and nested quotes. Malformed quotes are recorded as
//! data in the tree instead of failing the parse; only timestamps that look
//! right but cannot exist, or input without a post container, are fatal.

mod content;
pub mod dates;
mod quote;
mod walker;

use chrono::{Local, NaiveDate};
use scraper::{ElementRef, Html};
use thiserror::Error;

pub use content::{ContentNode, ParsedPost, Quote, QuoteAttribution, QUOTE_BODY_MISSING};
pub use dates::{format_utc, ForumTimestamp};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("post markup has no container element")]
    MissingContainer,
    #[error("invalid forum timestamp '{value}': {source}")]
    InvalidDatetime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parser for post bodies.
///
/// Holds the calendar date used to resolve `Today at ...` timestamps, so a
/// parser is cheap to copy and safe to share between tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostContentParser {
    today: NaiveDate,
}

impl Default for PostContentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PostContentParser {
    /// Create a parser that resolves `Today` to the current local date.
    #[must_use]
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    #[must_use]
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Parse a post body fragment. The first `div` in the fragment is taken
    /// as the post container.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingContainer`] if the fragment has no `div`,
    /// and [`ParseError::InvalidDatetime`] if a quote header carries an
    /// impossible timestamp.
    pub fn parse_post_content(&self, html: &str) -> Result<ParsedPost, ParseError> {
        let fragment = Html::parse_fragment(html);
        let container = fragment
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "div")
            .ok_or(ParseError::MissingContainer)?;
        self.process_post(container)
    }

    /// Parse an already materialized post container element.
    ///
    /// # Errors
    ///
    /// See [`PostContentParser::parse_post_content`].
    pub fn process_post(&self, post: ElementRef<'_>) -> Result<ParsedPost, ParseError> {
        let (children, errors) = self.process_children(post)?;
        Ok(ParsedPost { children, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PostContentParser {
        PostContentParser::with_today(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn parse(html: &str) -> ParsedPost {
        parser().parse_post_content(html).unwrap()
    }

    fn texts(nodes: &[ContentNode]) -> String {
        nodes
            .iter()
            .filter_map(|node| match node {
                ContentNode::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    fn only_quote(post: &ParsedPost) -> &Quote {
        let quotes: Vec<&Quote> = post.children.iter().filter_map(ContentNode::as_quote).collect();
        assert_eq!(quotes.len(), 1, "expected exactly one quote in {post:?}");
        quotes[0]
    }

    const QUOTE_URL: &str = "https://bitcointalk.org/index.php?topic=5.msg10#msg10";

    fn quote_markup(header_text: &str, body: &str) -> String {
        format!(
            r#"<div class="quoteheader"><a href="{QUOTE_URL}">{header_text}</a></div><div class="quote">{body}</div>"#
        )
    }

    #[test]
    fn test_plain_text_and_breaks() {
        let post = parse(r#"<div class="post">Hello<br>world<br/>again</div>"#);
        assert_eq!(
            post.children,
            vec![
                ContentNode::text("Hello"),
                ContentNode::text("\n\n"),
                ContentNode::text("world"),
                ContentNode::text("\n\n"),
                ContentNode::text("again"),
            ]
        );
        assert!(post.errors.is_empty());
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let post = parse("<div>  spaced\tout  ünïcödé ✓ </div>");
        assert_eq!(post.children, vec![ContentNode::text("  spaced\tout  ünïcödé ✓ ")]);
    }

    #[test]
    fn test_order_preserved_across_node_kinds() {
        let post = parse(
            r#"<div>one <a href="https://a.example">x</a> two <img src="https://i.example/p.png"> three<br>four</div>"#,
        );
        assert_eq!(
            post.children,
            vec![
                ContentNode::text("one "),
                ContentNode::Link {
                    url: Some("https://a.example".to_string())
                },
                ContentNode::text(" two "),
                ContentNode::Image {
                    src: Some("https://i.example/p.png".to_string())
                },
                ContentNode::text(" three"),
                ContentNode::text("\n\n"),
                ContentNode::text("four"),
            ]
        );
        assert_eq!(texts(&post.children), "one  two  three\n\nfour");
    }

    #[test]
    fn test_missing_href_and_src_are_absent_not_dropped() {
        let post = parse("<div><a>no link</a><img alt=\"x\"></div>");
        assert_eq!(
            post.children,
            vec![ContentNode::Link { url: None }, ContentNode::Image { src: None }]
        );
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let post = parse("<div>a<b>bold</b><span>s</span><!-- c -->z</div>");
        assert_eq!(post.children, vec![ContentNode::text("a"), ContentNode::text("z")]);
    }

    #[test]
    fn test_missing_container_is_fatal() {
        let err = parser().parse_post_content("just text, no container").unwrap_err();
        assert!(matches!(err, ParseError::MissingContainer));
    }

    #[test]
    fn test_first_div_is_the_container() {
        let post = parse("<p>outside</p><div>inside</div><div>second</div>");
        assert_eq!(post.children, vec![ContentNode::text("inside")]);
    }

    #[test]
    fn test_explicit_date_quote() {
        let html = format!(
            "<div>{}reply</div>",
            quote_markup("Quote from: alice on January 05, 2023, 03:04:05 PM", "quoted text")
        );
        let post = parse(&html);
        let quote = only_quote(&post);

        assert_eq!(quote.username(), Some("alice"));
        assert_eq!(quote.datetime_utc(), Some("2023-01-05T15:04:05Z"));
        assert_eq!(quote.url(), Some(QUOTE_URL));
        assert!(quote.header().is_none());
        assert_eq!(quote.children, vec![ContentNode::text("quoted text")]);
        assert!(quote.errors.is_empty());
        assert_eq!(post.children.last(), Some(&ContentNode::text("reply")));
        assert!(post.errors.is_empty());
    }

    #[test]
    fn test_today_quote_uses_parser_date() {
        let html = format!(
            "<div>{}</div>",
            quote_markup("Quote from: bob on Today at 09:00:00 AM", "hi")
        );
        let post = parse(&html);
        let quote = only_quote(&post);

        assert_eq!(quote.username(), Some("bob"));
        assert_eq!(quote.datetime_utc(), Some("2024-06-01T09:00:00Z"));
    }

    #[test]
    fn test_header_text_is_joined_from_stripped_strings() {
        // The forum bolds "Today", which splits the header into several text nodes.
        let html = format!(
            r#"<div><div class="quoteheader"><a href="{QUOTE_URL}">Quote from: bob on <b>Today</b> at 09:00:00 AM</a></div><div class="quote">x</div></div>"#
        );
        let post = parse(&html);
        let quote = only_quote(&post);
        assert_eq!(quote.username(), Some("bob"));
        assert_eq!(quote.datetime_utc(), Some("2024-06-01T09:00:00Z"));
    }

    #[test]
    fn test_quote_without_body() {
        let html = format!(
            r#"<div><div class="quoteheader"><a href="{QUOTE_URL}">  Quote from: carol   on January 05, 2023, 03:04:05 PM </a></div>after</div>"#
        );
        let post = parse(&html);
        let quote = only_quote(&post);

        assert_eq!(quote.errors, vec![QUOTE_BODY_MISSING.to_string()]);
        assert_eq!(
            quote.header(),
            Some("Quote from: carol   on January 05, 2023, 03:04:05 PM")
        );
        assert!(quote.children.is_empty());
        assert!(quote.url().is_none());
        assert!(quote.username().is_none());
        assert_eq!(post.errors, vec![QUOTE_BODY_MISSING.to_string()]);
        assert_eq!(post.children.last(), Some(&ContentNode::text("after")));
    }

    #[test]
    fn test_quote_header_last_child_has_no_body() {
        let post = parse(r#"<div><div class="quoteheader">Quote</div></div>"#);
        let quote = only_quote(&post);
        assert!(matches!(
            quote.attribution,
            QuoteAttribution::BodyMissing { .. }
        ));
    }

    #[test]
    fn test_sibling_without_quote_class_is_not_a_body() {
        let post = parse(
            r#"<div><div class="quoteheader">Quote</div><div class="code">x</div></div>"#,
        );
        let quote = only_quote(&post);
        assert_eq!(quote.errors, vec![QUOTE_BODY_MISSING.to_string()]);
    }

    #[test]
    fn test_unattributed_header_is_not_an_error() {
        let html = format!("<div>{}</div>", quote_markup("Some random header", "body"));
        let post = parse(&html);
        let quote = only_quote(&post);

        assert_eq!(quote.header(), Some("Some random header"));
        assert_eq!(quote.url(), Some(QUOTE_URL));
        assert!(quote.username().is_none());
        assert!(quote.datetime_utc().is_none());
        assert!(quote.errors.is_empty());
        assert_eq!(quote.children, vec![ContentNode::text("body")]);
        assert!(post.errors.is_empty());
    }

    #[test]
    fn test_header_without_anchor_is_unattributed() {
        let post = parse(
            r#"<div><div class="quoteheader">Quote from: alice on January 05, 2023, 03:04:05 PM</div><div class="quote">b</div></div>"#,
        );
        let quote = only_quote(&post);
        assert_eq!(
            quote.attribution,
            QuoteAttribution::Unattributed {
                url: None,
                header: "Quote from: alice on January 05, 2023, 03:04:05 PM".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_href_is_unattributed() {
        let post = parse(
            r#"<div><div class="quoteheader"><a href="">Quote from: alice on January 05, 2023, 03:04:05 PM</a></div><div class="quote">b</div></div>"#,
        );
        let quote = only_quote(&post);
        assert!(quote.url().is_none());
        assert!(quote.username().is_none());
        assert!(quote.header().is_some());
    }

    #[test]
    fn test_long_username_falls_back_to_header() {
        let name = "a".repeat(26);
        let header = format!("Quote from: {name} on January 05, 2023, 03:04:05 PM");
        let html = format!("<div>{}</div>", quote_markup(&header, "b"));
        let post = parse(&html);
        let quote = only_quote(&post);
        assert_eq!(quote.header(), Some(header.as_str()));
        assert!(quote.username().is_none());
    }

    #[test]
    fn test_username_with_spaces_and_max_length() {
        let name = "Satoshi Nakamoto 1234567";
        assert!(name.len() <= 25);
        let header = format!("Quote from: {name} on February 29, 2024, 11:59:59 PM");
        let html = format!("<div>{}</div>", quote_markup(&header, "b"));
        let post = parse(&html);
        let quote = only_quote(&post);
        assert_eq!(quote.username(), Some(name));
        assert_eq!(quote.datetime_utc(), Some("2024-02-29T23:59:59Z"));
    }

    #[test]
    fn test_symbol_username_falls_back_to_header() {
        let html = format!(
            "<div>{}</div>",
            quote_markup("Quote from: al.ice on January 05, 2023, 03:04:05 PM", "b")
        );
        let post = parse(&html);
        let quote = only_quote(&post);
        assert!(quote.username().is_none());
        assert!(quote.header().is_some());
    }

    #[test]
    fn test_impossible_quote_date_is_fatal() {
        let html = format!(
            "<div>{}</div>",
            quote_markup("Quote from: alice on January 32, 2023, 03:04:05 PM", "b")
        );
        let err = parser().parse_post_content(&html).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDatetime { .. }));
    }

    #[test]
    fn test_nested_quotes_recurse() {
        let inner = quote_markup("Quote from: bob on January 01, 2023, 01:00:00 AM", "innermost");
        let outer = quote_markup(
            "Quote from: alice on January 02, 2023, 02:00:00 PM",
            &format!("{inner}middle"),
        );
        let post = parse(&format!("<div>{outer}top</div>"));
        let outer = only_quote(&post);

        assert_eq!(outer.username(), Some("alice"));
        assert_eq!(outer.children.len(), 2);
        let inner = outer.children[0].as_quote().unwrap();
        assert_eq!(inner.username(), Some("bob"));
        assert_eq!(inner.datetime_utc(), Some("2023-01-01T01:00:00Z"));
        assert_eq!(inner.children, vec![ContentNode::text("innermost")]);
        assert_eq!(outer.children[1], ContentNode::text("middle"));
    }

    #[test]
    fn test_nested_quote_error_propagates() {
        let outer_body = r#"before<div class="quoteheader">Quote from: ghost</div>after"#;
        let html = format!("<div>{}</div>", quote_markup("Some random header", outer_body));
        let post = parse(&html);
        let outer = only_quote(&post);

        assert_eq!(outer.errors, vec![QUOTE_BODY_MISSING.to_string()]);
        let inner = outer
            .children
            .iter()
            .find_map(ContentNode::as_quote)
            .expect("inner quote kept");
        assert_eq!(inner.header(), Some("Quote from: ghost"));
        assert_eq!(inner.errors, vec![QUOTE_BODY_MISSING.to_string()]);
        assert_eq!(post.errors, vec![QUOTE_BODY_MISSING.to_string()]);
    }

    #[test]
    fn test_quote_body_without_adjacent_header_is_skipped() {
        // The header is followed by text, so it has no body, and the quote div
        // after the text has nothing introducing it.
        let html = r#"<div><div class="quoteheader">first</div>x<div class="quote"><div class="quoteheader">second</div></div></div>"#;
        let post = parse(html);
        assert_eq!(post.errors, vec![QUOTE_BODY_MISSING.to_string()]);
        assert_eq!(only_quote(&post).header(), Some("first"));
        assert_eq!(post.children.len(), 2);
    }

    #[test]
    fn test_errors_from_all_depths_reach_the_post() {
        let nested = r#"<div class="quoteheader">inner</div>"#;
        let html = format!(
            r#"<div><div class="quoteheader">top</div>{}</div>"#,
            quote_markup("outer", nested)
        );
        let post = parse(&html);
        assert_eq!(post.errors.len(), 2);
        let quotes: Vec<&Quote> = post.children.iter().filter_map(ContentNode::as_quote).collect();
        assert_eq!(quotes[0].header(), Some("top"));
        assert_eq!(quotes[1].header(), Some("outer"));
        assert_eq!(quotes[1].errors.len(), 1);
    }

    #[test]
    fn test_header_and_username_never_coexist() {
        let html = format!(
            "<div>{}{}{}<div class=\"quoteheader\">q</div></div>",
            quote_markup("Quote from: alice on January 05, 2023, 03:04:05 PM", "a"),
            quote_markup("Quote from: bob on Today at 09:00:00 AM", "b"),
            quote_markup("nothing to see", "c"),
        );
        let post = parse(&html);
        let quotes: Vec<&Quote> = post.children.iter().filter_map(ContentNode::as_quote).collect();
        assert_eq!(quotes.len(), 4);
        for quote in quotes {
            assert!(!(quote.header().is_some() && quote.username().is_some()));
            assert_eq!(quote.username().is_some(), quote.datetime_utc().is_some());
        }
    }
}
