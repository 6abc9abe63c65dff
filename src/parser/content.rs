use serde::{Deserialize, Serialize};

/// Error recorded on a quote header that has no quote body after it.
pub const QUOTE_BODY_MISSING: &str = "Quote header not followed by a quote";

/// The parse result for one post body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPost {
    pub children: Vec<ContentNode>,
    /// Every error carried by any quote in the tree, in document order.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// One piece of post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentNode {
    /// A literal text run. Line breaks become `"\n\n"`.
    Text { content: String },
    Link { url: Option<String> },
    Image { src: Option<String> },
    Quote(Quote),
}

impl ContentNode {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn as_quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote(quote) => Some(quote),
            _ => None,
        }
    }
}

/// A quoted reply nested in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(flatten)]
    pub attribution: QuoteAttribution,
    #[serde(default)]
    pub children: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Who was quoted, as far as the quote header allows us to tell.
///
/// Serialized flat into the quote object, so the variants are told apart by
/// their field sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteAttribution {
    /// The header matched one of the forum's timestamp grammars.
    Attributed {
        url: String,
        username: String,
        datetime_utc: String,
    },
    /// No quote body followed the header; only the header text survives.
    BodyMissing { header: String, error: String },
    /// A quote body exists but the header could not be attributed.
    Unattributed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        header: String,
    },
}

impl Quote {
    /// A quote whose header was not followed by a body.
    #[must_use]
    pub fn body_missing(header: String) -> Self {
        Self {
            attribution: QuoteAttribution::BodyMissing {
                header,
                error: QUOTE_BODY_MISSING.to_string(),
            },
            children: Vec::new(),
            errors: vec![QUOTE_BODY_MISSING.to_string()],
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.attribution {
            QuoteAttribution::Attributed { url, .. } => Some(url),
            QuoteAttribution::Unattributed { url, .. } => url.as_deref(),
            QuoteAttribution::BodyMissing { .. } => None,
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match &self.attribution {
            QuoteAttribution::Attributed { username, .. } => Some(username),
            _ => None,
        }
    }

    #[must_use]
    pub fn datetime_utc(&self) -> Option<&str> {
        match &self.attribution {
            QuoteAttribution::Attributed { datetime_utc, .. } => Some(datetime_utc),
            _ => None,
        }
    }

    /// Raw header text, present only when attribution failed.
    #[must_use]
    pub fn header(&self) -> Option<&str> {
        match &self.attribution {
            QuoteAttribution::Attributed { .. } => None,
            QuoteAttribution::BodyMissing { header, .. }
            | QuoteAttribution::Unattributed { header, .. } => Some(header),
        }
    }
}
