use scraper::{ElementRef, Node};

use super::{ContentNode, ParseError, PostContentParser};

/// What a source markup node means to the parser, decided once per node.
enum SourceNode<'a> {
    Text(&'a str),
    QuoteHeader(ElementRef<'a>),
    LineBreak,
    Anchor(Option<&'a str>),
    Image(Option<&'a str>),
    Other,
}

impl<'a> SourceNode<'a> {
    fn classify(node: &'a Node, element: Option<ElementRef<'a>>) -> Self {
        if let Node::Text(text) = node {
            return Self::Text(text);
        }
        let Some(element) = element else {
            return Self::Other;
        };
        let value = element.value();
        if has_class(element, "quoteheader") {
            return Self::QuoteHeader(element);
        }
        match value.name() {
            "br" => Self::LineBreak,
            "a" => Self::Anchor(value.attr("href")),
            "img" => Self::Image(value.attr("src")),
            _ => Self::Other,
        }
    }
}

pub(super) fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

impl PostContentParser {
    /// Convert the children of `element` into content nodes.
    ///
    /// Returns the nodes together with every error carried by the quotes
    /// among them (including their own nested quotes), in document order.
    pub(super) fn process_children(
        &self,
        element: ElementRef<'_>,
    ) -> Result<(Vec<ContentNode>, Vec<String>), ParseError> {
        let mut children = Vec::new();
        let mut errors = Vec::new();

        for child in element.children() {
            let kind = SourceNode::classify(child.value(), ElementRef::wrap(child));
            if let Some(node) = self.process_child(kind)? {
                if let ContentNode::Quote(quote) = &node {
                    errors.extend(quote.errors.iter().cloned());
                }
                children.push(node);
            }
        }

        Ok((children, errors))
    }

    fn process_child(&self, kind: SourceNode<'_>) -> Result<Option<ContentNode>, ParseError> {
        let node = match kind {
            SourceNode::Text(text) => ContentNode::text(text),
            SourceNode::QuoteHeader(header) => ContentNode::Quote(self.process_quote(header)?),
            SourceNode::LineBreak => ContentNode::text("\n\n"),
            SourceNode::Anchor(href) => ContentNode::Link {
                url: href.map(str::to_string),
            },
            SourceNode::Image(src) => ContentNode::Image {
                src: src.map(str::to_string),
            },
            SourceNode::Other => return Ok(None),
        };
        Ok(Some(node))
    }
}
