//! Profile page scraping.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ForumError, Profile};

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Invalid selector"));

#[derive(Default)]
struct ProfileFields {
    name: Option<String>,
    post_count: Option<String>,
    activity: Option<String>,
    merit: Option<String>,
    rank: Option<String>,
}

/// Extract the profile figures of `uid` from its profile page.
///
/// Rows are recognised by their bold label cell (`Name:`, `Posts:`,
/// `Activity:`, `Merit`, `Position:`); the value is the direct text of the
/// second cell.
///
/// # Errors
///
/// Returns [`ForumError::MissingProfileFields`] listing every field that was
/// not found, or [`ForumError::InvalidNumber`] if a count is not an integer.
pub fn parse_profile(html: &str, uid: u64) -> Result<Profile, ForumError> {
    let document = Html::parse_document(html);
    let mut fields = ProfileFields::default();

    for row in document.select(&ROW_SELECTOR) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| cell.value().name() == "td")
            .collect();
        let [label_cell, value_cell, ..] = cells.as_slice() else {
            continue;
        };
        let Some(label) = bold_label(*label_cell) else {
            continue;
        };
        let value = own_text(*value_cell);
        if value.is_empty() {
            continue;
        }

        let slot = if label.starts_with("Name:") {
            &mut fields.name
        } else if label.starts_with("Posts:") {
            &mut fields.post_count
        } else if label.starts_with("Activity:") {
            &mut fields.activity
        } else if label.starts_with("Merit") {
            &mut fields.merit
        } else if label.starts_with("Position:") {
            &mut fields.rank
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    let missing: Vec<&'static str> = [
        ("name", fields.name.is_none()),
        ("post_count", fields.post_count.is_none()),
        ("activity", fields.activity.is_none()),
        ("merit", fields.merit.is_none()),
        ("rank", fields.rank.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    match fields {
        ProfileFields {
            name: Some(name),
            post_count: Some(post_count),
            activity: Some(activity),
            merit: Some(merit),
            rank: Some(rank),
        } => Ok(Profile {
            uid,
            name,
            post_count: parse_count(uid, "post_count", &post_count)?,
            activity: parse_count(uid, "activity", &activity)?,
            merit: parse_count(uid, "merit", &merit)?,
            rank,
        }),
        _ => Err(ForumError::MissingProfileFields { uid, missing }),
    }
}

/// Text of a `<b>` directly inside the label cell.
fn bold_label(cell: ElementRef<'_>) -> Option<String> {
    cell.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "b")
        .map(|bold| bold.text().collect::<String>().trim().to_string())
}

/// Text nodes directly inside `cell`, ignoring nested elements.
fn own_text(cell: ElementRef<'_>) -> String {
    cell.children()
        .filter_map(|node| node.value().as_text().map(|text| &**text))
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_count(uid: u64, field: &'static str, value: &str) -> Result<i64, ForumError> {
    value.parse().map_err(|_| ForumError::InvalidNumber {
        uid,
        field,
        value: value.to_string(),
    })
}
