//! Semicolon-separated export of a round.

use std::fmt::Write as _;

use super::models::{RoundData, RoundParticipant};

const SEPARATOR: char = ';';

const ROUND_HEADER: [&str; 6] = [
    "round_number",
    "ended",
    "round_start",
    "round_end",
    "round_start_utc",
    "round_end_utc",
];

const PARTICIPANT_HEADER: [&str; 13] = [
    "uid",
    "name",
    "rank",
    "start_post_count",
    "start_activity",
    "start_merit",
    "end_post_count",
    "end_activity",
    "end_merit",
    "posts_made",
    "activity_gained",
    "merit_gained",
    "posts_in_window",
];

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn push_row<S: AsRef<str>>(out: &mut String, row: &[S]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            let _ = write!(out, "\"{}\"", cell.replace('"', "\"\""));
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn participant_row(p: &RoundParticipant) -> Vec<String> {
    vec![
        p.uid.to_string(),
        p.name.clone(),
        p.rank.clone(),
        p.start_post_count.to_string(),
        p.start_activity.to_string(),
        p.start_merit.to_string(),
        opt(p.end_post_count),
        opt(p.end_activity),
        opt(p.end_merit),
        opt(p.posts_made),
        opt(p.activity_gained),
        opt(p.merit_gained),
        opt(p.posts_in_window),
    ]
}

/// Render a round as CSV: the round header and values, then a
/// `Participants` marker row, the participant header and one row per
/// participant. The participant block is omitted when there are none.
#[must_use]
pub fn round_to_csv(round: &RoundData) -> String {
    let mut out = String::new();
    push_row(&mut out, &ROUND_HEADER);
    push_row(
        &mut out,
        &[
            round.round_number.to_string(),
            if round.ended { "True" } else { "False" }.to_string(),
            round.round_start.to_string(),
            opt(round.round_end),
            round.round_start_utc.clone(),
            opt(round.round_end_utc.as_deref()),
        ],
    );

    if !round.participants.is_empty() {
        push_row(&mut out, &["Participants"]);
        push_row(&mut out, &PARTICIPANT_HEADER);
        for participant in round.participants.values() {
            push_row(&mut out, &participant_row(participant));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::forum::Profile;

    fn round_with(participants: BTreeMap<String, RoundParticipant>) -> RoundData {
        RoundData {
            campaign_name: "spring".to_string(),
            round_number: 2,
            ended: false,
            round_start: 1_700_000_000,
            round_start_utc: "2023-11-14T22:13:20Z".to_string(),
            round_end: None,
            round_end_utc: None,
            participants,
        }
    }

    #[test]
    fn test_round_without_participants() {
        let csv = round_to_csv(&round_with(BTreeMap::new()));
        assert_eq!(
            csv,
            "round_number;ended;round_start;round_end;round_start_utc;round_end_utc\r\n\
             2;False;1700000000;;2023-11-14T22:13:20Z;\r\n"
        );
    }

    #[test]
    fn test_round_with_participant() {
        let mut participant = RoundParticipant::from_profile(&Profile {
            uid: 3,
            name: "sato;shi".to_string(),
            post_count: 10,
            activity: 8,
            merit: 1,
            rank: "Legendary".to_string(),
        });
        participant.finalize(&Profile {
            uid: 3,
            name: "sato;shi".to_string(),
            post_count: 12,
            activity: 9,
            merit: 1,
            rank: "Legendary".to_string(),
        });
        let csv = round_to_csv(&round_with(BTreeMap::from([("3".to_string(), participant)])));
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines[2], "Participants");
        assert!(lines[3].starts_with("uid;name;rank;start_post_count"));
        assert!(lines[3].ends_with("merit_gained;posts_in_window"));
        assert_eq!(lines[4], "3;\"sato;shi\";Legendary;10;8;1;12;9;1;2;1;0;");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let mut out = String::new();
        push_row(&mut out, &["say \"hi\"", "plain"]);
        assert_eq!(out, "\"say \"\"hi\"\"\";plain\r\n");
    }
}
