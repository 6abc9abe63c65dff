use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::forum::Profile;

/// Contents of `<campaign>/metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetadata {
    pub campaign_name: String,
    /// Forum uid (as a string key) to forum name.
    #[serde(default)]
    pub participants: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round: Option<u32>,
}

impl CampaignMetadata {
    #[must_use]
    pub fn new(campaign_name: &str) -> Self {
        Self {
            campaign_name: campaign_name.to_string(),
            participants: BTreeMap::new(),
            current_round: None,
        }
    }

    /// Participant uids in key order. Keys that are not valid uids are skipped.
    pub fn participant_uids(&self) -> impl Iterator<Item = u64> + '_ {
        self.participants.keys().filter_map(|key| key.parse().ok())
    }
}

/// Contents of `<campaign>/<round>/round.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    pub campaign_name: String,
    pub round_number: u32,
    pub ended: bool,
    /// Seconds since the Unix epoch.
    pub round_start: i64,
    pub round_start_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_end: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_end_utc: Option<String>,
    #[serde(default)]
    pub participants: BTreeMap<String, RoundParticipant>,
}

/// A participant's figures for one round.
///
/// `start_*` are snapshotted when the round is added, `end_*` and the gains
/// when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParticipant {
    pub uid: u64,
    pub name: String,
    pub rank: String,
    pub start_post_count: i64,
    pub start_activity: i64,
    pub start_merit: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_post_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_activity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_merit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts_made: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_gained: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merit_gained: Option<i64>,
    /// Posts collected inside the round window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts_in_window: Option<usize>,
}

impl RoundParticipant {
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            uid: profile.uid,
            name: profile.name.clone(),
            rank: profile.rank.clone(),
            start_post_count: profile.post_count,
            start_activity: profile.activity,
            start_merit: profile.merit,
            end_post_count: None,
            end_activity: None,
            end_merit: None,
            posts_made: None,
            activity_gained: None,
            merit_gained: None,
            posts_in_window: None,
        }
    }

    /// Record end-of-round figures and the differences from the start.
    pub fn finalize(&mut self, profile: &Profile) {
        self.end_post_count = Some(profile.post_count);
        self.end_activity = Some(profile.activity);
        self.end_merit = Some(profile.merit);
        self.posts_made = Some(profile.post_count - self.start_post_count);
        self.activity_gained = Some(profile.activity - self.start_activity);
        self.merit_gained = Some(profile.merit - self.start_merit);
    }
}
