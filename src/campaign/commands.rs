//! Campaign and round operations.
//!
//! Commands that find nothing to do (campaign already exists, round already
//! ended, ...) log a warning and succeed; commands whose target is missing
//! fail.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::csv::round_to_csv;
use super::models::{CampaignMetadata, RoundData, RoundParticipant};
use super::store::CampaignStore;
use crate::forum::{ForumSource, PostWindow};
use crate::parser::format_utc;

/// Runs campaign commands against a store and a forum.
pub struct CampaignManager<F> {
    store: CampaignStore,
    forum: F,
}

impl<F: ForumSource> CampaignManager<F> {
    pub fn new(store: CampaignStore, forum: F) -> Self {
        Self { store, forum }
    }

    #[must_use]
    pub fn store(&self) -> &CampaignStore {
        &self.store
    }

    /// Create a campaign with no participants.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign cannot be written.
    pub async fn add_campaign(&self, campaign: &str) -> Result<()> {
        if self.store.campaign_exists(campaign).await {
            warn!(campaign = %campaign, "Campaign folder already exists");
            return Ok(());
        }
        self.store
            .create_campaign(&CampaignMetadata::new(campaign))
            .await
            .with_context(|| format!("Failed to add campaign '{campaign}'"))?;
        info!(campaign = %campaign, "Campaign added");
        Ok(())
    }

    /// Look up `uid` on the forum and add them to the campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist or the profile cannot
    /// be fetched.
    pub async fn add_participant(&self, campaign: &str, uid: u64) -> Result<()> {
        let mut metadata = self.store.read_metadata(campaign).await?;
        let key = uid.to_string();
        if metadata.participants.contains_key(&key) {
            warn!(campaign = %campaign, uid, "Participant with given uid already exists");
            return Ok(());
        }

        let profile = self
            .forum
            .fetch_profile(uid)
            .await
            .with_context(|| format!("Failed to fetch profile of uid {uid}"))?;
        metadata.participants.insert(key, profile.name.clone());
        self.store.write_metadata(&metadata).await?;
        info!(campaign = %campaign, uid, name = %profile.name, "Participant added");
        Ok(())
    }

    /// Remove `uid` from the campaign.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist.
    pub async fn remove_participant(&self, campaign: &str, uid: u64) -> Result<()> {
        let mut metadata = self.store.read_metadata(campaign).await?;
        if metadata.participants.remove(&uid.to_string()).is_none() {
            warn!(campaign = %campaign, uid, "Participant with given uid is not part of the campaign");
            return Ok(());
        }
        self.store.write_metadata(&metadata).await?;
        info!(campaign = %campaign, uid, "Participant removed");
        Ok(())
    }

    /// Start round `round`, snapshotting every participant's profile.
    ///
    /// `round_start` is a Unix timestamp; the current time is used when it
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist, has no participants,
    /// or a profile cannot be fetched.
    pub async fn add_round(
        &self,
        campaign: &str,
        round: u32,
        round_start: Option<i64>,
    ) -> Result<()> {
        let mut metadata = self.store.read_metadata(campaign).await?;
        if self.store.round_exists(campaign, round).await {
            warn!(campaign = %campaign, round, "Round already exists");
            return Ok(());
        }
        if metadata.participants.is_empty() {
            bail!("Campaign '{campaign}' doesn't have participants");
        }

        let round_start = round_start.unwrap_or_else(|| Utc::now().timestamp());
        let start = timestamp_to_utc(round_start)?;

        let mut participants = BTreeMap::new();
        for uid in metadata.participant_uids() {
            let profile = self
                .forum
                .fetch_profile(uid)
                .await
                .with_context(|| format!("Failed to fetch profile of uid {uid}"))?;
            participants.insert(uid.to_string(), RoundParticipant::from_profile(&profile));
        }

        let data = RoundData {
            campaign_name: campaign.to_string(),
            round_number: round,
            ended: false,
            round_start,
            round_start_utc: format_utc(&start),
            round_end: None,
            round_end_utc: None,
            participants,
        };
        self.store.create_round(&data).await?;

        metadata.current_round = Some(round);
        self.store.write_metadata(&metadata).await?;
        info!(campaign = %campaign, round, participants = data.participants.len(), "Round added");
        Ok(())
    }

    /// End round `round` now and compute each participant's gains.
    ///
    /// # Errors
    ///
    /// Returns an error if the round does not exist or a profile cannot be
    /// fetched.
    pub async fn end_round(&self, campaign: &str, round: u32) -> Result<()> {
        let mut data = self.store.read_round(campaign, round).await?;
        if data.ended {
            warn!(campaign = %campaign, round, "Round has already ended");
            return Ok(());
        }

        let now = Utc::now();
        info!(campaign = %campaign, round, "Ending round and calculating posts");
        data.ended = true;
        data.round_end = Some(now.timestamp());
        data.round_end_utc = Some(format_utc(&now));

        if data.participants.is_empty() {
            warn!(campaign = %campaign, round, "No participants to count posts for");
        }
        for participant in data.participants.values_mut() {
            let profile = self
                .forum
                .fetch_profile(participant.uid)
                .await
                .with_context(|| format!("Failed to fetch profile of uid {}", participant.uid))?;
            participant.finalize(&profile);
            info!(
                uid = participant.uid,
                name = %participant.name,
                posts_made = participant.posts_made,
                "Participant finalized"
            );
        }

        self.store.write_round(&data).await?;
        Ok(())
    }

    /// Collect every participant's posts made inside the round window and
    /// store them under the round's `posts/` folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the round does not exist or any participant's
    /// posts cannot be collected; nothing is recorded for the round then.
    pub async fn collect_round_posts(&self, campaign: &str, round: u32) -> Result<()> {
        let mut data = self.store.read_round(campaign, round).await?;
        let window = PostWindow {
            since: timestamp_to_utc(data.round_start)?,
            until: data.round_end.map(timestamp_to_utc).transpose()?,
        };

        for participant in data.participants.values_mut() {
            let uid = participant.uid;
            let posts = self
                .forum
                .fetch_posts(uid, window)
                .await
                .with_context(|| format!("Failed to collect posts of uid {uid}"))?;
            let errors: usize = posts.iter().map(|post| post.content.errors.len()).sum();
            let path = self
                .store
                .write_round_posts(campaign, round, uid, &posts)
                .await?;
            info!(
                uid,
                posts = posts.len(),
                content_errors = errors,
                path = %path.display(),
                "Posts collected"
            );
            participant.posts_in_window = Some(posts.len());
        }

        self.store.write_round(&data).await?;
        Ok(())
    }

    /// Export round `round` as `round.csv` in the round folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the round does not exist or the file cannot be
    /// written.
    pub async fn round_to_csv(&self, campaign: &str, round: u32) -> Result<PathBuf> {
        let data = self.store.read_round(campaign, round).await?;
        let path = self
            .store
            .write_round_csv(campaign, round, &round_to_csv(&data))
            .await?;
        info!(campaign = %campaign, round, path = %path.display(), "Round written to CSV");
        Ok(path)
    }
}

fn timestamp_to_utc(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
        .with_context(|| format!("Timestamp {timestamp} is out of range"))
}
