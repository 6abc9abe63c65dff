//! JSON file storage for campaigns and rounds.
//!
//! Layout under the data folder:
//!
//! ```text
//! <campaign>/metadata.json
//! <campaign>/<round>/round.json
//! <campaign>/<round>/round.csv
//! <campaign>/<round>/posts/<uid>.json
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::models::{CampaignMetadata, RoundData};
use crate::forum::PostRecord;

const DEFAULT_DATA_FOLDER: &str = "./campaigns";
const METADATA_FILE: &str = "metadata.json";
const ROUND_FILE: &str = "round.json";
const ROUND_CSV_FILE: &str = "round.csv";
const POSTS_DIR: &str = "posts";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data folder {} does not exist or is not a directory", .0.display())]
    DataFolderMissing(PathBuf),
    #[error("data folder {} is not writable", .0.display())]
    DataFolderReadOnly(PathBuf),
    #[error("campaign '{0}' was not found")]
    CampaignNotFound(String),
    #[error("round {round} of campaign '{campaign}' was not found")]
    RoundNotFound { campaign: String, round: u32 },
    #[error("{} holds data for {found}, expected {expected}", .path.display())]
    Mismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Campaign data rooted at a data folder.
#[derive(Debug, Clone)]
pub struct CampaignStore {
    root: PathBuf,
}

impl CampaignStore {
    /// Open the store at `data_folder`, or at `./campaigns` (created if
    /// needed) when no folder is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder is missing, not a directory, or
    /// read-only.
    pub async fn open(data_folder: Option<&Path>) -> Result<Self, StoreError> {
        let root = match data_folder {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_DATA_FOLDER);
                tokio::fs::create_dir_all(&path)
                    .await
                    .map_err(io_error(&path))?;
                path
            }
        };
        validate_data_folder(&root).await?;
        debug!(path = %root.display(), "Opened campaign store");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn campaign_dir(&self, campaign: &str) -> PathBuf {
        self.root.join(campaign)
    }

    #[must_use]
    pub fn round_dir(&self, campaign: &str, round: u32) -> PathBuf {
        self.campaign_dir(campaign).join(round.to_string())
    }

    #[must_use]
    pub fn round_posts_path(&self, campaign: &str, round: u32, uid: u64) -> PathBuf {
        self.round_dir(campaign, round)
            .join(POSTS_DIR)
            .join(format!("{uid}.json"))
    }

    #[must_use]
    pub fn round_csv_path(&self, campaign: &str, round: u32) -> PathBuf {
        self.round_dir(campaign, round).join(ROUND_CSV_FILE)
    }

    pub async fn campaign_exists(&self, campaign: &str) -> bool {
        is_dir(&self.campaign_dir(campaign)).await
    }

    pub async fn round_exists(&self, campaign: &str, round: u32) -> bool {
        is_dir(&self.round_dir(campaign, round)).await
    }

    /// Create the campaign folder and write its metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder or file cannot be written.
    pub async fn create_campaign(&self, metadata: &CampaignMetadata) -> Result<(), StoreError> {
        let dir = self.campaign_dir(&metadata.campaign_name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_error(&dir))?;
        self.write_metadata(metadata).await
    }

    /// Read and validate `metadata.json` of `campaign`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CampaignNotFound`] if the campaign folder does
    /// not exist and [`StoreError::Mismatch`] if the file names another
    /// campaign.
    pub async fn read_metadata(&self, campaign: &str) -> Result<CampaignMetadata, StoreError> {
        if !self.campaign_exists(campaign).await {
            return Err(StoreError::CampaignNotFound(campaign.to_string()));
        }
        let path = self.campaign_dir(campaign).join(METADATA_FILE);
        let metadata: CampaignMetadata = read_json(&path).await?;
        if metadata.campaign_name != campaign {
            return Err(StoreError::Mismatch {
                path,
                expected: format!("campaign '{campaign}'"),
                found: format!("campaign '{}'", metadata.campaign_name),
            });
        }
        Ok(metadata)
    }

    /// Write `metadata.json` of an existing campaign.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CampaignNotFound`] if the campaign folder does
    /// not exist.
    pub async fn write_metadata(&self, metadata: &CampaignMetadata) -> Result<(), StoreError> {
        let campaign = &metadata.campaign_name;
        if !self.campaign_exists(campaign).await {
            return Err(StoreError::CampaignNotFound(campaign.clone()));
        }
        let path = self.campaign_dir(campaign).join(METADATA_FILE);
        write_json(&path, metadata).await?;
        info!(campaign = %campaign, "Campaign metadata written");
        Ok(())
    }

    /// Create the round folder and write its data.
    ///
    /// # Errors
    ///
    /// Returns an error if the campaign does not exist or writing fails.
    pub async fn create_round(&self, round: &RoundData) -> Result<(), StoreError> {
        if !self.campaign_exists(&round.campaign_name).await {
            return Err(StoreError::CampaignNotFound(round.campaign_name.clone()));
        }
        let dir = self.round_dir(&round.campaign_name, round.round_number);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_error(&dir))?;
        self.write_round(round).await
    }

    /// Read and validate `round.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoundNotFound`] if the round folder does not
    /// exist and [`StoreError::Mismatch`] if the file names another round.
    pub async fn read_round(&self, campaign: &str, round: u32) -> Result<RoundData, StoreError> {
        if !self.round_exists(campaign, round).await {
            return Err(StoreError::RoundNotFound {
                campaign: campaign.to_string(),
                round,
            });
        }
        let path = self.round_dir(campaign, round).join(ROUND_FILE);
        let data: RoundData = read_json(&path).await?;
        if data.round_number != round {
            return Err(StoreError::Mismatch {
                path,
                expected: format!("round {round}"),
                found: format!("round {}", data.round_number),
            });
        }
        Ok(data)
    }

    /// Write `round.json` of an existing round.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoundNotFound`] if the round folder does not
    /// exist.
    pub async fn write_round(&self, round: &RoundData) -> Result<(), StoreError> {
        let campaign = &round.campaign_name;
        let number = round.round_number;
        if !self.round_exists(campaign, number).await {
            return Err(StoreError::RoundNotFound {
                campaign: campaign.clone(),
                round: number,
            });
        }
        let path = self.round_dir(campaign, number).join(ROUND_FILE);
        write_json(&path, round).await?;
        info!(campaign = %campaign, round = number, "Round data written");
        Ok(())
    }

    /// Write the collected posts of one participant for a round.
    ///
    /// # Errors
    ///
    /// Returns an error if the posts folder or file cannot be written.
    pub async fn write_round_posts(
        &self,
        campaign: &str,
        round: u32,
        uid: u64,
        posts: &[PostRecord],
    ) -> Result<PathBuf, StoreError> {
        let path = self.round_posts_path(campaign, round, uid);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error(parent))?;
        }
        write_json(&path, &posts).await?;
        Ok(path)
    }

    /// Write the CSV export of a round.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn write_round_csv(
        &self,
        campaign: &str,
        round: u32,
        contents: &str,
    ) -> Result<PathBuf, StoreError> {
        let path = self.round_csv_path(campaign, round);
        tokio::fs::write(&path, contents)
            .await
            .map_err(io_error(&path))?;
        Ok(path)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
}

async fn validate_data_folder(path: &Path) -> Result<(), StoreError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| StoreError::DataFolderMissing(path.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(StoreError::DataFolderMissing(path.to_path_buf()));
    }
    if metadata.permissions().readonly() {
        return Err(StoreError::DataFolderReadOnly(path.to_path_buf()));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(io_error(path))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, content)
        .await
        .map_err(io_error(path))
}
