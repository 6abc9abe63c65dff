//! Campaigns, rounds and their on-disk bookkeeping.

pub mod commands;
pub mod csv;
pub mod models;
pub mod store;

pub use commands::CampaignManager;
pub use models::{CampaignMetadata, RoundData, RoundParticipant};
pub use store::{CampaignStore, StoreError};
