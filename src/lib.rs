//! Forum campaign tracker library.
//!
//! Tracks participation in forum signature campaigns: snapshots participants'
//! public profile figures at the start and end of each round, collects the
//! posts they made during a round, and parses post bodies into a structured
//! content tree.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod campaign;
pub mod config;
pub mod forum;
pub mod parser;
