//! CLI for Tapeout Herald
//!
//! Every command prints human-readable text by default and a single JSON
//! object with `--json`. "Nothing to do" results (no completed run, no
//! pending draft) exit successfully.

pub mod check;
pub mod config;
pub mod context;
pub mod designs;
pub mod drafts;
pub mod error;
pub mod latest;
pub mod output;
