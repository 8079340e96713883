//! Record types handed out by the draft store.
//!
//! Every value returned by [`crate::DraftDb`] is a read-only snapshot; the
//! database rows remain the only authoritative copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Posts
// ============================================================================

/// Lifecycle state of a generated post.
///
/// `Pending` is the only state with outgoing transitions:
/// pending -> cancelled (superseded by a newer draft for the same design) and
/// pending -> published (confirmed and accepted by the publisher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Pending,
    Cancelled,
    Published,
}

impl PostStatus {
    pub const ALL: [PostStatus; 3] = [Self::Pending, Self::Cancelled, Self::Published];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Cancelled => "cancelled",
            PostStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PostStatus::Pending),
            "cancelled" | "canceled" => Some(PostStatus::Cancelled),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }

    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PostStatus::Pending)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored post in any state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    /// Generation order (autoincrement).
    pub id: i64,
    pub design_name: String,
    pub content: String,
    pub status: PostStatus,
    pub readiness_score: String,
    /// Identifier returned by the publisher, set once published.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// The active draft awaiting a publish decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingDraft {
    pub id: i64,
    pub design_name: String,
    pub content: String,
    pub readiness_score: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of [`crate::DraftDb::save_pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavedDraft {
    /// Id of the newly inserted pending post.
    pub post_id: i64,
    /// Number of older pending posts for the same design moved to cancelled.
    pub superseded: u64,
}

/// Filter for listing posts (newest first).
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub design_name: Option<String>,
    pub status: Option<PostStatus>,
    pub limit: Option<u32>,
}

// ============================================================================
// Designs
// ============================================================================

/// Last known location and run pointer of a design, unique by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignRecord {
    pub name: String,
    pub path: String,
    pub last_run_id: String,
    pub last_updated: DateTime<Utc>,
}
