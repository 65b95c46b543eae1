use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment on a ticket.
///
/// Comments are append-only; editing and deletion are intentionally not
/// supported so the thread stays a faithful record of the discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub author_id: Uuid,
    pub body: String,
}
