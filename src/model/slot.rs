use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveStatus;

/// Capacity record for one calendar date.
///
/// Invariant after every mutation: `available_slot == max_slot - |confirmed_leaves|`
/// and `0 <= available_slot <= max_slot`. The slot is created on the first
/// request for its date and deleted once both lists are empty.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct DailySlot {
    pub id: String,
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub max_slot: i32,
    pub available_slot: i32,
    #[sqlx(skip)]
    pub confirmed_leaves: Vec<ConfirmedLeave>,
    #[sqlx(skip)]
    pub pending_requests: Vec<PendingEntry>,
}

/// Membership entry for a seat taken against capacity. Unique per user per date.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ConfirmedLeave {
    pub user_id: String,
    pub user_name: String,
    #[schema(format = "date-time", value_type = String)]
    pub approved_at: DateTime<Utc>,
}

/// Membership entry for a queued request. References the ledger row by id,
/// never owns it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PendingEntry {
    pub leave_id: String,
    pub user_id: String,
    pub user_name: String,
    pub status: LeaveStatus,
    #[schema(format = "date-time", value_type = String)]
    pub requested_at: DateTime<Utc>,
}
