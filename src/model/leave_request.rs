use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Admission outcome decided once, at creation time, against the capacity
/// available at that instant. Never changes afterwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestType {
    Immediate,
    Wishlist,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
    sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LeaveStatus {
    /// Immediate requests start here; terminal unless the request is deleted.
    Confirmed,
    /// Wishlist requests start here.
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Statuses an admin may set on a wishlist request.
    pub fn is_admin_decision(self) -> bool {
        matches!(self, LeaveStatus::Approved | LeaveStatus::Rejected)
    }
}

/// One row per (user, leave date). Hard-deleted on cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: String,
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub leave_date: NaiveDate,
    pub user_id: String,
    pub user_name: String,
    pub reason: Option<String>,
    pub request_type: RequestType,
    pub status: LeaveStatus,
    #[schema(example = "2025-05-20T09:00:00Z", format = "date-time", value_type = String)]
    pub requested_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn new(
        user_id: String,
        user_name: String,
        leave_date: NaiveDate,
        reason: Option<String>,
        request_type: RequestType,
        status: LeaveStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            leave_date,
            user_id,
            user_name,
            reason,
            request_type,
            status,
            requested_at: Utc::now(),
        }
    }
}
