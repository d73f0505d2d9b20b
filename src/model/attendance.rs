use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One attendance record per user per calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDay {
    pub id: String,
    pub user_id: String,
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = String)]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub check_out: Option<DateTime<Utc>>,
    pub lunch_minutes: i32,
    pub working_hours: f64,
}
