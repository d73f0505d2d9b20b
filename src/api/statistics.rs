use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::error::Error;
use crate::leave::allocator::LeaveAllocator;

#[derive(Deserialize, IntoParams)]
pub struct StatisticsQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/* =========================
Leave statistics over a range (HR/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/statistical",
    params(StatisticsQuery),
    responses(
        (status = 200, description = "Aggregated statistics", body = crate::leave::stats::LeaveStatistics),
        (status = 400, description = "Missing or inverted range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Statistics"
)]
pub async fn statistical(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    query: web::Query<StatisticsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let date_from = query
        .date_from
        .ok_or_else(|| Error::Validation("date from is empty".to_string()))?;
    let date_to = query
        .date_to
        .ok_or_else(|| Error::Validation("date to is empty".to_string()))?;

    let stats = allocator.statistics(date_from, date_to).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": stats
    })))
}
