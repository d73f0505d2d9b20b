use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::Error;
use crate::leave::allocator::LeaveAllocator;
use crate::leave::settings::SettingsStore;

#[derive(Deserialize, IntoParams)]
pub struct CalendarQuery {
    /// Pivot date; the listing covers 30 days either side of it.
    /// Without it, every known slot is returned.
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct EditSlotBody {
    #[schema(example = 5)]
    pub max_slot: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct SettingBody {
    #[schema(example = 5)]
    pub max_per_day: i32,
    #[schema(example = 7)]
    pub advance_booking_days: i32,
}

/* =========================
Calendar listing
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Daily slots with their membership lists"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn calendar_list(
    _auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    query: web::Query<CalendarQuery>,
) -> actix_web::Result<impl Responder> {
    let (from, to) = match query.date {
        Some(pivot) => (
            Some(pivot - Duration::days(30)),
            Some(pivot + Duration::days(30)),
        ),
        None => (None, None),
    };

    let slots = allocator.slots_between(from, to).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": slots
    })))
}

/* =========================
Calendar detail
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/calendar/{id}",
    params(
        ("id" = String, Path, description = "Daily slot ID")
    ),
    responses(
        (status = 200, description = "Slot detail", body = crate::model::slot::DailySlot),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Slot not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn calendar_detail(
    _auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let slot = allocator.slot_detail(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": slot
    })))
}

/* =========================
Edit a day's capacity (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/calendar/{id}",
    params(
        ("id" = String, Path, description = "Daily slot ID")
    ),
    request_body(content = EditSlotBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Capacity updated", body = crate::model::slot::DailySlot),
        (status = 400, description = "Non-positive capacity"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Slot not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn edit_max_slot(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    path: web::Path<String>,
    payload: web::Json<EditSlotBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let slot = allocator
        .edit_max_slot(&path.into_inner(), payload.max_slot)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": slot
    })))
}

/* =========================
Settings
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/setting",
    responses(
        (status = 200, description = "Current settings", body = crate::model::setting::LeaveSetting),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn get_setting(
    _auth: AuthUser,
    settings: web::Data<SettingsStore>,
) -> actix_web::Result<impl Responder> {
    let setting = settings.get().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": setting
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/setting/{id}",
    params(
        ("id" = String, Path, description = "Settings row ID")
    ),
    request_body(content = SettingBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Settings updated", body = crate::model::setting::LeaveSetting),
        (status = 400, description = "Non-positive capacity"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Settings row not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calendar"
)]
pub async fn update_setting(
    auth: AuthUser,
    settings: web::Data<SettingsStore>,
    path: web::Path<String>,
    payload: web::Json<SettingBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.max_per_day <= 0 {
        return Err(Error::InvalidCapacity(payload.max_per_day).into());
    }

    let setting = settings
        .update(
            &path.into_inner(),
            payload.max_per_day,
            payload.advance_booking_days,
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": setting
    })))
}
