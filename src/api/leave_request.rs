use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::leave::allocator::LeaveAllocator;
use crate::model::leave_request::LeaveStatus;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveBody {
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub leave_date: NaiveDate,
    #[schema(example = "family trip")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteLeaveBody {
    #[schema(example = "2025-06-01", format = "date", value_type = String)]
    pub leave_date: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusBody {
    #[schema(example = "approved")]
    pub status: LeaveStatus,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeaveBody,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request admitted or queued",
         body = Object,
         example = json!({
            "message": "Success",
            "data": {
                "id": "0f8e4b2a",
                "leave_date": "2025-06-01",
                "request_type": "immediate",
                "status": "confirmed"
            }
         })
        ),
        (status = 400, description = "Duplicate or invalid request"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Identity lookup failed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    payload: web::Json<CreateLeaveBody>,
) -> actix_web::Result<impl Responder> {
    let request = allocator
        .create_leave(&auth.user_id, payload.leave_date, payload.reason.clone())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": request
    })))
}

/* =========================
Cancel own leave request
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave",
    request_body(content = DeleteLeaveBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave request cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No request for that date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    payload: web::Json<DeleteLeaveBody>,
) -> actix_web::Result<impl Responder> {
    allocator
        .delete_request_leave(&auth.user_id, payload.leave_date)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success"
    })))
}

/* =========================
Own requests, grouped by request type
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/my-request",
    responses(
        (status = 200, description = "Requests grouped by request type", body = Object,
         example = json!({
            "message": "Success",
            "data": { "immediate": [], "wishlist": [] }
         })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_requests(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
) -> actix_web::Result<impl Responder> {
    let grouped = allocator.requests_for_user(&auth.user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": grouped
    })))
}

/* =========================
Pending wishlist queue (HR/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/pending-request",
    responses(
        (status = 200, description = "All pending wishlist requests"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_requests(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let pending = allocator.pending_requests().await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": pending
    })))
}

/* =========================
Approve/reject a wishlist request (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}",
    params(
        ("id" = String, Path, description = "ID of the wishlist request to decide")
    ),
    request_body(content = UpdateStatusBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Not a wishlist request or bad status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn update_request(
    auth: AuthUser,
    allocator: web::Data<LeaveAllocator>,
    path: web::Path<String>,
    payload: web::Json<UpdateStatusBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let id = path.into_inner();
    allocator.update_request_leave(&id, payload.status).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success"
    })))
}
