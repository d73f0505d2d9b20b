use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::auth::AuthUser;
use crate::directory::{DbDirectory, NameResolver};
use crate::error::Error;
use crate::model::attendance::AttendanceDay;

#[derive(Deserialize, ToSchema)]
pub struct CheckOutBody {
    #[schema(example = 45)]
    pub lunch_minutes: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
pub struct MonthQuery {
    #[param(example = 6)]
    pub month: u32,
    #[param(example = 2025)]
    pub year: i32,
}

/// Wall clock between check-in and check-out, minus lunch, in hours.
fn working_hours(
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    lunch_minutes: i32,
) -> f64 {
    let minutes = (check_out - check_in).num_minutes() - i64::from(lunch_minutes);
    (minutes.max(0) as f64) / 60.0
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Identity lookup failed"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    directory: web::Data<DbDirectory>,
) -> actix_web::Result<impl Responder> {
    // A failed lookup propagates; an unknown user must not accumulate
    // attendance rows.
    directory.resolve(&auth.user_id).await?;

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_days (id, user_id, date, check_in, lunch_minutes, working_hours)
        VALUES (?, ?, ?, ?, 0, 0)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&auth.user_id)
    .bind(now.date_naive())
    .bind(now)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked in successfully"
        }))),

        Err(e) => {
            // Duplicate check-in for same day
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Already checked in today"
                    })));
                }
            }

            tracing::error!(error = %e, user_id = %auth.user_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/v1/attendance",
    request_body(content = CheckOutBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "working_hours": 7.25,
            "percent_work_day": 90.6
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CheckOutBody>,
) -> actix_web::Result<impl Responder> {
    let now = Utc::now();
    let today = now.date_naive();

    let day = sqlx::query_as::<_, AttendanceDay>(
        r#"
        SELECT id, user_id, date, check_in, check_out, lunch_minutes, working_hours
        FROM attendance_days
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(&auth.user_id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(Error::Storage)?;

    let Some(day) = day else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No active check-in found for today"
        })));
    };
    let Some(check_in) = day.check_in else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No active check-in found for today"
        })));
    };
    if day.check_out.is_some() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Already checked out today"
        })));
    }

    let lunch_minutes = payload.lunch_minutes.unwrap_or(0).max(0);
    let hours = working_hours(check_in, now, lunch_minutes);
    let percent_work_day = hours / 8.0 * 100.0;

    sqlx::query(
        r#"
        UPDATE attendance_days
        SET check_out = ?, lunch_minutes = ?, working_hours = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(lunch_minutes)
    .bind(hours)
    .bind(&day.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = %auth.user_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully",
        "working_hours": hours,
        "percent_work_day": percent_work_day
    })))
}

/// Month listing for the caller
#[utoipa::path(
    get,
    path = "/api/v1/attendance/me",
    params(MonthQuery),
    responses(
        (status = 200, description = "Attendance days for the month", body = [AttendanceDay]),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let first = NaiveDate::from_ymd_opt(query.year, query.month, 1)
        .ok_or_else(|| Error::Validation("invalid month".to_string()))?;
    let last = if query.month == 12 {
        NaiveDate::from_ymd_opt(query.year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(query.year, query.month + 1, 1)
    }
    .map(|d| d - Duration::days(1))
    .ok_or_else(|| Error::Validation("invalid month".to_string()))?;

    let days = sqlx::query_as::<_, AttendanceDay>(
        r#"
        SELECT id, user_id, date, check_in, check_out, lunch_minutes, working_hours
        FROM attendance_days
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(&auth.user_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await
    .map_err(Error::Storage)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Success",
        "data": days
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn working_hours_subtracts_lunch() {
        let check_in = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2025, 6, 2, 17, 30, 0).unwrap();
        assert_eq!(working_hours(check_in, check_out, 30), 8.0);
    }

    #[test]
    fn working_hours_never_goes_negative() {
        let check_in = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2025, 6, 2, 9, 10, 0).unwrap();
        assert_eq!(working_hours(check_in, check_out, 60), 0.0);
    }
}
