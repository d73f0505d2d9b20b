use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use crate::error::{Error, Result};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, RequestType};

/// Durable record of every leave request and its outcome. One row per
/// (user, leave date); rows are hard-deleted on cancellation.
#[async_trait]
pub trait LeaveLedger: Send + Sync {
    async fn insert(&self, request: &LeaveRequest) -> Result<()>;

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>>;

    /// Removes and returns the matching request; `NotFound` if absent.
    async fn delete_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<LeaveRequest>;

    /// Only wishlist-type requests may be updated this way.
    async fn update_status(&self, id: &str, status: LeaveStatus) -> Result<()>;

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<LeaveRequest>>;

    async fn list_pending(&self) -> Result<Vec<LeaveRequest>>;

    async fn list_between(&self, date_from: NaiveDate, date_to: NaiveDate)
        -> Result<Vec<LeaveRequest>>;
}

pub struct MySqlLeaveLedger {
    pool: MySqlPool,
}

impl MySqlLeaveLedger {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, leave_date, user_id, user_name, reason, request_type, status, requested_at \
     FROM leave_requests";

#[async_trait]
impl LeaveLedger for MySqlLeaveLedger {
    async fn insert(&self, request: &LeaveRequest) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (id, leave_date, user_id, user_name, reason, request_type, status, requested_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(request.leave_date)
        .bind(&request.user_id)
        .bind(&request.user_name)
        .bind(&request.reason)
        .bind(request.request_type)
        .bind(request.status)
        .bind(request.requested_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Err(Error::Duplicate(
                            "User already has a leave request for this date".to_string(),
                        ));
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>> {
        let request = sqlx::query_as::<_, LeaveRequest>(&format!(
            "{} WHERE user_id = ? AND leave_date = ?",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn delete_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<LeaveRequest> {
        // Remove-and-return: lock the row, read it, delete it, one transaction.
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, LeaveRequest>(&format!(
            "{} WHERE user_id = ? AND leave_date = ? FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            tx.rollback().await?;
            return Err(Error::NotFound(format!(
                "no leave request for user {} on {}",
                user_id, date
            )));
        };

        sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(&request.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn update_status(&self, id: &str, status: LeaveStatus) -> Result<()> {
        let row = sqlx::query_as::<_, (RequestType,)>(
            "SELECT request_type FROM leave_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(Error::NotFound(format!("leave request {} not found", id))),
            Some((RequestType::Immediate,)) => Err(Error::InvalidTransition(
                "only wishlist requests can be updated".to_string(),
            )),
            Some((RequestType::Wishlist,)) => {
                sqlx::query(
                    "UPDATE leave_requests SET status = ? WHERE id = ? AND request_type = ?",
                )
                .bind(status)
                .bind(id)
                .bind(RequestType::Wishlist)
                .execute(&self.pool)
                .await?;
                Ok(())
            }
        }
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&format!(
            "{} WHERE user_id = ? ORDER BY leave_date",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_pending(&self) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&format!(
            "{} WHERE status = ? ORDER BY requested_at",
            SELECT_COLUMNS
        ))
        .bind(LeaveStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_between(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<LeaveRequest>> {
        let requests = sqlx::query_as::<_, LeaveRequest>(&format!(
            "{} WHERE leave_date BETWEEN ? AND ? ORDER BY leave_date",
            SELECT_COLUMNS
        ))
        .bind(date_from)
        .bind(date_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }
}
