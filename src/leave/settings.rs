use chrono::Utc;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::setting::LeaveSetting;

pub const DEFAULT_MAX_PER_DAY: i32 = 5;
pub const DEFAULT_ADVANCE_BOOKING_DAYS: i32 = 7;

/// Organization-wide leave defaults, backed by a single `leave_settings` row.
///
/// Injected into the slot registry's constructor; a slot copies `max_per_day`
/// at creation time and never re-reads it.
#[derive(Clone)]
pub struct SettingsStore {
    pool: MySqlPool,
}

impl SettingsStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Returns the settings row, inserting the defaults on first access.
    pub async fn get(&self) -> Result<LeaveSetting> {
        let existing = sqlx::query_as::<_, LeaveSetting>(
            r#"
            SELECT id, max_per_day, advance_booking_days, created_at, updated_at
            FROM leave_settings
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(setting) = existing {
            return Ok(setting);
        }

        let now = Utc::now();
        let setting = LeaveSetting {
            id: Uuid::new_v4().to_string(),
            max_per_day: DEFAULT_MAX_PER_DAY,
            advance_booking_days: DEFAULT_ADVANCE_BOOKING_DAYS,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO leave_settings (id, max_per_day, advance_booking_days, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&setting.id)
        .bind(setting.max_per_day)
        .bind(setting.advance_booking_days)
        .bind(setting.created_at)
        .bind(setting.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(setting)
    }

    pub async fn default_max_per_day(&self) -> Result<i32> {
        Ok(self.get().await?.max_per_day)
    }

    pub async fn update(
        &self,
        id: &str,
        max_per_day: i32,
        advance_booking_days: i32,
    ) -> Result<LeaveSetting> {
        sqlx::query(
            r#"
            UPDATE leave_settings
            SET max_per_day = ?, advance_booking_days = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(max_per_day)
        .bind(advance_booking_days)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let updated = sqlx::query_as::<_, LeaveSetting>(
            r#"
            SELECT id, max_per_day, advance_booking_days, created_at, updated_at
            FROM leave_settings
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| Error::NotFound(format!("setting {} not found", id)))
    }
}
