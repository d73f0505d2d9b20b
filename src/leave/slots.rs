use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::leave::settings::SettingsStore;
use crate::model::slot::{ConfirmedLeave, DailySlot, PendingEntry};

/// Which list of a slot a user already appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Confirmed,
    Pending,
}

/// Owns one `DailySlot` per calendar date: creation on first demand,
/// capacity mutation and membership bookkeeping.
///
/// `reserve_confirmed` is the admission primitive: a decrement-if-positive
/// and the confirmed-list append issued as one atomic store operation, so
/// two racing requests for the last seat cannot both win.
#[async_trait]
pub trait SlotRegistry: Send + Sync {
    /// Returns the slot for `date`, creating it with the current default
    /// capacity if absent. Concurrent first access is safe: creation is an
    /// atomic insert-if-absent and the result is re-read.
    async fn get_or_create(&self, date: NaiveDate) -> Result<DailySlot>;

    /// Duplicate probe: is `user_id` already confirmed or pending for `date`?
    async fn membership(&self, date: NaiveDate, user_id: &str) -> Result<Option<Membership>>;

    /// Attempts to take one seat. Returns `false` when capacity is exhausted.
    async fn reserve_confirmed(
        &self,
        date: NaiveDate,
        user_id: &str,
        user_name: &str,
    ) -> Result<bool>;

    /// Queues a wishlist entry. Does not touch `available_slot`.
    async fn apply_pending(&self, date: NaiveDate, entry: PendingEntry) -> Result<()>;

    /// Removes a confirmed entry and gives its seat back. `available_slot`
    /// is recomputed from the remaining confirmed count so it never exceeds
    /// `max_slot`, even after a shrink left the slot over-committed.
    async fn reverse_confirmed(&self, date: NaiveDate, user_id: &str) -> Result<()>;

    async fn reverse_pending(&self, date: NaiveDate, user_id: &str) -> Result<()>;

    /// Sets `max_slot = new_max` and `available_slot = max(0, new_max - |confirmed|)`.
    /// Never promotes pending entries, even when the resize frees capacity.
    async fn resize_capacity(&self, id: &str, new_max: i32) -> Result<DailySlot>;

    /// Deletes the slot once both lists are empty; no-op otherwise.
    async fn delete_if_empty(&self, date: NaiveDate) -> Result<bool>;

    async fn list_between(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailySlot>>;

    async fn get_by_id(&self, id: &str) -> Result<DailySlot>;
}

pub struct MySqlSlotRegistry {
    pool: MySqlPool,
    settings: SettingsStore,
}

impl MySqlSlotRegistry {
    pub fn new(pool: MySqlPool, settings: SettingsStore) -> Self {
        Self { pool, settings }
    }

    async fn fetch_by_date(&self, date: NaiveDate) -> Result<Option<DailySlot>> {
        let slot = sqlx::query_as::<_, DailySlot>(
            "SELECT id, date, max_slot, available_slot FROM daily_slots WHERE date = ?",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match slot {
            Some(slot) => Ok(Some(self.hydrate(slot).await?)),
            None => Ok(None),
        }
    }

    /// Loads the membership lists belonging to a slot row.
    async fn hydrate(&self, mut slot: DailySlot) -> Result<DailySlot> {
        slot.confirmed_leaves = sqlx::query_as::<_, ConfirmedLeave>(
            r#"
            SELECT user_id, user_name, approved_at
            FROM slot_confirmed
            WHERE slot_date = ?
            ORDER BY approved_at, user_id
            "#,
        )
        .bind(slot.date)
        .fetch_all(&self.pool)
        .await?;

        slot.pending_requests = sqlx::query_as::<_, PendingEntry>(
            r#"
            SELECT leave_id, user_id, user_name, status, requested_at
            FROM slot_pending
            WHERE slot_date = ?
            ORDER BY requested_at, user_id
            "#,
        )
        .bind(slot.date)
        .fetch_all(&self.pool)
        .await?;

        Ok(slot)
    }
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        return db_err.code().as_deref() == Some("23000");
    }
    false
}

#[async_trait]
impl SlotRegistry for MySqlSlotRegistry {
    async fn get_or_create(&self, date: NaiveDate) -> Result<DailySlot> {
        if let Some(slot) = self.fetch_by_date(date).await? {
            return Ok(slot);
        }

        // Capacity is copied from the settings at creation time and never
        // re-read for this slot.
        let max = self.settings.default_max_per_day().await?;

        sqlx::query(
            r#"
            INSERT INTO daily_slots (id, date, max_slot, available_slot)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(date)
        .bind(max)
        .bind(max)
        .execute(&self.pool)
        .await?;

        // Re-read: a concurrent creator may have won the insert.
        self.fetch_by_date(date)
            .await?
            .ok_or_else(|| Error::NotFound(format!("daily slot for {} not found", date)))
    }

    async fn membership(&self, date: NaiveDate, user_id: &str) -> Result<Option<Membership>> {
        let confirmed = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM slot_confirmed WHERE slot_date = ? AND user_id = ?",
        )
        .bind(date)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if confirmed.0 > 0 {
            return Ok(Some(Membership::Confirmed));
        }

        let pending = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM slot_pending WHERE slot_date = ? AND user_id = ?",
        )
        .bind(date)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if pending.0 > 0 {
            return Ok(Some(Membership::Pending));
        }

        Ok(None)
    }

    async fn reserve_confirmed(
        &self,
        date: NaiveDate,
        user_id: &str,
        user_name: &str,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: the row lock serializes same-date writers
        // for the duration of the transaction; other dates are unaffected.
        let updated = sqlx::query(
            r#"
            UPDATE daily_slots
            SET available_slot = available_slot - 1
            WHERE date = ? AND available_slot > 0
            "#,
        )
        .bind(date)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO slot_confirmed (slot_date, user_id, user_name, approved_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(date)
        .bind(user_id)
        .bind(user_name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            tx.rollback().await?;
            if is_duplicate_key(&e) {
                return Err(Error::Duplicate(
                    "User has successfully registered for leave".to_string(),
                ));
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn apply_pending(&self, date: NaiveDate, entry: PendingEntry) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO slot_pending (slot_date, leave_id, user_id, user_name, status, requested_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(date)
        .bind(&entry.leave_id)
        .bind(&entry.user_id)
        .bind(&entry.user_name)
        .bind(entry.status)
        .bind(entry.requested_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(Error::Duplicate(
                "User has pending leave request".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn reverse_confirmed(&self, date: NaiveDate, user_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM slot_confirmed WHERE slot_date = ? AND user_id = ?",
        )
        .bind(date)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() > 0 {
            // Recompute rather than blindly increment: a shrink can leave the
            // slot over-committed and available_slot must stay within
            // [0, max_slot - |confirmed|].
            sqlx::query(
                r#"
                UPDATE daily_slots
                SET available_slot = GREATEST(
                    0,
                    max_slot - (SELECT COUNT(*) FROM slot_confirmed WHERE slot_date = ?)
                )
                WHERE date = ?
                "#,
            )
            .bind(date)
            .bind(date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reverse_pending(&self, date: NaiveDate, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM slot_pending WHERE slot_date = ? AND user_id = ?")
            .bind(date)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn resize_capacity(&self, id: &str, new_max: i32) -> Result<DailySlot> {
        if new_max <= 0 {
            return Err(Error::InvalidCapacity(new_max));
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (NaiveDate,)>(
            "SELECT date FROM daily_slots WHERE id = ? FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((date,)) = row else {
            tx.rollback().await?;
            return Err(Error::NotFound(format!("daily slot {} not found", id)));
        };

        let (confirmed,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM slot_confirmed WHERE slot_date = ?",
        )
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        let available = (new_max - confirmed as i32).max(0);

        sqlx::query("UPDATE daily_slots SET max_slot = ?, available_slot = ? WHERE id = ?")
            .bind(new_max)
            .bind(available)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn delete_if_empty(&self, date: NaiveDate) -> Result<bool> {
        // Single atomic statement: the slot goes away only if both lists are
        // empty at the moment of the delete.
        let result = sqlx::query(
            r#"
            DELETE FROM daily_slots
            WHERE date = ?
              AND NOT EXISTS (SELECT 1 FROM slot_confirmed WHERE slot_date = ?)
              AND NOT EXISTS (SELECT 1 FROM slot_pending WHERE slot_date = ?)
            "#,
        )
        .bind(date)
        .bind(date)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_between(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailySlot>> {
        let rows = match (date_from, date_to) {
            (Some(from), Some(to)) => {
                sqlx::query_as::<_, DailySlot>(
                    r#"
                    SELECT id, date, max_slot, available_slot
                    FROM daily_slots
                    WHERE date BETWEEN ? AND ?
                    ORDER BY date
                    "#,
                )
                .bind(from)
                .bind(to)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, DailySlot>(
                    "SELECT id, date, max_slot, available_slot FROM daily_slots ORDER BY date",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut slots = Vec::with_capacity(rows.len());
        for row in rows {
            slots.push(self.hydrate(row).await?);
        }
        Ok(slots)
    }

    async fn get_by_id(&self, id: &str) -> Result<DailySlot> {
        let slot = sqlx::query_as::<_, DailySlot>(
            "SELECT id, date, max_slot, available_slot FROM daily_slots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match slot {
            Some(slot) => self.hydrate(slot).await,
            None => Err(Error::NotFound(format!("daily slot {} not found", id))),
        }
    }
}
