//! In-memory store implementations for the allocator test suite.
//!
//! Admission uses a per-date mutex instead of the database row lock, so the
//! concurrency properties hold on a multi-thread runtime without a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::leave::ledger::LeaveLedger;
use crate::leave::slots::{Membership, SlotRegistry};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, RequestType};
use crate::model::slot::{ConfirmedLeave, DailySlot, PendingEntry};

pub struct MemorySlotRegistry {
    default_max: i32,
    slots: Mutex<HashMap<NaiveDate, Arc<Mutex<DailySlot>>>>,
}

impl MemorySlotRegistry {
    pub fn new(default_max: i32) -> Self {
        Self {
            default_max,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, date: NaiveDate) -> Option<Arc<Mutex<DailySlot>>> {
        self.slots.lock().unwrap().get(&date).cloned()
    }

    fn handle_by_id(&self, id: &str) -> Option<Arc<Mutex<DailySlot>>> {
        self.slots
            .lock()
            .unwrap()
            .values()
            .find(|slot| slot.lock().unwrap().id == id)
            .cloned()
    }

    pub fn snapshot(&self, date: NaiveDate) -> Option<DailySlot> {
        self.handle(date).map(|slot| slot.lock().unwrap().clone())
    }
}

#[async_trait]
impl SlotRegistry for MemorySlotRegistry {
    async fn get_or_create(&self, date: NaiveDate) -> Result<DailySlot> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(date).or_insert_with(|| {
            Arc::new(Mutex::new(DailySlot {
                id: Uuid::new_v4().to_string(),
                date,
                max_slot: self.default_max,
                available_slot: self.default_max,
                confirmed_leaves: Vec::new(),
                pending_requests: Vec::new(),
            }))
        });
        let snapshot = slot.lock().unwrap().clone();
        Ok(snapshot)
    }

    async fn membership(&self, date: NaiveDate, user_id: &str) -> Result<Option<Membership>> {
        let Some(handle) = self.handle(date) else {
            return Ok(None);
        };
        let slot = handle.lock().unwrap();
        if slot.confirmed_leaves.iter().any(|c| c.user_id == user_id) {
            return Ok(Some(Membership::Confirmed));
        }
        if slot.pending_requests.iter().any(|p| p.user_id == user_id) {
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
        let handle = self
            .handle(date)
            .ok_or_else(|| Error::NotFound(format!("daily slot for {} not found", date)))?;

        // The per-date lock is the mutual-exclusion token: decide-and-apply
        // happens under it, so two racers cannot both see the last seat.
        let mut slot = handle.lock().unwrap();
        if slot.available_slot <= 0 {
            return Ok(false);
        }
        if slot.confirmed_leaves.iter().any(|c| c.user_id == user_id) {
            return Err(Error::Duplicate(
                "User has successfully registered for leave".to_string(),
            ));
        }
        slot.available_slot -= 1;
        slot.confirmed_leaves.push(ConfirmedLeave {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            approved_at: Utc::now(),
        });
        Ok(true)
    }

    async fn apply_pending(&self, date: NaiveDate, entry: PendingEntry) -> Result<()> {
        let handle = self
            .handle(date)
            .ok_or_else(|| Error::NotFound(format!("daily slot for {} not found", date)))?;

        let mut slot = handle.lock().unwrap();
        if slot.pending_requests.iter().any(|p| p.user_id == entry.user_id) {
            return Err(Error::Duplicate(
                "User has pending leave request".to_string(),
            ));
        }
        slot.pending_requests.push(entry);
        Ok(())
    }

    async fn reverse_confirmed(&self, date: NaiveDate, user_id: &str) -> Result<()> {
        let Some(handle) = self.handle(date) else {
            return Ok(());
        };
        let mut slot = handle.lock().unwrap();
        let before = slot.confirmed_leaves.len();
        slot.confirmed_leaves.retain(|c| c.user_id != user_id);
        if slot.confirmed_leaves.len() < before {
            slot.available_slot =
                (slot.max_slot - slot.confirmed_leaves.len() as i32).max(0);
        }
        Ok(())
    }

    async fn reverse_pending(&self, date: NaiveDate, user_id: &str) -> Result<()> {
        if let Some(handle) = self.handle(date) {
            let mut slot = handle.lock().unwrap();
            slot.pending_requests.retain(|p| p.user_id != user_id);
        }
        Ok(())
    }

    async fn resize_capacity(&self, id: &str, new_max: i32) -> Result<DailySlot> {
        if new_max <= 0 {
            return Err(Error::InvalidCapacity(new_max));
        }
        let handle = self
            .handle_by_id(id)
            .ok_or_else(|| Error::NotFound(format!("daily slot {} not found", id)))?;

        let mut slot = handle.lock().unwrap();
        slot.max_slot = new_max;
        slot.available_slot = (new_max - slot.confirmed_leaves.len() as i32).max(0);
        Ok(slot.clone())
    }

    async fn delete_if_empty(&self, date: NaiveDate) -> Result<bool> {
        let mut slots = self.slots.lock().unwrap();
        let Some(handle) = slots.get(&date) else {
            return Ok(false);
        };
        let empty = {
            let slot = handle.lock().unwrap();
            slot.confirmed_leaves.is_empty() && slot.pending_requests.is_empty()
        };
        if empty {
            slots.remove(&date);
        }
        Ok(empty)
    }

    async fn list_between(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailySlot>> {
        let slots = self.slots.lock().unwrap();
        let mut out: Vec<DailySlot> = slots
            .iter()
            .filter(|(date, _)| match (date_from, date_to) {
                (Some(from), Some(to)) => **date >= from && **date <= to,
                _ => true,
            })
            .map(|(_, handle)| handle.lock().unwrap().clone())
            .collect();
        out.sort_by_key(|slot| slot.date);
        Ok(out)
    }

    async fn get_by_id(&self, id: &str) -> Result<DailySlot> {
        self.handle_by_id(id)
            .map(|handle| handle.lock().unwrap().clone())
            .ok_or_else(|| Error::NotFound(format!("daily slot {} not found", id)))
    }
}

pub struct MemoryLeaveLedger {
    rows: Mutex<Vec<LeaveRequest>>,
    fail_inserts: AtomicBool,
}

impl MemoryLeaveLedger {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Fault injection for the compensation tests.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Live rows for a date; used to check the cross-store invariant.
    pub fn live_count(&self, date: NaiveDate) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.leave_date == date)
            .count()
    }
}

#[async_trait]
impl LeaveLedger for MemoryLeaveLedger {
    async fn insert(&self, request: &LeaveRequest) -> Result<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::Storage(sqlx::Error::PoolClosed));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.user_id == request.user_id && r.leave_date == request.leave_date)
        {
            return Err(Error::Duplicate(
                "User already has a leave request for this date".to_string(),
            ));
        }
        rows.push(request.clone());
        Ok(())
    }

    async fn find_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<LeaveRequest>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.leave_date == date)
            .cloned())
    }

    async fn delete_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<LeaveRequest> {
        let mut rows = self.rows.lock().unwrap();
        let position = rows
            .iter()
            .position(|r| r.user_id == user_id && r.leave_date == date)
            .ok_or_else(|| {
                Error::NotFound(format!("no leave request for user {} on {}", user_id, date))
            })?;
        Ok(rows.remove(position))
    }

    async fn update_status(&self, id: &str, status: LeaveStatus) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("leave request {} not found", id)))?;
        if row.request_type != RequestType::Wishlist {
            return Err(Error::InvalidTransition(
                "only wishlist requests can be updated".to_string(),
            ));
        }
        row.status = status;
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<LeaveRequest>> {
        let mut out: Vec<LeaveRequest> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.leave_date);
        Ok(out)
    }

    async fn list_pending(&self) -> Result<Vec<LeaveRequest>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == LeaveStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_between(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<LeaveRequest>> {
        let mut out: Vec<LeaveRequest> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.leave_date >= date_from && r.leave_date <= date_to)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.leave_date);
        Ok(out)
    }
}
