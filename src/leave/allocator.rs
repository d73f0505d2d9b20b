use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::directory::NameResolver;
use crate::error::{Error, Result};
use crate::leave::ledger::LeaveLedger;
use crate::leave::slots::{Membership, SlotRegistry};
use crate::leave::stats::{self, LeaveStatistics};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, RequestType};
use crate::model::slot::{DailySlot, PendingEntry};

/// Coordinates the slot registry and the leave ledger: decides admission
/// (confirmed vs queued) against daily capacity, reverses exactly the applied
/// effect on cancellation, and keeps the two stores consistent.
pub struct LeaveAllocator {
    slots: Arc<dyn SlotRegistry>,
    ledger: Arc<dyn LeaveLedger>,
    directory: Arc<dyn NameResolver>,
}

impl LeaveAllocator {
    pub fn new(
        slots: Arc<dyn SlotRegistry>,
        ledger: Arc<dyn LeaveLedger>,
        directory: Arc<dyn NameResolver>,
    ) -> Self {
        Self {
            slots,
            ledger,
            directory,
        }
    }

    /// Admits a leave request for `(user_id, date)`.
    ///
    /// The seat reservation is an atomic decrement-if-positive on the slot,
    /// so concurrent requests for the last seat resolve to exactly one
    /// confirmed booking; the rest are queued as wishlist entries. If the
    /// ledger insert fails after a slot effect was applied, the effect is
    /// reversed before the error propagates.
    pub async fn create_leave(
        &self,
        user_id: &str,
        date: NaiveDate,
        reason: Option<String>,
    ) -> Result<LeaveRequest> {
        if user_id.is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }

        let user_name = self.directory.resolve(user_id).await?;

        self.slots.get_or_create(date).await?;

        match self.slots.membership(date, user_id).await? {
            Some(Membership::Confirmed) => {
                return Err(Error::Duplicate(
                    "User has successfully registered for leave".to_string(),
                ));
            }
            Some(Membership::Pending) => {
                return Err(Error::Duplicate(
                    "User has pending leave request".to_string(),
                ));
            }
            None => {}
        }

        let reserved = self
            .slots
            .reserve_confirmed(date, user_id, &user_name)
            .await?;

        let (request_type, status) = if reserved {
            (RequestType::Immediate, LeaveStatus::Confirmed)
        } else {
            (RequestType::Wishlist, LeaveStatus::Pending)
        };

        let request = LeaveRequest::new(
            user_id.to_string(),
            user_name,
            date,
            reason,
            request_type,
            status,
        );

        if !reserved {
            self.slots
                .apply_pending(
                    date,
                    PendingEntry {
                        leave_id: request.id.clone(),
                        user_id: request.user_id.clone(),
                        user_name: request.user_name.clone(),
                        status: request.status,
                        requested_at: request.requested_at,
                    },
                )
                .await?;
        }

        if let Err(e) = self.ledger.insert(&request).await {
            // Compensate the slot effect so the stores cannot diverge on the
            // create path.
            let undo = if reserved {
                self.slots.reverse_confirmed(date, user_id).await
            } else {
                self.slots.reverse_pending(date, user_id).await
            };
            if let Err(undo_err) = undo {
                tracing::error!(
                    user_id,
                    %date,
                    error = %undo_err,
                    "failed to reverse slot effect after ledger insert failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            user_id,
            %date,
            request_type = %request.request_type,
            "leave request created"
        );

        Ok(request)
    }

    /// Cancels the caller's request for `date`, reversing exactly the effect
    /// that was applied at creation time, and garbage-collects the slot once
    /// both of its lists are empty.
    pub async fn delete_request_leave(&self, user_id: &str, date: NaiveDate) -> Result<()> {
        if user_id.is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }

        let request = self.ledger.delete_by_user_and_date(user_id, date).await?;

        let reversal = match request.request_type {
            RequestType::Immediate => self.slots.reverse_confirmed(date, user_id).await,
            RequestType::Wishlist => self.slots.reverse_pending(date, user_id).await,
        };

        if let Err(e) = reversal {
            // The ledger row is already gone; the slot still carries the
            // entry. Surface loudly for operators instead of swallowing.
            tracing::error!(
                user_id,
                %date,
                error = %e,
                "slot reversal failed after ledger delete; stores diverged"
            );
            return Err(e);
        }

        self.slots.delete_if_empty(date).await?;
        Ok(())
    }

    /// Admin resize of a day's capacity. Freed capacity never promotes queued
    /// entries; admission stays a creation-time decision.
    pub async fn edit_max_slot(&self, slot_id: &str, new_max: i32) -> Result<DailySlot> {
        if slot_id.is_empty() {
            return Err(Error::Validation("slot id is required".to_string()));
        }
        self.slots.resize_capacity(slot_id, new_max).await
    }

    /// Admin decision on a wishlist request. Touches neither the slot lists
    /// nor `available_slot`; admission was decided at creation time.
    pub async fn update_request_leave(&self, id: &str, new_status: LeaveStatus) -> Result<()> {
        if id.is_empty() {
            return Err(Error::Validation("request id is required".to_string()));
        }
        if !new_status.is_admin_decision() {
            return Err(Error::Validation(
                "status must be approved or rejected".to_string(),
            ));
        }
        self.ledger.update_status(id, new_status).await
    }

    pub async fn slots_between(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailySlot>> {
        self.slots.list_between(date_from, date_to).await
    }

    pub async fn slot_detail(&self, slot_id: &str) -> Result<DailySlot> {
        if slot_id.is_empty() {
            return Err(Error::Validation("slot id is required".to_string()));
        }
        self.slots.get_by_id(slot_id).await
    }

    /// The caller's requests, grouped by request type as the calendar UI
    /// consumes them.
    pub async fn requests_for_user(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, Vec<LeaveRequest>>> {
        let requests = self.ledger.list_by_user(user_id).await?;

        let mut grouped: HashMap<String, Vec<LeaveRequest>> = HashMap::new();
        for request in requests {
            grouped
                .entry(request.request_type.to_string())
                .or_default()
                .push(request);
        }
        Ok(grouped)
    }

    pub async fn pending_requests(&self) -> Result<Vec<LeaveRequest>> {
        self.ledger.list_pending().await
    }

    pub async fn statistics(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<LeaveStatistics> {
        if date_from > date_to {
            return Err(Error::Validation(
                "date_from must not be after date_to".to_string(),
            ));
        }
        let leaves = self.ledger.list_between(date_from, date_to).await?;
        Ok(stats::fold(&leaves))
    }
}
