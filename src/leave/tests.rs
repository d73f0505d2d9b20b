use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::directory::NameResolver;
use crate::error::{Error, Result};
use crate::leave::allocator::LeaveAllocator;
use crate::leave::ledger::LeaveLedger;
use crate::leave::memory::{MemoryLeaveLedger, MemorySlotRegistry};
use crate::model::leave_request::{LeaveStatus, RequestType};
use crate::model::slot::DailySlot;

/// Resolves every id except the designated one.
struct StubDirectory {
    fail_for: Option<String>,
}

#[async_trait]
impl NameResolver for StubDirectory {
    async fn resolve(&self, user_id: &str) -> Result<String> {
        if self.fail_for.as_deref() == Some(user_id) {
            return Err(Error::Upstream(format!("unknown user {}", user_id)));
        }
        Ok(format!("User {}", user_id))
    }
}

fn setup(default_max: i32) -> (LeaveAllocator, Arc<MemorySlotRegistry>, Arc<MemoryLeaveLedger>) {
    setup_with_resolver(default_max, StubDirectory { fail_for: None })
}

fn setup_with_resolver(
    default_max: i32,
    directory: StubDirectory,
) -> (LeaveAllocator, Arc<MemorySlotRegistry>, Arc<MemoryLeaveLedger>) {
    let slots = Arc::new(MemorySlotRegistry::new(default_max));
    let ledger = Arc::new(MemoryLeaveLedger::new());
    let allocator = LeaveAllocator::new(slots.clone(), ledger.clone(), Arc::new(directory));
    (allocator, slots, ledger)
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Every slot must satisfy the capacity arithmetic and per-user uniqueness
/// across both lists after each operation.
fn assert_slot_invariants(slot: &DailySlot) {
    assert_eq!(
        slot.available_slot,
        (slot.max_slot - slot.confirmed_leaves.len() as i32).max(0),
        "available_slot out of sync with confirmed count"
    );
    assert!(slot.available_slot >= 0);
    assert!(slot.available_slot <= slot.max_slot);

    let mut seen = HashSet::new();
    for entry in &slot.confirmed_leaves {
        assert!(seen.insert(&entry.user_id), "duplicate confirmed user");
    }
    for entry in &slot.pending_requests {
        assert!(seen.insert(&entry.user_id), "user in both lists");
    }
}

#[tokio::test]
async fn capacity_two_admits_two_then_queues() {
    let (allocator, slots, ledger) = setup(2);
    let day = date("2025-06-01");

    let first = allocator.create_leave("u1", day, None).await.unwrap();
    let second = allocator.create_leave("u2", day, None).await.unwrap();
    let third = allocator
        .create_leave("u3", day, Some("family trip".to_string()))
        .await
        .unwrap();

    assert_eq!(first.request_type, RequestType::Immediate);
    assert_eq!(first.status, LeaveStatus::Confirmed);
    assert_eq!(second.request_type, RequestType::Immediate);
    assert_eq!(third.request_type, RequestType::Wishlist);
    assert_eq!(third.status, LeaveStatus::Pending);

    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 0);
    assert_eq!(slot.confirmed_leaves.len(), 2);
    assert_eq!(slot.pending_requests.len(), 1);
    assert_eq!(slot.pending_requests[0].leave_id, third.id);
    assert_slot_invariants(&slot);

    // Cross-store: membership across both lists matches live ledger rows.
    assert_eq!(
        slot.confirmed_leaves.len() + slot.pending_requests.len(),
        ledger.live_count(day)
    );
}

#[tokio::test]
async fn cancelling_confirmed_frees_a_seat() {
    let (allocator, slots, ledger) = setup(2);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();
    allocator.create_leave("u3", day, None).await.unwrap();

    allocator.delete_request_leave("u1", day).await.unwrap();

    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 1);
    assert_eq!(slot.confirmed_leaves.len(), 1);
    assert_eq!(slot.confirmed_leaves[0].user_id, "u2");
    // The queued request is not promoted by the freed seat.
    assert_eq!(slot.pending_requests.len(), 1);
    assert_slot_invariants(&slot);
    assert_eq!(ledger.live_count(day), 2);
}

#[tokio::test]
async fn cancelling_pending_removes_queue_entry_only() {
    let (allocator, slots, _ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();

    allocator.delete_request_leave("u2", day).await.unwrap();

    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 0);
    assert_eq!(slot.confirmed_leaves.len(), 1);
    assert!(slot.pending_requests.is_empty());
    assert_slot_invariants(&slot);
}

#[tokio::test]
async fn shrinking_below_confirmed_floors_available_at_zero() {
    let (allocator, slots, _ledger) = setup(2);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();

    let slot_id = slots.snapshot(day).unwrap().id;
    let resized = allocator.edit_max_slot(&slot_id, 1).await.unwrap();

    assert_eq!(resized.max_slot, 1);
    assert_eq!(resized.available_slot, 0);
}

#[tokio::test]
async fn cancel_after_shrink_keeps_available_within_bounds() {
    let (allocator, slots, _ledger) = setup(2);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();

    let slot_id = slots.snapshot(day).unwrap().id;
    allocator.edit_max_slot(&slot_id, 1).await.unwrap();

    // Still over-committed after one cancellation: 1 confirmed, max 1.
    allocator.delete_request_leave("u1", day).await.unwrap();

    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.max_slot, 1);
    assert_eq!(slot.confirmed_leaves.len(), 1);
    assert_eq!(slot.available_slot, 0);
    assert_slot_invariants(&slot);
}

#[tokio::test]
async fn growing_capacity_adds_headroom_without_promotion() {
    let (allocator, slots, _ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();

    let slot_id = slots.snapshot(day).unwrap().id;
    let resized = allocator.edit_max_slot(&slot_id, 5).await.unwrap();

    assert_eq!(resized.max_slot, 5);
    assert_eq!(resized.available_slot, 4);
    // u2 stays queued; admission is a creation-time decision.
    assert_eq!(resized.pending_requests.len(), 1);
}

#[tokio::test]
async fn resize_rejects_non_positive_capacity() {
    let (allocator, slots, _ledger) = setup(2);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    let slot_id = slots.snapshot(day).unwrap().id;

    for bad in [0, -3] {
        match allocator.edit_max_slot(&slot_id, bad).await {
            Err(Error::InvalidCapacity(v)) => assert_eq!(v, bad),
            other => panic!("expected InvalidCapacity, got {:?}", other.map(|s| s.max_slot)),
        }
    }
}

#[tokio::test]
async fn duplicate_requests_are_rejected_with_distinct_messages() {
    let (allocator, _slots, _ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    match allocator.create_leave("u1", day, None).await {
        Err(Error::Duplicate(msg)) => assert!(msg.contains("registered")),
        other => panic!("expected Duplicate, got {:?}", other.map(|r| r.id)),
    }

    allocator.create_leave("u2", day, None).await.unwrap();
    match allocator.create_leave("u2", day, None).await {
        Err(Error::Duplicate(msg)) => assert!(msg.contains("pending")),
        other => panic!("expected Duplicate, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_last_seat_admit_exactly_one() {
    let (allocator, slots, ledger) = setup(1);
    let allocator = Arc::new(allocator);
    let day = date("2025-06-01");

    let mut handles = Vec::new();
    for i in 0..8 {
        let allocator = allocator.clone();
        handles.push(tokio::spawn(async move {
            allocator.create_leave(&format!("u{}", i), day, None).await
        }));
    }

    let mut confirmed = 0;
    let mut pending = 0;
    for handle in handles {
        let request = handle.await.unwrap().unwrap();
        match request.request_type {
            RequestType::Immediate => confirmed += 1,
            RequestType::Wishlist => pending += 1,
        }
    }

    assert_eq!(confirmed, 1, "exactly one request may win the last seat");
    assert_eq!(pending, 7);

    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 0);
    assert_eq!(slot.confirmed_leaves.len(), 1);
    assert_eq!(slot.pending_requests.len(), 7);
    assert_slot_invariants(&slot);
    assert_eq!(ledger.live_count(day), 8);
}

#[tokio::test]
async fn deleting_every_request_garbage_collects_the_slot() {
    let (allocator, slots, ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    allocator.create_leave("u2", day, None).await.unwrap();
    assert!(slots.snapshot(day).is_some());

    allocator.delete_request_leave("u2", day).await.unwrap();
    // Non-empty day survives.
    assert!(slots.snapshot(day).is_some());

    allocator.delete_request_leave("u1", day).await.unwrap();
    assert!(slots.snapshot(day).is_none());
    assert_eq!(ledger.live_count(day), 0);
}

#[tokio::test]
async fn different_dates_do_not_share_capacity() {
    let (allocator, slots, _ledger) = setup(1);
    let monday = date("2025-06-02");
    let tuesday = date("2025-06-03");

    let first = allocator.create_leave("u1", monday, None).await.unwrap();
    let second = allocator.create_leave("u1", tuesday, None).await.unwrap();

    assert_eq!(first.request_type, RequestType::Immediate);
    assert_eq!(second.request_type, RequestType::Immediate);
    assert_slot_invariants(&slots.snapshot(monday).unwrap());
    assert_slot_invariants(&slots.snapshot(tuesday).unwrap());
}

#[tokio::test]
async fn status_update_is_restricted_to_wishlist_requests() {
    let (allocator, slots, ledger) = setup(1);
    let day = date("2025-06-01");

    let immediate = allocator.create_leave("u1", day, None).await.unwrap();
    let wishlist = allocator.create_leave("u2", day, None).await.unwrap();

    match allocator
        .update_request_leave(&immediate.id, LeaveStatus::Approved)
        .await
    {
        Err(Error::InvalidTransition(_)) => {}
        other => panic!("expected InvalidTransition, got {:?}", other),
    }

    allocator
        .update_request_leave(&wishlist.id, LeaveStatus::Approved)
        .await
        .unwrap();
    let updated = ledger
        .find_by_user_and_date("u2", day)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, LeaveStatus::Approved);

    // The decision does not move the request between lists or touch capacity.
    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 0);
    assert_eq!(slot.confirmed_leaves.len(), 1);
    assert_eq!(slot.pending_requests.len(), 1);
}

#[tokio::test]
async fn status_update_rejects_non_admin_statuses() {
    let (allocator, _slots, _ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    let wishlist = allocator.create_leave("u2", day, None).await.unwrap();

    for status in [LeaveStatus::Confirmed, LeaveStatus::Pending] {
        match allocator.update_request_leave(&wishlist.id, status).await {
            Err(Error::Validation(_)) => {}
            other => panic!("expected Validation, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn status_update_of_unknown_request_is_not_found() {
    let (allocator, _slots, _ledger) = setup(1);
    match allocator
        .update_request_leave("missing", LeaveStatus::Rejected)
        .await
    {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn cancelling_unknown_request_is_not_found() {
    let (allocator, _slots, _ledger) = setup(1);
    match allocator
        .delete_request_leave("u1", date("2025-06-01"))
        .await
    {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn ledger_failure_compensates_reserved_seat() {
    let (allocator, slots, ledger) = setup(2);
    let day = date("2025-06-01");

    ledger.fail_inserts(true);
    match allocator.create_leave("u1", day, None).await {
        Err(Error::Storage(_)) => {}
        other => panic!("expected Storage, got {:?}", other.map(|r| r.id)),
    }

    // The reserved seat was given back; the stores agree.
    let slot = slots.snapshot(day).unwrap();
    assert_eq!(slot.available_slot, 2);
    assert!(slot.confirmed_leaves.is_empty());
    assert_eq!(ledger.live_count(day), 0);

    ledger.fail_inserts(false);
    let request = allocator.create_leave("u1", day, None).await.unwrap();
    assert_eq!(request.request_type, RequestType::Immediate);
}

#[tokio::test]
async fn ledger_failure_compensates_queued_entry() {
    let (allocator, slots, ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();

    ledger.fail_inserts(true);
    assert!(allocator.create_leave("u2", day, None).await.is_err());
    ledger.fail_inserts(false);

    let slot = slots.snapshot(day).unwrap();
    assert!(slot.pending_requests.is_empty());
    assert_eq!(ledger.live_count(day), 1);
}

#[tokio::test]
async fn unresolvable_user_propagates_upstream_error() {
    let (allocator, slots, _ledger) = setup_with_resolver(
        2,
        StubDirectory {
            fail_for: Some("ghost".to_string()),
        },
    );
    let day = date("2025-06-01");

    match allocator.create_leave("ghost", day, None).await {
        Err(Error::Upstream(_)) => {}
        other => panic!("expected Upstream, got {:?}", other.map(|r| r.id)),
    }
    // Failed before any slot was created.
    assert!(slots.snapshot(day).is_none());
}

#[tokio::test]
async fn empty_user_id_is_a_validation_error() {
    let (allocator, _slots, _ledger) = setup(1);
    match allocator.create_leave("", date("2025-06-01"), None).await {
        Err(Error::Validation(_)) => {}
        other => panic!("expected Validation, got {:?}", other.map(|r| r.id)),
    }
}

#[tokio::test]
async fn my_requests_are_grouped_by_request_type() {
    let (allocator, _slots, _ledger) = setup(1);

    allocator
        .create_leave("u1", date("2025-06-02"), None)
        .await
        .unwrap();
    allocator
        .create_leave("u2", date("2025-06-02"), None)
        .await
        .unwrap();
    allocator
        .create_leave("u1", date("2025-06-03"), None)
        .await
        .unwrap();

    let grouped = allocator.requests_for_user("u1").await.unwrap();
    assert_eq!(grouped.get("immediate").map(Vec::len), Some(2));
    assert!(grouped.get("wishlist").is_none());

    let grouped = allocator.requests_for_user("u2").await.unwrap();
    assert_eq!(grouped.get("wishlist").map(Vec::len), Some(1));
}

#[tokio::test]
async fn pending_listing_tracks_queue_and_decisions() {
    let (allocator, _slots, _ledger) = setup(1);
    let day = date("2025-06-01");

    allocator.create_leave("u1", day, None).await.unwrap();
    let queued = allocator.create_leave("u2", day, None).await.unwrap();

    let pending = allocator.pending_requests().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, queued.id);

    allocator
        .update_request_leave(&queued.id, LeaveStatus::Rejected)
        .await
        .unwrap();
    assert!(allocator.pending_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn statistics_cover_the_requested_range() {
    let (allocator, _slots, _ledger) = setup(1);

    allocator
        .create_leave("u1", date("2025-06-02"), None)
        .await
        .unwrap();
    allocator
        .create_leave("u2", date("2025-06-02"), None)
        .await
        .unwrap();
    allocator
        .create_leave("u3", date("2025-07-01"), None)
        .await
        .unwrap();

    let stats = allocator
        .statistics(date("2025-06-01"), date("2025-06-30"))
        .await
        .unwrap();
    assert_eq!(stats.total_requested, 2);
    assert_eq!(stats.total_confirmed, 1);
    assert_eq!(stats.total_pending, 1);
    assert_eq!(stats.immediate_requests, 1);

    match allocator.statistics(date("2025-07-01"), date("2025-06-01")).await {
        Err(Error::Validation(_)) => {}
        other => panic!("expected Validation, got {:?}", other.map(|s| s.total_requested)),
    }
}
