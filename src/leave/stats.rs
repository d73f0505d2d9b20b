use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::leave_request::{LeaveRequest, LeaveStatus, RequestType};

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct LeaveStatistics {
    pub total_requested: i64,
    /// Confirmed at creation or approved later.
    pub total_confirmed: i64,
    pub total_pending: i64,
    pub total_rejected: i64,
    pub immediate_requests: i64,
    pub approve_rate: f64,
    pub requests_by_month: Vec<MonthlyStats>,
    pub requests_by_weekday: Vec<WeekdayStats>,
    pub top_request_users: Vec<UserStats>,
    pub average_requests_per_user: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyStats {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeekdayStats {
    pub weekday: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub user_id: String,
    pub user_name: String,
    pub total_requests: i64,
    pub approved_requests: i64,
    pub approval_rate: f64,
}

/// Read-only aggregation over a slice of ledger rows. Adds no invariants of
/// its own.
pub fn fold(leaves: &[LeaveRequest]) -> LeaveStatistics {
    let mut out = LeaveStatistics {
        total_requested: leaves.len() as i64,
        ..Default::default()
    };

    let mut months: BTreeMap<String, MonthlyStats> = BTreeMap::new();
    let mut weekdays: BTreeMap<u32, (String, i64)> = BTreeMap::new();
    let mut users: BTreeMap<String, UserStats> = BTreeMap::new();

    for item in leaves {
        match item.status {
            LeaveStatus::Confirmed | LeaveStatus::Approved => out.total_confirmed += 1,
            LeaveStatus::Pending => out.total_pending += 1,
            LeaveStatus::Rejected => out.total_rejected += 1,
        }
        if item.request_type == RequestType::Immediate {
            out.immediate_requests += 1;
        }

        let month_key = format!("{:04}-{:02}", item.leave_date.year(), item.leave_date.month());
        let month = months.entry(month_key.clone()).or_insert(MonthlyStats {
            month: month_key,
            count: 0,
            approved: 0,
            rejected: 0,
        });
        month.count += 1;
        match item.status {
            LeaveStatus::Approved => month.approved += 1,
            LeaveStatus::Rejected => month.rejected += 1,
            _ => {}
        }

        let weekday = item.leave_date.weekday();
        let entry = weekdays
            .entry(weekday.num_days_from_monday())
            .or_insert((weekday.to_string(), 0));
        entry.1 += 1;

        let user = users
            .entry(item.user_id.clone())
            .or_insert_with(|| UserStats {
                user_id: item.user_id.clone(),
                user_name: item.user_name.clone(),
                total_requests: 0,
                approved_requests: 0,
                approval_rate: 0.0,
            });
        user.total_requests += 1;
        if matches!(item.status, LeaveStatus::Approved | LeaveStatus::Confirmed) {
            user.approved_requests += 1;
        }
    }

    if out.total_requested > 0 {
        out.approve_rate = out.total_confirmed as f64 / out.total_requested as f64 * 100.0;
    }

    out.requests_by_month = months.into_values().collect();
    out.requests_by_weekday = weekdays
        .into_values()
        .map(|(weekday, count)| WeekdayStats { weekday, count })
        .collect();

    let user_count = users.len();
    let mut top_users: Vec<UserStats> = users.into_values().collect();
    for user in &mut top_users {
        if user.total_requests > 0 {
            user.approval_rate =
                user.approved_requests as f64 / user.total_requests as f64 * 100.0;
        }
    }
    top_users.sort_by(|a, b| {
        b.total_requests
            .cmp(&a.total_requests)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    out.top_request_users = top_users;

    if user_count > 0 {
        out.average_requests_per_user = out.total_requested as f64 / user_count as f64;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(
        user: &str,
        date: NaiveDate,
        request_type: RequestType,
        status: LeaveStatus,
    ) -> LeaveRequest {
        LeaveRequest::new(
            user.to_string(),
            format!("Name {}", user),
            date,
            None,
            request_type,
            status,
        )
    }

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let stats = fold(&[]);
        assert_eq!(stats.total_requested, 0);
        assert_eq!(stats.approve_rate, 0.0);
        assert!(stats.requests_by_month.is_empty());
        assert!(stats.top_request_users.is_empty());
    }

    #[test]
    fn counts_by_status_and_type() {
        let june_2 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(); // Monday
        let june_3 = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let july_1 = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();

        let leaves = vec![
            request("u1", june_2, RequestType::Immediate, LeaveStatus::Confirmed),
            request("u2", june_2, RequestType::Wishlist, LeaveStatus::Pending),
            request("u1", june_3, RequestType::Wishlist, LeaveStatus::Approved),
            request("u3", july_1, RequestType::Wishlist, LeaveStatus::Rejected),
        ];

        let stats = fold(&leaves);
        assert_eq!(stats.total_requested, 4);
        assert_eq!(stats.total_confirmed, 2);
        assert_eq!(stats.total_pending, 1);
        assert_eq!(stats.total_rejected, 1);
        assert_eq!(stats.immediate_requests, 1);
        assert_eq!(stats.approve_rate, 50.0);
        assert_eq!(stats.average_requests_per_user, 4.0 / 3.0);
    }

    #[test]
    fn months_are_sorted_and_count_admin_decisions() {
        let leaves = vec![
            request(
                "u1",
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                RequestType::Wishlist,
                LeaveStatus::Rejected,
            ),
            request(
                "u2",
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                RequestType::Wishlist,
                LeaveStatus::Approved,
            ),
        ];

        let stats = fold(&leaves);
        let months: Vec<&str> = stats
            .requests_by_month
            .iter()
            .map(|m| m.month.as_str())
            .collect();
        assert_eq!(months, vec!["2025-06", "2025-07"]);
        assert_eq!(stats.requests_by_month[0].approved, 1);
        assert_eq!(stats.requests_by_month[1].rejected, 1);
    }

    #[test]
    fn top_users_sorted_by_volume_with_rates() {
        let june_2 = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let june_3 = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();

        let leaves = vec![
            request("u1", june_2, RequestType::Immediate, LeaveStatus::Confirmed),
            request("u1", june_3, RequestType::Wishlist, LeaveStatus::Pending),
            request("u2", june_2, RequestType::Wishlist, LeaveStatus::Pending),
        ];

        let stats = fold(&leaves);
        assert_eq!(stats.top_request_users.len(), 2);
        assert_eq!(stats.top_request_users[0].user_id, "u1");
        assert_eq!(stats.top_request_users[0].total_requests, 2);
        assert_eq!(stats.top_request_users[0].approval_rate, 50.0);
        assert_eq!(stats.top_request_users[1].approval_rate, 0.0);
    }
}
