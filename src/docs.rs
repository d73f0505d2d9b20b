use crate::api::attendance::CheckOutBody;
use crate::api::leave_calendar::{EditSlotBody, SettingBody};
use crate::api::leave_request::{CreateLeaveBody, DeleteLeaveBody, UpdateStatusBody};
use crate::leave::stats::{LeaveStatistics, MonthlyStats, UserStats, WeekdayStats};
use crate::model::attendance::AttendanceDay;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, RequestType};
use crate::model::setting::LeaveSetting;
use crate::model::slot::{ConfirmedLeave, DailySlot, PendingEntry};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Worktime Service API",
        version = "1.0.0",
        description = r#"
## Worktime: leave & attendance backend

This API manages daily leave slots with a fixed per-day capacity and
attendance check-in/out tracking.

### 🔹 Key Features
- **Leave Slot Allocation**
  - Requests against free capacity are confirmed immediately
  - Requests against a full day are queued as a wishlist
  - Cancellation reverses exactly the effect applied at creation
- **Leave Calendar**
  - Per-day capacity view with confirmed and pending membership lists
  - Per-day capacity editing and organization-wide defaults
- **Attendance Management**
  - Daily check-in and check-out tracking with working-hour computation
- **Statistics**
  - Status, request-type, monthly, weekday and per-user aggregation

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication**; tokens are
issued by the upstream identity service.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::pending_requests,
        crate::api::leave_request::update_request,

        crate::api::leave_calendar::calendar_list,
        crate::api::leave_calendar::calendar_detail,
        crate::api::leave_calendar::edit_max_slot,
        crate::api::leave_calendar::get_setting,
        crate::api::leave_calendar::update_setting,

        crate::api::statistics::statistical,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_attendance
    ),
    components(
        schemas(
            CreateLeaveBody,
            DeleteLeaveBody,
            UpdateStatusBody,
            EditSlotBody,
            SettingBody,
            CheckOutBody,
            LeaveRequest,
            LeaveStatus,
            RequestType,
            DailySlot,
            ConfirmedLeave,
            PendingEntry,
            LeaveSetting,
            AttendanceDay,
            LeaveStatistics,
            MonthlyStats,
            WeekdayStats,
            UserStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request APIs"),
        (name = "Calendar", description = "Daily slot and settings APIs"),
        (name = "Statistics", description = "Leave statistics APIs"),
        (name = "Attendance", description = "Attendance tracking APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}