use crate::api::attendance::{
    AttendanceListResponse, CalendarDay, CalendarResponse, CalendarSummary, EditRequestReq, PunchReq,
    TodayResponse,
};
use crate::api::birthday::{UpcomingBirthday, WishReq};
use crate::api::dashboard::DashboardSummary;
use crate::api::department::DepartmentReq;
use crate::api::employee::{CreateEmployee, CreateEmployeeReq, EmployeeListResponse, EmployeeQuery};
use crate::api::exit::{
    ClearanceReq, InterviewFeedbackReq, InterviewReq, ResignationReq, TransferReq, TransferStatusReq,
};
use crate::api::holiday::HolidayReq;
use crate::api::import::{ImportReport, ImportReq, ImportedRow, RowError};
use crate::api::leave_balance::AllocationStatus;
use crate::api::leave_request::{CreateLeave, LeaveDetail, LeaveFilter, LeaveListResponse, ReviewReq};
use crate::api::salary_slip::{CreateSlip, PaginatedSlipResponse, SlipQuery, UpdateSlip};
use crate::auth::auth::AuthUser;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{Attendance, AttendanceEditRequest, AttendanceStatus, DayStatus, PunchAction};
use crate::model::department::Department;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::exit::{
    Clearance, ClearanceStatus, ExitInterview, ExitProgress, InterviewStatus, KnowledgeTransfer, Resignation,
    ResignationStatus, TransferStatus,
};
use crate::model::holiday::{Holiday, HolidayKind};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::notification::{Notification, NotificationKind};
use crate::model::role::Role;
use crate::model::salary_slip::{SalarySlip, SlipFigures};
use crate::models::{AccountReq, CreateAccountReq, LoginReqDto};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Portal API",
        version = "1.0.0",
        description = r#"
## HR Portal

Back office API for a small organisation's HR team, with a self-service side for employees.

### Key Features
- **Employees**
  - Create, update, block and offboard employees; bulk import from spreadsheet rows
- **Attendance**
  - Punch in / punch out with location, monthly calendar, edit requests
- **Leave**
  - Apply, approve or reject, monthly accrual of balances
- **Payroll**
  - Monthly salary slips with loss-of-pay deduction
- **Holidays & Birthdays**
  - Holiday calendar, upcoming birthday widget with wishes
- **Exit**
  - Resignation, clearances, knowledge transfer, exit interview, offboarding

### Security
Endpoints under `/api` require a **JWT Bearer** access token.
HR and Admin roles see everything; employees see their own records.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::register,

        crate::api::dashboard::summary,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::my_profile,
        crate::api::employee::update_employee,
        crate::api::employee::update_my_profile,
        crate::api::employee::block_employee,
        crate::api::employee::unblock_employee,
        crate::api::employee::delete_employee,
        crate::api::import::import_employees,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::attendance::punch_in,
        crate::api::attendance::punch_out,
        crate::api::attendance::today,
        crate::api::attendance::calendar,
        crate::api::attendance::list_attendance,
        crate::api::attendance::create_edit_request,
        crate::api::attendance::list_edit_requests,
        crate::api::attendance::approve_edit_request,
        crate::api::attendance::reject_edit_request,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::leave_balance::my_balance,
        crate::api::leave_balance::employee_balance,
        crate::api::leave_balance::allocation_status,
        crate::api::leave_balance::allocate,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::update_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::salary_slip::generate_slip,
        crate::api::salary_slip::update_slip,
        crate::api::salary_slip::get_slip,
        crate::api::salary_slip::list_slips,
        crate::api::salary_slip::my_slips,

        crate::api::birthday::upcoming,
        crate::api::birthday::wish,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read,

        crate::api::exit::submit_resignation,
        crate::api::exit::list_resignations,
        crate::api::exit::accept_resignation,
        crate::api::exit::reject_resignation,
        crate::api::exit::withdraw_resignation,
        crate::api::exit::update_clearance,
        crate::api::exit::create_transfer,
        crate::api::exit::update_transfer,
        crate::api::exit::schedule_interview,
        crate::api::exit::complete_interview,
        crate::api::exit::progress,
        crate::api::exit::offboard
    ),
    components(
        schemas(
            AuthUser,
            LoginReqDto,
            LoginResponse,
            AccountReq,
            CreateAccountReq,
            Role,
            DashboardSummary,
            CreateEmployee,
            CreateEmployeeReq,
            EmployeeQuery,
            EmployeeListResponse,
            Employee,
            EmployeeStatus,
            ImportReq,
            ImportReport,
            ImportedRow,
            RowError,
            Department,
            DepartmentReq,
            Attendance,
            AttendanceStatus,
            AttendanceEditRequest,
            PunchReq,
            PunchAction,
            TodayResponse,
            DayStatus,
            CalendarDay,
            CalendarSummary,
            CalendarResponse,
            AttendanceListResponse,
            EditRequestReq,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            CreateLeave,
            LeaveFilter,
            LeaveDetail,
            LeaveListResponse,
            ReviewReq,
            LeaveBalance,
            AllocationStatus,
            Holiday,
            HolidayKind,
            HolidayReq,
            SalarySlip,
            SlipFigures,
            CreateSlip,
            UpdateSlip,
            SlipQuery,
            PaginatedSlipResponse,
            UpcomingBirthday,
            WishReq,
            Notification,
            NotificationKind,
            Resignation,
            ResignationStatus,
            ResignationReq,
            Clearance,
            ClearanceStatus,
            ClearanceReq,
            KnowledgeTransfer,
            TransferStatus,
            TransferReq,
            TransferStatusReq,
            ExitInterview,
            InterviewStatus,
            InterviewReq,
            InterviewFeedbackReq,
            ExitProgress
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and accounts"),
        (name = "Dashboard", description = "HR overview"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department master data"),
        (name = "Attendance", description = "Punch in/out, calendar and edit requests"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Leave Balance", description = "Balances and monthly allocation"),
        (name = "Holiday", description = "Holiday calendar"),
        (name = "Payroll", description = "Monthly salary slips"),
        (name = "Birthday", description = "Upcoming birthdays and wishes"),
        (name = "Notification", description = "In-app notifications"),
        (name = "Exit", description = "Resignation and offboarding"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_registers_bearer_scheme_and_routes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/attendance/punch-in"));
        assert!(doc.paths.paths.contains_key("/api/exit/{resignation_id}/offboard"));
    }
}
