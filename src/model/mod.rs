pub mod attendance;
pub mod department;
pub mod employee;
pub mod exit;
pub mod holiday;
pub mod leave_balance;
pub mod leave_request;
pub mod notification;
pub mod role;
pub mod salary_slip;
