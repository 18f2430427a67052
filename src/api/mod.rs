pub mod attendance;
pub mod birthday;
pub mod dashboard;
pub mod department;
pub mod employee;
pub mod exit;
pub mod holiday;
pub mod import;
pub mod leave_balance;
pub mod leave_request;
pub mod notification;
pub mod salary_slip;
