pub mod cache;
pub mod dates;
pub mod db_utils;
pub mod username_filter;
