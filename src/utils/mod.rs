pub mod db_utils;
pub mod logging;
pub mod summary_cache;
