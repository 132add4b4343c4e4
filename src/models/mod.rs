pub mod aggregations;
pub mod bulk;
pub mod search_result;
pub mod server_info;
