pub mod random_headers;
pub mod request_log_middleware;
pub mod session_middleware;
