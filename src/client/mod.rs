//! HTTP Client Module

pub mod http;

pub use http::{is_rate_limit_error, HttpClient, DEFAULT_REQUEST_TIMEOUT};
