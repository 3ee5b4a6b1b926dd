//! Utility modules supporting harvest operations.

mod http;

pub use http::HttpClient;
