pub mod http_client;
pub mod human_format;
pub mod status_code_matcher;
pub mod url;

pub use http_client::{FetchResponse, HttpTransport, ProbeResponse, ReqwestTransport};
pub use human_format::{format_duration, format_elapsed, format_latency_ms};
pub use status_code_matcher::is_status_acceptable;
pub use url::UrlUtils;
