use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use reqwest::Client;

pub const APP_USER_AGENT: &str = "EtherLauncher/0.1.0";

/// Shared HTTP client for archive transfers.
///
/// `identity` encoding keeps `Content-Length` equal to the streamed byte
/// count, which download percentages are computed from.
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(default_headers)
        .build()
}
