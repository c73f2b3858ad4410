use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::redirect::Policy;
use reqwest::Client;

const APP_USER_AGENT: &str = "ExoInstaller/0.1.0";

/// Client for the remote configuration fetch: whole-request timeout,
/// redirects handled by reqwest.
pub fn build_config_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Client for archive downloads.
///
/// Redirects are disabled here because the downloader follows them itself
/// with an explicit hop limit. `identity` encoding keeps `Content-Length`
/// equal to the bytes written to disk.
pub fn build_download_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(connect_timeout)
        .redirect(Policy::none())
        .build()
}
