//! Latest-version resolution against the release status endpoint.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;

/// Plain-text status endpoint: the first line is the latest published
/// version, the second line (when present) the installer download URL.
pub const VERSION_ENDPOINT: &str =
    "https://raw.githubusercontent.com/example/PPVviaVLC/main/VERSION";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Latest published release, fetched fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub latest: String,
    pub download_url: Option<String>,
}

/// Blocking client for status checks.
pub fn http_client() -> Result<Client> {
    Ok(Client::builder().timeout(FETCH_TIMEOUT).build()?)
}

/// Fetch the latest published version.
///
/// Every failure mode (transport error, timeout, non-success status, blank
/// body) comes back as `None`; callers treat that as "update check
/// unavailable" and stop the flow there.
pub fn fetch_latest(client: &Client) -> Option<VersionInfo> {
    let body = client
        .get(VERSION_ENDPOINT)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text());
    match body {
        Ok(body) => parse_status_body(&body),
        Err(e) => {
            log::warn!("version check failed: {}", e);
            None
        }
    }
}

/// Split a status body into version and optional download URL.
pub fn parse_status_body(body: &str) -> Option<VersionInfo> {
    let mut lines = body.lines().map(str::trim);
    let latest = lines.next().filter(|line| !line.is_empty())?.to_owned();
    let download_url = lines
        .next()
        .filter(|line| !line.is_empty())
        .map(str::to_owned);
    Some(VersionInfo {
        latest,
        download_url,
    })
}

/// Whether an update should be offered.
///
/// Plain string inequality on purpose: the publisher pins an exact version
/// string, so any mismatch means a different release is out. `"1.0"` versus
/// `"1.0.0"` counts as an update; there is no semantic ordering here.
pub fn update_needed(installed: &str, latest: &str) -> bool {
    installed != latest
}
