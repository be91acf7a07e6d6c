use std::io::Read;

use axum::http::{HeaderMap, StatusCode, header};
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::common::error::AppError;
use crate::common::url::{join_path, replace_subdomain};
use crate::infrastructure::http::client::USER_AGENT;

pub const DEVICE_USER_AGENT: &str = "x-device-user-agent";
pub const FORWARDED_FOR: &str = "x-forwarded-for";

const SUBDOMAIN_PARAM: &str = "subdomain";

/// Ad-server URL for an inbound request: `path` appended to the base path, query
/// parameters copied except `subdomain`, which rewrites the host instead.
pub fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = join_path(base, path);
    let mut forwarded: Vec<String> = url.query().map(|q| vec![q.to_string()]).unwrap_or_default();
    let mut subdomain = None;

    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        if name.eq_ignore_ascii_case(SUBDOMAIN_PARAM) {
            subdomain = Some(decode_component(value));
        } else {
            forwarded.push(pair.to_string());
        }
    }

    let joined = forwarded.join("&");
    url.set_query((!joined.is_empty()).then_some(joined.as_str()));

    if let Some(subdomain) = subdomain.filter(|s| !s.is_empty()) {
        replace_subdomain(&mut url, &subdomain);
    }
    url
}

fn decode_component(raw: &str) -> String {
    url::form_urlencoded::parse(format!("v={raw}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Fetches an ad document. Non-200 answers come back as [`AppError::Upstream`]
/// carrying the ad server's status and body.
pub async fn fetch(client: &Client, url: Url, inbound: &HeaderMap) -> Result<Bytes, AppError> {
    let mut request = client
        .get(url.clone())
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, "application/xml")
        .header(header::ACCEPT_ENCODING, "gzip");
    for name in [DEVICE_USER_AGENT, FORWARDED_FOR] {
        if let Some(value) = inbound.get(name) {
            request = request.header(name, value.clone());
        }
    }

    let response = request.send().await.map_err(AppError::Fetch)?;
    let status = response.status();
    let gzipped = response
        .headers()
        .get(header::CONTENT_ENCODING)
        .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"gzip"));
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

    let raw = response.bytes().await.map_err(AppError::Fetch)?;

    if status != StatusCode::OK {
        warn!(%url, %status, "ad server returned an error");
        // Error bodies are relayed even when they are not the gzip they claim to be.
        let body = if gzipped {
            gunzip(&raw).unwrap_or(raw)
        } else {
            raw
        };
        return Err(AppError::Upstream {
            status,
            body,
            content_type,
        });
    }

    let body = if gzipped {
        gunzip(&raw).map_err(AppError::Decompress)?
    } else {
        raw
    };

    debug!(%url, bytes = body.len(), "fetched ad document");
    Ok(body)
}

pub fn gunzip(compressed: &[u8]) -> std::io::Result<Bytes> {
    let mut decoded = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut decoded)?;
    Ok(Bytes::from(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    fn base() -> Url {
        Url::parse("https://ads.example.com/api/v2").unwrap()
    }

    #[test]
    fn appends_path_and_copies_query() {
        let url = upstream_url(&base(), "/vast", Some("dur=30&uid=a%20b"));
        assert_eq!(url.as_str(), "https://ads.example.com/api/v2/vast?dur=30&uid=a%20b");
    }

    #[test]
    fn subdomain_rewrites_host_and_is_not_forwarded() {
        let url = upstream_url(&base(), "/vmap", Some("SubDomain=eu&dur=30"));
        assert_eq!(url.as_str(), "https://eu.example.com/api/v2/vmap?dur=30");
    }

    #[test]
    fn no_query_leaves_none() {
        let url = upstream_url(&base(), "/vast", None);
        assert_eq!(url.query(), None);

        let url = upstream_url(&base(), "/vast", Some("subdomain=eu"));
        assert_eq!(url.query(), None);
        assert_eq!(url.host_str(), Some("eu.example.com"));
    }

    #[test]
    fn keeps_base_query() {
        let base = Url::parse("https://ads.example.com/?key=1").unwrap();
        let url = upstream_url(&base, "/vast", Some("dur=10"));
        assert_eq!(url.query(), Some("key=1&dur=10"));
    }

    #[test]
    fn gunzips_bodies() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<VAST/>").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(&gunzip(&compressed).unwrap()[..], b"<VAST/>");
        assert!(gunzip(b"not gzip").is_err());
    }
}
