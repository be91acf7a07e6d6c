//! In-process fixture: the full router over in-memory doubles, plus a throwaway
//! ad server on a random local port.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use flate2::Compression;
use flate2::write::GzEncoder;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use ad_normalizer::app::create_app;
use ad_normalizer::common::url::join_path;
use ad_normalizer::config::settings::AppConfig;
use ad_normalizer::modules::transcode::{TranscodeInfo, TranscodeStatus};
use ad_normalizer::testing::{MemoryStore, MockJobSubmitter, test_state};

pub const TEST_VAST: &str = include_str!("../data/test_vast.xml");
pub const TEST_VMAP: &str = include_str!("../data/test_vmap.xml");

/// Cache key of the best rendition in `test_vast.xml` under the default regex.
pub const VIDEO2_KEY: &str = "httpexamplecomvideo2mp4";
pub const VIDEO3_KEY: &str = "httpexamplecomvideo3mp4";

pub struct TestFixture {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jobs: Arc<MockJobSubmitter>,
    pub ad_server: Url,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not json")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config("", |_| {}).await
    }

    /// `ad_server_path` is prepended to every upstream request path, which selects
    /// one of the mock ad server's behaviours (`/broken`, `/gzip`, ...).
    pub async fn with_config(ad_server_path: &str, configure: impl FnOnce(&mut AppConfig)) -> Self {
        let ad_server = spawn_ad_server().await;
        let store = Arc::new(MemoryStore::default());
        let jobs = Arc::new(MockJobSubmitter::default());

        let upstream = join_path(&ad_server, ad_server_path);
        let state = test_state(store.clone(), jobs.clone(), |config| {
            config.ad_server_url = upstream;
            configure(config);
        });

        Self {
            router: create_app(state),
            store,
            jobs,
            ad_server,
        }
    }

    pub fn seed_completed(&self, key: &str, url: &str) {
        self.store.insert(
            key,
            TranscodeInfo {
                url: url.to_string(),
                aspect_ratio: "16:9".to_string(),
                frame_rates: vec![25.0],
                status: TranscodeStatus::Completed,
            },
        );
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.get_with_headers(uri, &[]).await
    }

    pub async fn get_with_headers(&self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut request = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, content_type: &str, body: impl Into<Body>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.post(uri, "application/json", body.to_string()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn xml(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

async fn gzipped_vast() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        gzip(TEST_VAST.as_bytes()),
    )
}

/// An error whose body claims gzip but is plain text.
async fn mislabelled_error() -> impl IntoResponse {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_ENCODING, "gzip")],
        "no fill",
    )
}

/// Only answers when the normalizer forwarded the device headers.
async fn strict_vast(headers: HeaderMap) -> axum::response::Response {
    let expected = [
        ("x-device-user-agent", "TestPlayer/1.0"),
        ("x-forwarded-for", "203.0.113.7"),
        ("accept", "application/xml"),
        ("accept-encoding", "gzip"),
        ("user-agent", "ad-normalizer"),
    ];
    for (name, value) in expected {
        if headers.get(name).and_then(|v| v.to_str().ok()) != Some(value) {
            return (StatusCode::BAD_REQUEST, format!("bad {name}")).into_response();
        }
    }
    xml(TEST_VAST).into_response()
}

async fn spawn_ad_server() -> Url {
    let app = Router::new()
        .route("/vast", get(|| async { xml(TEST_VAST) }))
        .route("/vmap", get(|| async { xml(TEST_VMAP) }))
        .route("/gzip/vast", get(gzipped_vast))
        .route("/strict/vast", get(strict_vast))
        .route(
            "/broken/vast",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "ad server down") }),
        )
        .route("/mislabelled/vast", get(mislabelled_error))
        .route("/invalid/vast", get(|| async { xml("<VAST><Ad></VAST>") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}
