// Common test utilities and setup
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use serde_json::Value;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use zip::{write::FileOptions, ZipWriter};

use servant_api::{
    api,
    site::{Binding, Site, SiteState},
    Config, SiteManager, SiteRegistry,
};

pub use axum::body::to_bytes;

pub const KEY: &str = "s3cret";
pub const BOUNDARY: &str = "servant-test-boundary";

/// A router over a fresh registry in a temporary directory
pub struct TestApp {
    pub router: Router,
    pub registry: Arc<SiteRegistry>,
    pub dir: TempDir,
}

pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.key = KEY.to_string();
    config.sites.registry = dir.join("sites.json");
    config
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

pub fn create_test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(dir.path());
    tweak(&mut config);

    let registry = Arc::new(
        SiteRegistry::load(&config.sites.registry).expect("Failed to create registry"),
    );
    let router = api::router(config, registry.clone() as Arc<dyn SiteManager>);

    TestApp {
        router,
        registry,
        dir,
    }
}

pub fn sample_site(name: &str, port: u16, site_path: &str) -> Site {
    Site {
        iis_id: 0,
        name: name.to_string(),
        application_pool: format!("{}Pool", name),
        site_state: SiteState::Started,
        bindings: vec![Binding {
            protocol: "http".to_string(),
            hostname: format!("{}.example.com", name),
            port,
            ip_address: "*".to_string(),
        }],
        site_path: site_path.to_string(),
        log_file_directory: "/var/log/iis".to_string(),
    }
}

/// Register a site and return its IIS id
pub fn seed_site(app: &TestApp, site: Site) -> i64 {
    let result = app.registry.create_site(site).expect("Failed to seed site");
    assert!(result.is_success(), "seed failed: {:?}", result.errors);
    result.iis_site_id
}

/// Append the API key to a path
pub fn keyed(path: &str) -> String {
    if path.contains('?') {
        format!("{}&key={}", path, KEY)
    } else {
        format!("{}?key={}", path, KEY)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// POST a site as form field `data`
pub fn post_site_form(uri: &str, site: &Site) -> Request<Body> {
    let data = serde_json::to_string(site).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(format!("data={}", form_encode(&data))))
        .unwrap()
}

/// POST a site as a JSON body
pub fn post_site_json(uri: &str, site: &Site) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(site).unwrap()))
        .unwrap()
}

/// POST a multipart form; `file` is (field name, file name, content)
pub fn post_multipart(
    uri: &str,
    text_fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in text_fields {
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .unwrap();
    }

    if let Some((name, file_name, content)) = file {
        write!(
            body,
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/zip\r\n\r\n",
            BOUNDARY, name, file_name
        )
        .unwrap();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }

    write!(body, "--{}--\r\n", BOUNDARY).unwrap();

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Zip archive holding `entries` as (name, content)
pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Extract JSON body from response
pub async fn get_body_json(response: Response<Body>) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&body).expect("Failed to parse JSON")
}

/// Extract text body from response
pub async fn get_body_text(response: Response<Body>) -> String {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(body.to_vec()).expect("Body is not UTF-8")
}

fn form_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
