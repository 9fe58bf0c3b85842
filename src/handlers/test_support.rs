//! Shared fixtures for handler tests: a scratch recordings directory and a
//! hand-built multipart body.

use crate::config::AppConfig;
use crate::state::AppState;
use actix_http::Request;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{test, web, App};
use tempfile::TempDir;

const BOUNDARY: &str = "----recorder-test-boundary-7MA4YWxkTrZu0gW";

/// App state whose recordings directory lives in a fresh temp dir.
/// The `TempDir` must be kept alive for the duration of the test.
pub fn test_state() -> (TempDir, AppState) {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage.recordings_dir = tmp.path().join("recordings");
    std::fs::create_dir_all(&config.storage.recordings_dir).unwrap();
    (tmp, AppState::new(config))
}

pub fn test_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .configure(super::configure_routes)
}

/// Sorted names of the recordings currently on disk.
pub fn recording_files(state: &AppState) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(state.store.dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".webm"))
        .collect();
    names.sort();
    names
}

pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl Part {
    pub fn file(name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            filename: Some(filename.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.to_vec(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            filename: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

pub fn multipart_request(parts: &[Part]) -> Request {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = &part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    test::TestRequest::post()
        .uri("/upload")
        .insert_header((
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request()
}
