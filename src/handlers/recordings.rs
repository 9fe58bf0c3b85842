//! `GET /recordings`: every stored recording, newest first.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{debug, error};

pub async fn list_recordings(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let recordings = state.store.list().await.map_err(|err| {
        error!(error = %err, "Error listing recordings");
        AppError::from(err)
    })?;

    debug!(count = recordings.len(), "Listed recordings");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": recordings.len(),
        "recordings": recordings,
    })))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{multipart_request, test_app, test_state, Part};
    use actix_web::http::StatusCode;
    use actix_web::test;

    macro_rules! get_listing {
        ($app:expr) => {{
            let req = test::TestRequest::get().uri("/recordings").to_request();
            let resp = test::call_service($app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: serde_json::Value = test::read_body_json(resp).await;
            body
        }};
    }

    #[actix_web::test]
    async fn test_empty_listing() {
        let (_tmp, state) = test_state();
        let app = test::init_service(test_app(state)).await;

        let body = get_listing!(&app);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
        assert_eq!(body["recordings"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_uploaded_size_appears_in_listing() {
        let (_tmp, state) = test_state();
        let app = test::init_service(test_app(state.clone())).await;

        let req = multipart_request(&[Part::file("audio-file", "r.webm", "audio/webm", &[9u8; 4096])]);
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let uploaded: serde_json::Value = test::read_body_json(resp).await;

        let body = get_listing!(&app);
        assert_eq!(body["count"], 1);
        let entry = &body["recordings"][0];
        assert_eq!(entry["filename"], uploaded["file"]["savedName"]);
        assert_eq!(entry["size"], 4096);
        assert_eq!(entry["path"], uploaded["file"]["path"]);
        assert!(entry["created"].is_string());
    }

    #[actix_web::test]
    async fn test_listing_is_newest_first_and_idempotent() {
        let (_tmp, state) = test_state();
        let app = test::init_service(test_app(state.clone())).await;

        for size in [100usize, 200, 300] {
            let req = multipart_request(&[Part::file("audio-file", "r.webm", "audio/webm", &vec![1u8; size])]);
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
            tokio::time::sleep(std::time::Duration::from_millis(15)).await;
        }
        std::fs::write(state.store.dir().join("readme.txt"), b"not a recording").unwrap();

        let first = get_listing!(&app);
        let second = get_listing!(&app);
        assert_eq!(first, second);
        assert_eq!(first["count"], 3);

        let created: Vec<chrono::DateTime<chrono::Utc>> = first["recordings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["created"].as_str().unwrap().parse().unwrap())
            .collect();
        assert!(created.windows(2).all(|pair| pair[0] >= pair[1]));

        let sizes: Vec<u64> = first["recordings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["size"].as_u64().unwrap())
            .collect();
        assert_eq!(sizes, vec![300, 200, 100]);
    }

    #[actix_web::test]
    async fn test_unreadable_directory_is_an_error() {
        let (tmp, _) = test_state();
        let mut config = crate::config::AppConfig::default();
        config.storage.recordings_dir = tmp.path().join("missing");
        let state = crate::state::AppState::new(config);
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get().uri("/recordings").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to list recordings");
    }
}
