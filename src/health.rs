use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let storage = state.store.status().await;

    let status = if storage.exists && storage.writable {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "storage": {
            "recordings_dir": storage.path,
            "exists": storage.exists,
            "writable": storage.writable,
            "max_upload_bytes": state.policy.max_bytes,
            "field_name": state.policy.field_name
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "uploads_accepted": metrics.uploads_accepted,
            "uploads_rejected": metrics.uploads_rejected,
            "uploads_failed": metrics.uploads_failed
        },
        "memory": get_memory_info()
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "uploads": {
            "accepted": metrics.uploads_accepted,
            "rejected": metrics.uploads_rejected,
            "failed": metrics.uploads_failed,
            "bytes_stored": metrics.bytes_stored
        },
        "endpoints": endpoint_stats,
        "memory": get_memory_info()
    }))
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", process::id())) {
            let read_kb = |prefix: &str| {
                status
                    .lines()
                    .find(|line| line.starts_with(prefix))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|kb| kb.parse::<u64>().ok())
                    .unwrap_or(0)
                    * 1024
            };

            return json!({
                "resident_memory_bytes": read_kb("VmRSS:"),
                "virtual_memory_bytes": read_kb("VmSize:"),
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false,
        "note": format!("Memory info not available for pid {}", process::id())
    })
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{test_app, test_state};
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_reports_storage() {
        let (_tmp, state) = test_state();
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"]["exists"], true);
        assert_eq!(body["storage"]["field_name"], "audio-file");
    }

    #[actix_web::test]
    async fn test_missing_directory_is_degraded() {
        let (tmp, _) = test_state();
        let mut config = crate::config::AppConfig::default();
        config.storage.recordings_dir = tmp.path().join("gone");
        let app = test::init_service(test_app(crate::state::AppState::new(config))).await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "degraded");
    }
}
