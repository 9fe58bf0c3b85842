pub mod recordings;
pub mod simulation;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

pub use recordings::*;
pub use simulation::*;
pub use upload::*;

use crate::health;
use actix_web::web;

/// Register every API route. Static assets are mounted separately in `main`
/// because they catch all remaining paths.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload_recording))
        .route("/recordings", web::get().to(list_recordings))
        .route("/run-sim", web::post().to(run_simulation))
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics)),
        );
}
