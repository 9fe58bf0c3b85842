//! # Simulation Trigger
//!
//! `POST /run-sim` starts the configured simulation program, forwards its
//! output to the server log line by line, and answers once it exits:
//!
//! ```json
//! { "status": "Simulation complete", "code": 0 }
//! ```
//!
//! `code` is `null` when the process was terminated by a signal. The
//! simulation shares nothing with the recording pipeline.

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{error, info};

pub async fn run_simulation(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let simulation = &state.config.simulation;

    info!(
        program = %simulation.program,
        script = %simulation.script.display(),
        "Starting simulation"
    );

    let mut child = Command::new(&simulation.program)
        .arg(&simulation.script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            error!(program = %simulation.program, error = %err, "Failed to start simulation");
            AppError::SimulationFailed(format!("failed to start {}: {}", simulation.program, err))
        })?;

    let stdout = forward_lines(child.stdout.take(), |line| info!("Robot: {}", line));
    let stderr = forward_lines(child.stderr.take(), |line| error!("Error: {}", line));

    let (status, _, _) = tokio::join!(child.wait(), stdout, stderr);
    let status = status.map_err(|err| {
        error!(error = %err, "Failed to wait for simulation");
        AppError::SimulationFailed(err.to_string())
    })?;

    let code = status.code();
    info!(code = ?code, "Simulation ended");

    Ok(HttpResponse::Ok().json(json!({
        "status": "Simulation complete",
        "code": code,
    })))
}

/// Pass every non-empty line of a child's output stream to `log`.
async fn forward_lines<R>(stream: Option<R>, log: impl Fn(&str))
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if !line.is_empty() {
                    log(line);
                }
            }
            Ok(None) => break,
            Err(err) => {
                error!(error = %err, "Failed to read simulation output");
                break;
            }
        }
    }
}
