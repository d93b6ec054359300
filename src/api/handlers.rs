//! HTTP endpoint handlers

use std::{sync::Arc, time::Instant};
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};

use super::responses::{HealthResponse, StatusResponse};
use crate::lifecycle::{Lifecycle, Phase};

/// State shared by the status endpoint
#[derive(Debug)]
pub struct StatusState {
    pub lifecycle: Lifecycle,
    pub address: String,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl StatusState {
    pub fn new(lifecycle: Lifecycle, address: String) -> Self {
        Self {
            lifecycle,
            address,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Calculate uptime as a formatted string
    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// Handle GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /status
pub async fn status_handler(State(state): State<Arc<StatusState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: state.lifecycle.phase() == Phase::Running,
        address: state.address.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
    })
}
