use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::debug;

use super::state::ApiState;

/// CPU usage is measured over this window before the first event.
const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// One server-sent stats sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Whole-machine CPU usage, percent.
    pub cpu: f32,
    /// Used / total memory, percent.
    pub mem: f32,
    /// SoC temperature in °C, 0.0 when unreadable.
    pub temp: f32,
}

/// Read a sysfs thermal zone (millidegrees) as °C.
pub async fn read_temperature(path: &Path) -> f32 {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw.trim().parse::<f32>().map(|m| m / 1000.0).unwrap_or(0.0),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "thermal zone unreadable");
            0.0
        }
    }
}

struct Sampler {
    system: System,
    thermal_path: PathBuf,
}

impl Sampler {
    fn new(thermal_path: PathBuf) -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            system,
            thermal_path,
        }
    }

    async fn sample(&mut self) -> SystemStats {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let mem = if total == 0 {
            0.0
        } else {
            (self.system.used_memory() as f64 / total as f64 * 100.0) as f32
        };
        SystemStats {
            cpu: self.system.global_cpu_usage(),
            mem,
            temp: read_temperature(&self.thermal_path).await,
        }
    }
}

/// Endless stream of samples: the first after [`CPU_SAMPLE_WINDOW`], then
/// one every `interval`.
pub(crate) fn stats_stream(
    thermal_path: PathBuf,
    interval: Duration,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let sampler = Sampler::new(thermal_path);
    stream::unfold((sampler, CPU_SAMPLE_WINDOW), move |(mut sampler, wait)| async move {
        tokio::time::sleep(wait).await;
        let stats = sampler.sample().await;
        Some((Event::default().json_data(stats), (sampler, interval)))
    })
}

/// GET /system-stats -- `text/event-stream` of [`SystemStats`] until the client goes away.
pub(crate) async fn system_stats(
    State(state): State<Arc<ApiState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    Sse::new(stats_stream(state.thermal_path.clone(), state.stats_interval))
        .keep_alive(KeepAlive::default())
}
