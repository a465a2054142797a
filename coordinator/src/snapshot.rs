//! Pass-through hook for periodic pheromone snapshots.
//!
//! Rendering is someone else's job; the coordinator only hands the current
//! levels to a [`SnapshotSink`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use antroute_core::{EdgeKey, Result};

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn save(&self, iteration: u32, levels: &[(EdgeKey, f32)]) -> Result<()>;
}

/// Logs a one-line summary of the table.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSnapshotSink;

#[async_trait]
impl SnapshotSink for LogSnapshotSink {
    async fn save(&self, iteration: u32, levels: &[(EdgeKey, f32)]) -> Result<()> {
        let mean = if levels.is_empty() {
            0.0
        } else {
            levels.iter().map(|(_, l)| *l).sum::<f32>() / levels.len() as f32
        };
        let strongest = levels
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, l)| format!("{}={:.3}", k, l))
            .unwrap_or_else(|| "none".into());
        info!(iteration, edges = levels.len(), mean, strongest = %strongest, "Pheromone snapshot");
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotFile {
    iteration: u32,
    timestamp_ms: i64,
    edges: Vec<EdgeLevel>,
}

#[derive(Serialize)]
struct EdgeLevel {
    from: u32,
    to: u32,
    level: f32,
}

/// Writes `pheromone_frame_<iteration>.json` into a directory.
///
/// Every ant asks for the same iterations, so files are written to a unique
/// temporary name and renamed into place; the last writer wins.
#[derive(Debug)]
pub struct JsonSnapshotSink {
    dir: PathBuf,
    writes: AtomicU64,
}

impl JsonSnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn frame_path(&self, iteration: u32) -> PathBuf {
        self.dir.join(format!("pheromone_frame_{}.json", iteration))
    }
}

#[async_trait]
impl SnapshotSink for JsonSnapshotSink {
    async fn save(&self, iteration: u32, levels: &[(EdgeKey, f32)]) -> Result<()> {
        let file = SnapshotFile {
            iteration,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            edges: levels
                .iter()
                .map(|(key, level)| EdgeLevel {
                    from: key.low(),
                    to: key.high(),
                    level: *level,
                })
                .collect(),
        };
        let body = serde_json::to_vec_pretty(&file)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".pheromone_frame_{}.{}.tmp", iteration, n));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, self.frame_path(iteration)).await?;
        Ok(())
    }
}
