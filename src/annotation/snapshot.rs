use crate::foundation::error::{InkreelError, InkreelResult};

/// Timestamped serialization of the whole scene graph.
///
/// Wire format is `{"timestamp": <seconds>, "canvasJSON": "<scene graph json>"}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationSnapshot {
    /// Seconds since recording start, `>= 0`.
    pub timestamp: f64,
    /// Output of [`SceneGraph::to_json`](crate::SceneGraph::to_json).
    #[serde(rename = "canvasJSON")]
    pub canvas_json: String,
}

/// Append-only snapshot list for one recording.
///
/// Inactive until [`SnapshotLog::begin`] records the recording start time; captures before that
/// are dropped.
#[derive(Clone, Debug, Default)]
pub struct SnapshotLog {
    start_ms: Option<u64>,
    snapshots: Vec<AnnotationSnapshot>,
}

impl SnapshotLog {
    /// Empty, inactive log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the recording start. Clears snapshots from any previous take.
    pub fn begin(&mut self, start_ms: u64) {
        self.start_ms = Some(start_ms);
        self.snapshots.clear();
    }

    /// Whether a recording start time is set.
    pub fn is_active(&self) -> bool {
        self.start_ms.is_some()
    }

    /// Append a snapshot taken at `now_ms`. Returns `false` (and does nothing) when inactive.
    pub fn capture(&mut self, now_ms: u64, canvas_json: String) -> bool {
        let Some(start) = self.start_ms else {
            return false;
        };
        let mut timestamp = now_ms.saturating_sub(start) as f64 / 1000.0;
        if let Some(last) = self.snapshots.last() {
            timestamp = timestamp.max(last.timestamp);
        }
        self.snapshots.push(AnnotationSnapshot {
            timestamp,
            canvas_json,
        });
        true
    }

    /// Captured snapshots in capture order.
    pub fn snapshots(&self) -> &[AnnotationSnapshot] {
        &self.snapshots
    }

    /// Move the snapshots out, leaving the log active with an empty list.
    pub fn take(&mut self) -> Vec<AnnotationSnapshot> {
        std::mem::take(&mut self.snapshots)
    }

    /// Back to the inactive, empty state.
    pub fn reset(&mut self) {
        self.start_ms = None;
        self.snapshots.clear();
    }
}

/// Encode snapshots as the JSON array sidecar.
pub fn encode_snapshots(snapshots: &[AnnotationSnapshot]) -> InkreelResult<String> {
    serde_json::to_string(snapshots)
        .map_err(|e| InkreelError::serde(format!("snapshot encode failed: {e}")))
}

/// Decode the JSON array sidecar.
pub fn decode_snapshots(json: &str) -> InkreelResult<Vec<AnnotationSnapshot>> {
    let snapshots: Vec<AnnotationSnapshot> = serde_json::from_str(json)
        .map_err(|e| InkreelError::serde(format!("snapshot decode failed: {e}")))?;
    if let Some(bad) = snapshots
        .iter()
        .find(|s| !s.timestamp.is_finite() || s.timestamp < 0.0)
    {
        return Err(InkreelError::serde(format!(
            "snapshot timestamp {} is not a non-negative number",
            bad.timestamp
        )));
    }
    Ok(snapshots)
}

#[cfg(test)]
#[path = "../../tests/unit/annotation/snapshot.rs"]
mod tests;
