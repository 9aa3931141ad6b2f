//! Reports and the run record.

use carto_model::{BoundingBox, CategoryKey, Crs};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How one stage ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum StageOutcome {
    /// Produced the artifact at this path.
    Completed(PathBuf),
    /// Failed with this message.
    Failed(String),
    /// Not attempted because an earlier stage failed.
    Skipped,
}

impl StageOutcome {
    /// Whether the stage produced its artifact.
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }

    /// Short label for summaries and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Completed(_) => "completed",
            StageOutcome::Failed(_) => "failed",
            StageOutcome::Skipped => "skipped",
        }
    }
}

/// Per-stage outcomes of the elevation pipeline, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElevationReport {
    /// `(stage, outcome)` pairs.
    pub stages: Vec<(String, StageOutcome)>,
}

impl ElevationReport {
    /// Outcome of a stage.
    pub fn get(&self, stage: &str) -> Option<&StageOutcome> {
        self.stages.iter().find(|(s, _)| s == stage).map(|(_, o)| o)
    }

    /// Number of completed stages.
    pub fn completed(&self) -> usize {
        self.stages.iter().filter(|(_, o)| o.is_completed()).count()
    }

    pub(crate) fn record(&mut self, stage: &str, outcome: StageOutcome) {
        self.stages.push((stage.to_string(), outcome));
    }
}

/// How one feature category ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CategoryOutcome {
    /// Fetched with this many features.
    Fetched {
        /// Feature count.
        features: usize,
    },
    /// Replaced by an empty placeholder.
    Placeholder {
        /// Why the fetch failed.
        reason: String,
    },
}

/// Outcomes of the feature acquisition pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquisitionReport {
    /// Outcome per category, in acquisition order.
    pub categories: Vec<(CategoryKey, CategoryOutcome)>,
    /// Query bounds in EPSG:4326.
    pub query_bounds: Option<BoundingBox>,
}

impl AcquisitionReport {
    /// Categories fetched from the service.
    pub fn fetched(&self) -> usize {
        self.categories
            .iter()
            .filter(|(_, o)| matches!(o, CategoryOutcome::Fetched { .. }))
            .count()
    }

    /// Categories replaced by placeholders.
    pub fn placeholders(&self) -> usize {
        self.categories.len() - self.fetched()
    }
}

/// Outcomes of the reprojection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReprojectReport {
    /// Layers replaced by a reprojected copy.
    pub reprojected: Vec<String>,
    /// Layers already in the target reference.
    pub unchanged: Vec<String>,
    /// Layers whose reprojection failed; left in place.
    pub failed: Vec<(String, String)>,
}

/// Record of one pipeline session.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    /// Identifier derived from the start time.
    pub id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last operation ended.
    pub finished_at: Option<DateTime<Utc>>,
    /// Target reference of the run.
    pub target_crs: Crs,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Extent bounds, once defined.
    pub extent: Option<BoundingBox>,
    /// Latest outcome per stage.
    pub stages: BTreeMap<String, StageOutcome>,
    /// Latest outcome per feature category.
    pub categories: BTreeMap<CategoryKey, CategoryOutcome>,
    /// Last reported percentage.
    pub progress: u8,
}

impl PipelineRun {
    /// A fresh record stamped with the current time.
    pub fn new(target_crs: Crs, output_dir: PathBuf) -> Self {
        let started_at = Utc::now();
        Self {
            id: started_at.format("%Y%m%dT%H%M%SZ").to_string(),
            started_at,
            finished_at: None,
            target_crs,
            output_dir,
            extent: None,
            stages: BTreeMap::new(),
            categories: BTreeMap::new(),
            progress: 0,
        }
    }

    /// Seconds since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// YAML summary.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_report_lookup() {
        let mut report = ElevationReport::default();
        report.record("clip", StageOutcome::Completed("clipped_dem.tif".into()));
        report.record("reproject", StageOutcome::Failed("boom".to_string()));
        report.record("hillshade", StageOutcome::Skipped);

        assert_eq!(report.completed(), 1);
        assert_eq!(report.get("hillshade"), Some(&StageOutcome::Skipped));
        assert_eq!(report.get("render"), None);
        assert_eq!(report.get("reproject").unwrap().label(), "failed");
    }

    #[test]
    fn test_run_record_yaml() {
        let mut run = PipelineRun::new(Crs::new("EPSG:32650").unwrap(), "out".into());
        run.categories.insert(
            CategoryKey::Roads,
            CategoryOutcome::Placeholder {
                reason: "HTTP 504".to_string(),
            },
        );
        run.stages.insert("clip".to_string(), StageOutcome::Skipped);
        let yaml = run.to_yaml().unwrap();
        assert!(yaml.contains("EPSG:32650"));
        assert!(yaml.contains("roads:"));
        assert!(yaml.contains("status: placeholder"));
        assert_eq!(run.id.len(), "20260101T000000Z".len());
    }
}
