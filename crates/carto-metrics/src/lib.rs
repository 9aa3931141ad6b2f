//! Metrics for the Cartoflow pipeline.
//!
//! Every metric the pipeline records is declared here as a [`Metric`]
//! constant, so call sites never spell a metric name by hand. The `metrics`
//! facade is re-exported; no recorder is installed by this crate, so
//! recording is a no-op until the embedding application installs one.
//!
//! # Example
//!
//! ```rust
//! use carto_metrics::{metric_defs, StageLabels};
//!
//! let labels = StageLabels::new("hillshade");
//! metrics::counter!(metric_defs::STAGE_COMPLETED.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A metric declaration: name, kind, unit and description.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, e.g. `cartoflow.stage.completed`.
    pub name: &'static str,
    pub kind: MetricKind,
    pub unit: Unit,
    pub description: &'static str,
}

impl Metric {
    const fn new(kind: MetricKind, name: &'static str, unit: Unit, description: &'static str) -> Self {
        Self {
            name,
            kind,
            unit,
            description,
        }
    }

    /// Register this metric's description with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All pipeline metrics.
pub mod metric_defs {
    use super::{Metric, MetricKind, Unit};

    // Stages

    /// Stages that produced their artifact. Labelled by `stage`.
    pub const STAGE_COMPLETED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.stage.completed",
        Unit::Count,
        "Pipeline stages completed",
    );

    /// Stages that failed. Labelled by `stage`.
    pub const STAGE_FAILED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.stage.failed",
        Unit::Count,
        "Pipeline stages that failed",
    );

    /// Stages skipped because a prerequisite failed. Labelled by `stage`.
    pub const STAGE_SKIPPED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.stage.skipped",
        Unit::Count,
        "Pipeline stages skipped after an upstream failure",
    );

    /// Wall-clock duration of a stage. Labelled by `stage`.
    pub const STAGE_DURATION: Metric = Metric::new(
        MetricKind::Histogram,
        "cartoflow.stage.duration_ms",
        Unit::Milliseconds,
        "Stage wall-clock duration in milliseconds",
    );

    // Feature acquisition, labelled by `stage` and `category`

    /// Categories fetched from the feature service.
    pub const CATEGORY_FETCHED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.features.fetched",
        Unit::Count,
        "Feature categories fetched",
    );

    /// Categories replaced by an empty placeholder layer.
    pub const CATEGORY_PLACEHOLDER: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.features.placeholder",
        Unit::Count,
        "Feature categories replaced by a placeholder layer",
    );

    /// Features written per category.
    pub const FEATURES_WRITTEN: Metric = Metric::new(
        MetricKind::Histogram,
        "cartoflow.features.count",
        Unit::Count,
        "Features written per category",
    );

    // Reprojection and styling

    /// Layers reprojected into the target reference.
    pub const LAYERS_REPROJECTED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.reproject.layers",
        Unit::Count,
        "Layers reprojected into the target reference",
    );

    /// Layers whose reprojection failed.
    pub const REPROJECT_FAILED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.reproject.failed",
        Unit::Count,
        "Layers left in place after a failed reprojection",
    );

    /// Layers styled.
    pub const LAYERS_STYLED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.style.layers",
        Unit::Count,
        "Layers assigned a style",
    );

    /// Style rules that could not be applied.
    pub const STYLE_FAILED: Metric = Metric::new(
        MetricKind::Counter,
        "cartoflow.style.failed",
        Unit::Count,
        "Style rules that did not match the layer geometry",
    );

    // Run

    /// Overall progress of the current operation.
    pub const RUN_PROGRESS: Metric = Metric::new(
        MetricKind::Gauge,
        "cartoflow.run.progress",
        Unit::Percent,
        "Progress of the current operation",
    );

    /// Every declared metric.
    pub const ALL: &[&Metric] = &[
        &STAGE_COMPLETED,
        &STAGE_FAILED,
        &STAGE_SKIPPED,
        &STAGE_DURATION,
        &CATEGORY_FETCHED,
        &CATEGORY_PLACEHOLDER,
        &FEATURES_WRITTEN,
        &LAYERS_REPROJECTED,
        &REPROJECT_FAILED,
        &LAYERS_STYLED,
        &STYLE_FAILED,
        &RUN_PROGRESS,
    ];
}

/// Labels identifying a pipeline stage.
#[derive(Debug, Clone)]
pub struct StageLabels {
    /// Stage name, e.g. `clip` or `features`
    pub stage: String,
    /// Feature category layer (`roads`, `peaks`, ...), set only by acquisition
    pub category: Option<String>,
}

impl StageLabels {
    /// Labels for `stage` with no category.
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            category: None,
        }
    }

    /// Attach the feature category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Key/value pairs for the `metrics` macros.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("stage", self.stage.clone())];
        if let Some(category) = &self.category {
            labels.push(("category", category.clone()));
        }
        labels
    }
}

/// Register descriptions of every metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
