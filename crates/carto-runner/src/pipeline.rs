//! The pipeline driver.
//!
//! A [`Pipeline`] owns the run configuration, the engine and HTTP handles,
//! the progress reporter and the cancellation token. Every operation takes
//! the [`LayerRegistry`] explicitly; the registry is the only thing the
//! stages mutate besides files in the output directory.

use crate::cancel::CancelToken;
use crate::progress::ProgressReporter;
use crate::run::{AcquisitionReport, ElevationReport, PipelineRun, ReprojectReport, StageOutcome};
use crate::{PipelineError, Result};
use carto_engine::{submit, ProbeRequest, ProcessingEngine};
use carto_features::HttpClient;
use carto_metrics::{metric_defs, StageLabels};
use carto_model::{BoundingBox, CartoConfig, Crs, Extent, LayerRegistry, MAP_EXTENT_LAYER};
use carto_style::StyleReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Stage name for extent definition.
pub const STAGE_EXTENT: &str = "extent";

/// Where the extent polygon comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtentSource {
    /// A rectangle.
    Rect {
        /// Bounds.
        bbox: BoundingBox,
        /// Reference of `bbox`.
        crs: Crs,
    },
    /// Drawn polygons; the first one is used.
    Polygons {
        /// Rings.
        polygons: Vec<Vec<(f64, f64)>>,
        /// Reference of the rings.
        crs: Crs,
    },
    /// A GeoJSON file of drawn features.
    GeoJson {
        /// File path.
        path: PathBuf,
        /// Reference of the coordinates.
        crs: Crs,
    },
    /// The full bounds of the configured source DEM.
    SourceDem,
}

/// Everything one `run` produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Elevation stages, if a DEM was configured.
    pub elevation: Option<ElevationReport>,
    /// Feature categories.
    pub acquisition: AcquisitionReport,
    /// Reprojection pass.
    pub reprojection: ReprojectReport,
    /// Styling pass.
    pub styling: StyleReport,
}

/// Drives the workflow stages against a layer registry.
pub struct Pipeline {
    pub(crate) config: CartoConfig,
    pub(crate) engine: Arc<dyn ProcessingEngine>,
    pub(crate) http: Arc<dyn HttpClient>,
    pub(crate) progress: ProgressReporter,
    cancel: CancelToken,
    pub(crate) run: PipelineRun,
}

impl Pipeline {
    /// Pipeline with a silent reporter and a fresh cancellation token.
    pub fn new(config: CartoConfig, engine: Arc<dyn ProcessingEngine>, http: Arc<dyn HttpClient>) -> Self {
        let run = PipelineRun::new(config.target_crs.clone(), config.output_dir.clone());
        Self {
            config,
            engine,
            http,
            progress: ProgressReporter::silent(),
            cancel: CancelToken::new(),
            run,
        }
    }

    /// Report progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Observe `cancel` before every stage.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run configuration.
    pub fn config(&self) -> &CartoConfig {
        &self.config
    }

    /// Record of this session.
    pub fn run_record(&self) -> &PipelineRun {
        &self.run
    }

    /// Progress reporter.
    pub fn reporter(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub(crate) fn engine(&self) -> &dyn ProcessingEngine {
        self.engine.as_ref()
    }

    pub(crate) fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!(stage, "Cancellation requested");
            return Err(PipelineError::Cancelled(stage.to_string()));
        }
        Ok(())
    }

    pub(crate) fn record_stage(&mut self, stage: &str, outcome: StageOutcome, started: Option<Instant>) {
        let labels = StageLabels::new(stage).to_labels();
        let counter = match &outcome {
            StageOutcome::Completed(_) => &metric_defs::STAGE_COMPLETED,
            StageOutcome::Failed(_) => &metric_defs::STAGE_FAILED,
            StageOutcome::Skipped => &metric_defs::STAGE_SKIPPED,
        };
        metrics::counter!(counter.name, &labels).increment(1);
        if let Some(started) = started {
            metrics::histogram!(metric_defs::STAGE_DURATION.name, &labels)
                .record(started.elapsed().as_secs_f64() * 1000.0);
        }
        self.run.stages.insert(stage.to_string(), outcome);
    }

    pub(crate) fn set_progress(&mut self, stage: &str, done: usize, total: usize) {
        self.progress.step(stage, done, total);
        self.run.progress = if total == 0 { 100 } else { (done * 100 / total).min(100) as u8 };
    }

    /// Establish the extent, write `extent.geojson` and register the
    /// `map_extent` layer.
    pub fn define_extent(&mut self, registry: &mut LayerRegistry, source: ExtentSource) -> Result<Extent> {
        self.checkpoint(STAGE_EXTENT)?;
        let started = Instant::now();
        self.progress.status(STAGE_EXTENT, "Defining map extent");

        let extent = match source {
            ExtentSource::Rect { bbox, crs } => Extent::from_rect(bbox, crs)?,
            ExtentSource::Polygons { polygons, crs } => Extent::from_polygons(polygons, crs)?,
            ExtentSource::GeoJson { path, crs } => {
                if !path.exists() {
                    return Err(PipelineError::InputMissing(format!(
                        "extent file {} does not exist",
                        path.display()
                    )));
                }
                Extent::from_geojson_file(&path, crs)?
            }
            ExtentSource::SourceDem => {
                let source = self.source_dem()?;
                let info = submit(self.engine(), &ProbeRequest { source: source.clone() }).map_err(|e| {
                    PipelineError::SourceUnreadable {
                        path: source.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let crs = info.crs.ok_or_else(|| PipelineError::SourceUnreadable {
                    path: source,
                    reason: "raster has no spatial reference".to_string(),
                })?;
                Extent::from_raster_bounds(info.bounds, crs)?
            }
        };

        let layer = extent.register(registry, &self.config.output_dir)?;
        self.run.extent = Some(extent.bbox());
        self.record_stage(STAGE_EXTENT, StageOutcome::Completed(layer.path), Some(started));
        self.set_progress(STAGE_EXTENT, 1, 1);
        self.progress
            .status(STAGE_EXTENT, format!("Map extent defined in {}", extent.crs()));
        Ok(extent)
    }

    /// The extent registered by an earlier [`define_extent`](Self::define_extent).
    pub fn load_extent(&self, registry: &LayerRegistry) -> Result<Extent> {
        let layer = registry.find_by_name(MAP_EXTENT_LAYER).ok_or_else(|| {
            PipelineError::InputMissing("no map extent defined; define the extent first".to_string())
        })?;
        Ok(Extent::from_geojson_file(&layer.path, layer.crs.clone())?)
    }

    pub(crate) fn source_dem(&self) -> Result<PathBuf> {
        self.config
            .source_dem
            .clone()
            .ok_or_else(|| PipelineError::InputMissing("no source DEM configured".to_string()))
    }

    /// Run every stage in order: extent (if given), elevation (if a DEM is
    /// configured), features, reprojection, styling. Saves the project.
    pub fn run_all(&mut self, registry: &mut LayerRegistry, extent: Option<ExtentSource>) -> Result<RunSummary> {
        if let Some(source) = extent {
            self.define_extent(registry, source)?;
        } else {
            self.load_extent(registry)?;
        }

        let elevation = if self.config.source_dem.is_some() {
            Some(self.process_dem(registry)?)
        } else {
            warn!("No source DEM configured, skipping the elevation pipeline");
            None
        };
        let acquisition = self.acquire_features(registry)?;
        let reprojection = self.reproject_layers(registry)?;
        let styling = self.style_layers(registry)?;
        let project = self.save_project(registry)?;

        info!(
            run = %self.run.id,
            layers = registry.len(),
            project = %project.display(),
            "Run complete"
        );
        Ok(RunSummary {
            elevation,
            acquisition,
            reprojection,
            styling,
        })
    }

    /// Write `project.yaml` into the output directory.
    pub fn save_project(&self, registry: &LayerRegistry) -> Result<PathBuf> {
        Ok(registry.save(&self.config.output_dir)?)
    }

    /// Stamp the run as ended and notify listeners.
    pub fn finish(&mut self, success: bool, message: impl Into<String>) {
        self.run.finished_at = Some(chrono::Utc::now());
        self.progress.finished(success, message);
    }
}
