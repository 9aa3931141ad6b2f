//! Elevation pipeline: clip, reproject, hillshade, color relief, contours.
//!
//! Clip and reproject gate everything after them. Hillshade, color relief
//! and each contour product are independent of one another; one failing
//! does not undo the others.

use crate::pipeline::Pipeline;
use crate::run::{ElevationReport, StageOutcome};
use crate::{PipelineError, Result};
use carto_dem::DemRaster;
use carto_engine::{
    submit, ClipRequest, ColorReliefRequest, ContourRequest, HillshadeRequest, ProbeRequest, ReliefStop,
    Resampling, WarpRequest,
};
use carto_model::{
    ClipMode, Field, FieldType, GeometryKind, Layer, LayerRegistry, LayerRole, MAP_EXTENT_FILE,
};
use carto_style::{anchor_stops, ELEVATION_FIELD};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Clip stage.
pub const STAGE_CLIP: &str = "clip";
/// Raster reprojection stage.
pub const STAGE_REPROJECT: &str = "reproject";
/// Hillshade stage.
pub const STAGE_HILLSHADE: &str = "hillshade";
/// Color relief stage.
pub const STAGE_RENDER: &str = "render";

/// Clipped DEM layer.
pub const CLIPPED_DEM_LAYER: &str = "clipped_dem";
/// Reprojected DEM layer.
pub const DEM_LAYER: &str = "dem";
/// Hillshade layer.
pub const HILLSHADE_LAYER: &str = "shade";
/// Color relief layer.
pub const DEM_RENDER_LAYER: &str = "dem_render";

impl Pipeline {
    /// Run the elevation pipeline against the configured source DEM.
    ///
    /// Fails only for missing input (no extent, no DEM) or an unreadable
    /// source. Stage failures are reported in the returned
    /// [`ElevationReport`].
    pub fn process_dem(&mut self, registry: &mut LayerRegistry) -> Result<ElevationReport> {
        let extent = self.load_extent(registry)?;
        let source = self.source_dem()?;
        let out = self.config.output_dir.clone();
        std::fs::create_dir_all(&out)?;

        let contours = self.config.contours.clone();
        let mut stage_names = vec![
            STAGE_CLIP.to_string(),
            STAGE_REPROJECT.to_string(),
            STAGE_HILLSHADE.to_string(),
            STAGE_RENDER.to_string(),
        ];
        stage_names.extend(contours.iter().map(|c| c.layer_name()));
        let total = stage_names.len();
        let mut report = ElevationReport::default();

        self.checkpoint(STAGE_CLIP)?;
        self.progress.status(STAGE_CLIP, format!("Opening {}", source.display()));
        let info = submit(self.engine(), &ProbeRequest { source: source.clone() }).map_err(|e| {
            PipelineError::SourceUnreadable {
                path: source.clone(),
                reason: e.to_string(),
            }
        })?;
        let source_crs = info.crs.unwrap_or_else(|| extent.crs().clone());

        // Clip
        let started = Instant::now();
        self.progress.status(STAGE_CLIP, "Clipping DEM to the map extent");
        let clip = ClipRequest {
            source,
            output: out.join("clipped_dem.tif"),
            bounds: extent.bbox(),
            bounds_crs: extent.crs().clone(),
            cutline: (self.config.clip_mode == ClipMode::Mask).then(|| out.join(MAP_EXTENT_FILE)),
        };
        let clipped = match submit(self.engine(), &clip) {
            Ok(path) => {
                registry.upsert(Layer::raster(
                    CLIPPED_DEM_LAYER,
                    LayerRole::ClippedDem,
                    source_crs,
                    path.clone(),
                ));
                self.complete(&mut report, STAGE_CLIP, path.clone(), started, 1, total);
                path
            }
            Err(e) => {
                self.fail(&mut report, STAGE_CLIP, e.to_string(), started, 1, total);
                self.skip_rest(&mut report, &stage_names, 1);
                return Ok(report);
            }
        };

        // Reproject
        self.checkpoint(STAGE_REPROJECT)?;
        let started = Instant::now();
        let target = self.config.target_crs.clone();
        self.progress
            .status(STAGE_REPROJECT, format!("Reprojecting DEM to {}", target));
        let warp = WarpRequest {
            source: clipped,
            output: out.join("dem.tif"),
            target_crs: target.clone(),
            resampling: Resampling::Bilinear,
        };
        let dem = match submit(self.engine(), &warp) {
            Ok(path) => {
                registry.upsert(Layer::raster(DEM_LAYER, LayerRole::Dem, target.clone(), path.clone()));
                self.complete(&mut report, STAGE_REPROJECT, path.clone(), started, 2, total);
                path
            }
            Err(e) => {
                self.fail(&mut report, STAGE_REPROJECT, e.to_string(), started, 2, total);
                self.skip_rest(&mut report, &stage_names, 2);
                return Ok(report);
            }
        };

        // Hillshade
        self.checkpoint(STAGE_HILLSHADE)?;
        let started = Instant::now();
        self.progress.status(STAGE_HILLSHADE, "Generating hillshade");
        let hs = &self.config.hillshade;
        let request = HillshadeRequest {
            source: dem.clone(),
            output: out.join("shade.tif"),
            z_factor: hs.z_factor,
            azimuth: hs.azimuth,
            altitude: hs.altitude,
        };
        match submit(self.engine(), &request) {
            Ok(path) => {
                registry.upsert(Layer::raster(
                    HILLSHADE_LAYER,
                    LayerRole::Hillshade,
                    target.clone(),
                    path.clone(),
                ));
                self.complete(&mut report, STAGE_HILLSHADE, path, started, 3, total);
            }
            Err(e) => self.fail(&mut report, STAGE_HILLSHADE, e.to_string(), started, 3, total),
        }

        // Color relief
        self.checkpoint(STAGE_RENDER)?;
        let started = Instant::now();
        self.progress.status(STAGE_RENDER, "Rendering DEM color ramp");
        match self.render_relief(&dem, out.join("dem_render.tif")) {
            Ok(path) => {
                registry.upsert(Layer::raster(
                    DEM_RENDER_LAYER,
                    LayerRole::DemRender,
                    target.clone(),
                    path.clone(),
                ));
                self.complete(&mut report, STAGE_RENDER, path, started, 4, total);
            }
            Err(reason) => self.fail(&mut report, STAGE_RENDER, reason, started, 4, total),
        }

        // Contours
        for (i, contour) in contours.iter().enumerate() {
            let stage = contour.layer_name();
            self.checkpoint(&stage)?;
            let started = Instant::now();
            self.progress
                .status(&stage, format!("Generating {}-unit contours", contour.interval));
            let request = ContourRequest {
                source: dem.clone(),
                output: out.join(format!("{}.geojson", stage)),
                interval: contour.interval as f64,
                attribute: ELEVATION_FIELD.to_string(),
            };
            match submit(self.engine(), &request) {
                Ok(path) => {
                    registry.upsert(Layer::vector(
                        stage.clone(),
                        LayerRole::Contour {
                            interval: contour.interval,
                        },
                        GeometryKind::Line,
                        target.clone(),
                        path.clone(),
                        vec![Field::new(ELEVATION_FIELD, FieldType::Real)],
                    ));
                    self.complete(&mut report, &stage, path, started, 5 + i, total);
                }
                Err(e) => self.fail(&mut report, &stage, e.to_string(), started, 5 + i, total),
            }
        }

        info!(
            completed = report.completed(),
            stages = report.stages.len(),
            "Elevation pipeline finished"
        );
        Ok(report)
    }

    /// Anchor the ramp on the reprojected DEM's observed range and render.
    fn render_relief(&self, dem: &Path, output: PathBuf) -> std::result::Result<PathBuf, String> {
        let stats = DemRaster::from_file(dem)
            .and_then(|raster| raster.statistics())
            .map_err(|e| format!("cannot read elevation statistics: {}", e))?;
        info!(min = stats.min, max = stats.max, "Observed elevation range");

        let render = &self.config.dem_render;
        let stops = anchor_stops(stats.min, stats.max, &render.stops).map_err(|e| e.to_string())?;
        let request = ColorReliefRequest {
            source: dem.to_path_buf(),
            output,
            stops: stops
                .iter()
                .map(|s| ReliefStop {
                    value: s.value,
                    color: s.color,
                })
                .collect(),
            interpolation: render.interpolation,
        };
        submit(self.engine(), &request).map_err(|e| e.to_string())
    }

    fn complete(
        &mut self,
        report: &mut ElevationReport,
        stage: &str,
        path: PathBuf,
        started: Instant,
        done: usize,
        total: usize,
    ) {
        self.progress
            .status(stage, format!("Wrote {}", path.display()));
        report.record(stage, StageOutcome::Completed(path.clone()));
        self.record_stage(stage, StageOutcome::Completed(path), Some(started));
        self.set_progress(stage, done, total);
    }

    fn fail(
        &mut self,
        report: &mut ElevationReport,
        stage: &str,
        reason: String,
        started: Instant,
        done: usize,
        total: usize,
    ) {
        warn!(stage, error = %reason, "Elevation stage failed");
        self.progress.status(stage, format!("Failed: {}", reason));
        report.record(stage, StageOutcome::Failed(reason.clone()));
        self.record_stage(stage, StageOutcome::Failed(reason), Some(started));
        self.set_progress(stage, done, total);
    }

    /// Mark every stage from index `from` onwards as skipped. Skipped stages
    /// still count towards progress.
    fn skip_rest(&mut self, report: &mut ElevationReport, stages: &[String], from: usize) {
        let total = stages.len();
        for (idx, stage) in stages.iter().enumerate().skip(from) {
            self.progress.status(stage, "Skipped");
            report.record(stage, StageOutcome::Skipped);
            self.record_stage(stage, StageOutcome::Skipped, None);
            self.set_progress(stage, idx + 1, total);
        }
    }
}
