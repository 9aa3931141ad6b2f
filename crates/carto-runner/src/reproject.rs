//! Bringing every registered layer into the target reference.

use crate::pipeline::Pipeline;
use crate::run::{ReprojectReport, StageOutcome};
use crate::Result;
use carto_engine::{submit, Resampling, VectorReprojectRequest, WarpRequest};
use carto_metrics::metric_defs;
use carto_model::{Crs, Layer, LayerKind, LayerRegistry};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stage name for the reprojection pass.
pub const STAGE_REPROJECT_LAYERS: &str = "reproject_layers";

impl Pipeline {
    /// Reproject every layer whose reference differs from the target and
    /// replace it in the registry under the same name.
    ///
    /// A layer that fails is logged and left in place. Running the pass
    /// again on its own output changes nothing.
    pub fn reproject_layers(&mut self, registry: &mut LayerRegistry) -> Result<ReprojectReport> {
        self.checkpoint(STAGE_REPROJECT_LAYERS)?;
        let started = Instant::now();
        let target = self.config.target_crs.clone();
        let out = self.config.output_dir.clone();
        std::fs::create_dir_all(&out)?;
        self.progress.status(
            STAGE_REPROJECT_LAYERS,
            format!("Reprojecting layers to {}", target),
        );

        let mut report = ReprojectReport::default();
        let names = registry.names();
        for (i, name) in names.iter().enumerate() {
            let Some(layer) = registry.find_by_name(name).cloned() else {
                continue;
            };
            if layer.crs == target {
                debug!(layer = %name, "Already in target reference");
                report.unchanged.push(name.clone());
                continue;
            }

            self.checkpoint(STAGE_REPROJECT_LAYERS)?;
            self.progress.status(
                STAGE_REPROJECT_LAYERS,
                format!("Reprojecting {} from {}", name, layer.crs),
            );
            match self.reproject_one(&layer, &out) {
                Ok(path) => {
                    let reprojected = Layer {
                        crs: target.clone(),
                        path,
                        ..layer
                    };
                    registry.replace(reprojected)?;
                    metrics::counter!(metric_defs::LAYERS_REPROJECTED.name).increment(1);
                    report.reprojected.push(name.clone());
                }
                Err(e) => {
                    warn!(layer = %name, error = %e, "Reprojection failed, keeping original layer");
                    metrics::counter!(metric_defs::REPROJECT_FAILED.name).increment(1);
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
            self.set_progress(STAGE_REPROJECT_LAYERS, i + 1, names.len());
        }

        info!(
            reprojected = report.reprojected.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "Reprojection pass finished"
        );
        self.set_progress(STAGE_REPROJECT_LAYERS, 1, 1);
        self.record_stage(STAGE_REPROJECT_LAYERS, StageOutcome::Completed(out), Some(started));
        Ok(report)
    }

    fn reproject_one(&self, layer: &Layer, out: &std::path::Path) -> carto_engine::Result<PathBuf> {
        let target = self.config.target_crs.clone();
        let stem = output_stem(&layer.name, &target);
        match layer.kind {
            LayerKind::Raster => submit(
                self.engine(),
                &WarpRequest {
                    source: layer.path.clone(),
                    output: out.join(format!("{}.tif", stem)),
                    target_crs: target,
                    resampling: Resampling::Bilinear,
                },
            ),
            LayerKind::Vector(_) => submit(
                self.engine(),
                &VectorReprojectRequest {
                    source: layer.path.clone(),
                    output: out.join(format!("{}.geojson", stem)),
                    source_crs: Some(layer.crs.clone()),
                    target_crs: target,
                },
            ),
        }
    }
}

/// File stem for a layer reprojected into `target`, e.g.
/// `reprojected_peaks_32650`. The stem differs per target, so it never
/// equals the source of a layer reprojected by an earlier pass.
fn output_stem(name: &str, target: &Crs) -> String {
    match target.epsg_code() {
        Some(code) => format!("reprojected_{}_{}", name, code),
        None => format!(
            "reprojected_{}_{}",
            name,
            target.as_str().replace(':', "_").to_ascii_lowercase()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_stem_carries_target_code() {
        let utm = Crs::new("EPSG:32650").unwrap();
        assert_eq!(output_stem("peaks", &utm), "reprojected_peaks_32650");

        let esri = Crs::new("esri:102025").unwrap();
        assert_eq!(output_stem("roads", &esri), "reprojected_roads_esri_102025");
    }
}
