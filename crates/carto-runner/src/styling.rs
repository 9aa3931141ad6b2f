//! Styling pass.

use crate::pipeline::Pipeline;
use crate::run::StageOutcome;
use crate::Result;
use carto_dem::DemRaster;
use carto_metrics::metric_defs;
use carto_model::{LayerRegistry, LayerRole};
use carto_style::{apply_styles, StyleContext, StyleReport};
use std::time::Instant;
use tracing::warn;

/// Stage name for the styling pass.
pub const STAGE_STYLE: &str = "style";

impl Pipeline {
    /// Assign the fixed style to every registered layer.
    ///
    /// The DEM color ramp is anchored on the statistics of the registered
    /// DEM. Rules that do not fit a layer are logged and skipped.
    pub fn style_layers(&mut self, registry: &mut LayerRegistry) -> Result<StyleReport> {
        self.checkpoint(STAGE_STYLE)?;
        let started = Instant::now();
        self.progress.status(STAGE_STYLE, "Applying styles");

        let mut ctx = StyleContext::from_config(&self.config);
        if let Some(dem) = registry.find_by_role(LayerRole::Dem) {
            match DemRaster::from_file(&dem.path).and_then(|raster| raster.statistics()) {
                Ok(stats) => ctx = ctx.with_dem_range(stats.min, stats.max),
                Err(e) => warn!(path = %dem.path.display(), error = %e, "Cannot read DEM statistics"),
            }
        }

        let report = apply_styles(registry, &ctx);
        metrics::counter!(metric_defs::LAYERS_STYLED.name).increment(report.styled.len() as u64);
        metrics::counter!(metric_defs::STYLE_FAILED.name).increment(report.failed.len() as u64);

        self.progress.status(
            STAGE_STYLE,
            format!(
                "Styled {} layers ({} without a rule, {} failed)",
                report.styled.len(),
                report.unstyled.len(),
                report.failed.len()
            ),
        );
        self.set_progress(STAGE_STYLE, 1, 1);
        self.record_stage(
            STAGE_STYLE,
            StageOutcome::Completed(self.config.output_dir.clone()),
            Some(started),
        );
        Ok(report)
    }
}
