//! Feature acquisition pass over the six categories.

use crate::pipeline::Pipeline;
use crate::run::{AcquisitionReport, CategoryOutcome, StageOutcome};
use crate::Result;
use carto_engine::{submit, TransformBoundsRequest};
use carto_features::{FeatureAcquirer, FetchOutcome};
use carto_metrics::{metric_defs, StageLabels};
use carto_model::{Crs, LayerRegistry, FEATURE_CATEGORIES};
use std::time::Instant;
use tracing::info;

/// Stage name for feature acquisition.
pub const STAGE_FEATURES: &str = "features";

impl Pipeline {
    /// Fetch every category over the extent and register one layer each.
    ///
    /// A category that cannot be fetched or converted is registered as an
    /// empty placeholder, so all six layers always exist afterwards.
    pub fn acquire_features(&mut self, registry: &mut LayerRegistry) -> Result<AcquisitionReport> {
        let extent = self.load_extent(registry)?;
        self.checkpoint(STAGE_FEATURES)?;
        let started = Instant::now();

        let bbox = submit(
            self.engine(),
            &TransformBoundsRequest {
                bounds: extent.bbox(),
                from: extent.crs().clone(),
                to: Crs::wgs84(),
            },
        )?;
        self.progress.status(
            STAGE_FEATURES,
            format!(
                "Querying features in ({:.5}, {:.5}) - ({:.5}, {:.5})",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            ),
        );

        let out = self.config.output_dir.clone();
        std::fs::create_dir_all(&out)?;
        let http = self.http.clone();
        let acquirer = FeatureAcquirer::new(http.as_ref(), &self.config.overpass);
        let mut report = AcquisitionReport {
            categories: Vec::with_capacity(FEATURE_CATEGORIES.len()),
            query_bounds: Some(bbox),
        };

        for (i, category) in FEATURE_CATEGORIES.iter().enumerate() {
            self.checkpoint(STAGE_FEATURES)?;
            self.progress.status(
                STAGE_FEATURES,
                format!("Fetching {} ({}/{})", category.display_name, i + 1, FEATURE_CATEGORIES.len()),
            );

            let outcome = acquirer.fetch(category, &bbox, &out);
            let labels = StageLabels::new(STAGE_FEATURES)
                .with_category(category.layer_name)
                .to_labels();
            let recorded = match &outcome {
                FetchOutcome::Fetched(layer) => {
                    let features = layer.feature_count.unwrap_or(0);
                    metrics::counter!(metric_defs::CATEGORY_FETCHED.name, &labels).increment(1);
                    metrics::histogram!(metric_defs::FEATURES_WRITTEN.name, &labels).record(features as f64);
                    self.progress.status(
                        STAGE_FEATURES,
                        format!("{}: {} features", category.display_name, features),
                    );
                    CategoryOutcome::Fetched { features }
                }
                FetchOutcome::Unavailable { reason, .. } => {
                    metrics::counter!(metric_defs::CATEGORY_PLACEHOLDER.name, &labels).increment(1);
                    self.progress.status(
                        STAGE_FEATURES,
                        format!("{}: unavailable, using an empty layer ({})", category.display_name, reason),
                    );
                    CategoryOutcome::Placeholder {
                        reason: reason.to_string(),
                    }
                }
            };

            registry.upsert(outcome.into_layer());
            self.run.categories.insert(category.key, recorded.clone());
            report.categories.push((category.key, recorded));
            self.set_progress(STAGE_FEATURES, i + 1, FEATURE_CATEGORIES.len());
        }

        info!(
            fetched = report.fetched(),
            placeholders = report.placeholders(),
            "Feature acquisition finished"
        );
        self.record_stage(STAGE_FEATURES, StageOutcome::Completed(out), Some(started));
        Ok(report)
    }
}
