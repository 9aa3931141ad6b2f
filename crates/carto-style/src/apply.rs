//! Assigning styles to registered layers.

use crate::rules::{rule_for, StyleContext};
use crate::{Result, StyleError};
use carto_model::style::{LayerStyle, Symbology};
use carto_model::{Layer, LayerKind, LayerRegistry, FEATURE_CATEGORIES};
use tracing::{debug, info, warn};

/// Check that `style` can be drawn on `layer`.
pub fn check_style(layer: &Layer, style: &LayerStyle) -> Result<()> {
    let renderer_mismatch = |renderer: &'static str, kind: &'static str| StyleError::RendererMismatch {
        layer: layer.name.clone(),
        renderer,
        kind,
    };
    let symbols = match (&style.symbology, layer.kind) {
        (Symbology::PseudoColor { .. } | Symbology::Hillshade { .. }, LayerKind::Raster) => Vec::new(),
        (Symbology::PseudoColor { .. }, LayerKind::Vector(_)) => {
            return Err(renderer_mismatch("pseudo-color", "vector"))
        }
        (Symbology::Hillshade { .. }, LayerKind::Vector(_)) => {
            return Err(renderer_mismatch("hillshade", "vector"))
        }
        (Symbology::Single { .. }, LayerKind::Raster) => return Err(renderer_mismatch("single-symbol", "raster")),
        (Symbology::Categorized { .. }, LayerKind::Raster) => {
            return Err(renderer_mismatch("categorized", "raster"))
        }
        (Symbology::Single { symbol }, LayerKind::Vector(_)) => vec![symbol],
        (Symbology::Categorized { field, categories }, LayerKind::Vector(_)) => {
            require_field(layer, field)?;
            categories.iter().map(|c| &c.symbol).collect()
        }
    };

    if let LayerKind::Vector(found) = layer.kind {
        if let Some(symbol) = symbols.iter().find(|s| s.geometry_kind() != found) {
            return Err(StyleError::GeometryMismatch {
                layer: layer.name.clone(),
                symbol: symbol.geometry_kind(),
                found,
            });
        }
    }
    if let Some(label) = &style.label {
        require_field(layer, &label.field)?;
    }
    Ok(())
}

fn require_field(layer: &Layer, field: &str) -> Result<()> {
    if layer.has_field(field) {
        Ok(())
    } else {
        Err(StyleError::MissingField {
            layer: layer.name.clone(),
            field: field.to_string(),
        })
    }
}

/// The checked style for `layer`, or `None` if no rule covers it.
pub fn style_for(layer: &Layer, ctx: &StyleContext) -> Result<Option<LayerStyle>> {
    match rule_for(layer.role, &layer.name, ctx)? {
        Some(style) => {
            check_style(layer, &style)?;
            Ok(Some(style))
        }
        None => Ok(None),
    }
}

/// What the styling pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleReport {
    /// Layers that received a style.
    pub styled: Vec<String>,
    /// Layers with no rule.
    pub unstyled: Vec<String>,
    /// Layers whose rule could not be applied, left unstyled.
    pub failed: Vec<(String, StyleError)>,
    /// Feature categories with no registered layer.
    pub missing_categories: Vec<String>,
}

/// Style every registered layer.
///
/// Failures are logged and the layer's style cleared; the pass never
/// aborts. Running it twice yields the same styles.
pub fn apply_styles(registry: &mut LayerRegistry, ctx: &StyleContext) -> StyleReport {
    let mut report = StyleReport::default();

    for name in registry.names() {
        let Some(layer) = registry.find_by_name_mut(&name) else {
            continue;
        };
        match style_for(layer, ctx) {
            Ok(Some(style)) => {
                debug!(layer = %name, "Style assigned");
                layer.style = Some(style);
                report.styled.push(name);
            }
            Ok(None) => report.unstyled.push(name),
            Err(e) => {
                warn!(layer = %name, error = %e, "Could not apply style");
                layer.style = None;
                report.failed.push((name, e));
            }
        }
    }

    for category in &FEATURE_CATEGORIES {
        if registry.find_by_name(category.layer_name).is_none() {
            report.missing_categories.push(category.layer_name.to_string());
        }
    }

    info!(
        styled = report.styled.len(),
        failed = report.failed.len(),
        "Styling complete"
    );
    report
}
