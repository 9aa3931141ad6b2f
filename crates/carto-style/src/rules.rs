//! The fixed style rule table.

use crate::ramp::anchor_stops;
use crate::{Result, StyleError};
use carto_model::style::{
    Color, LabelPlacement, LabelRule, LayerStyle, LineStyle, MarkerShape, StyleCategory, Symbol,
    Symbology, TextBuffer,
};
use carto_model::{CartoConfig, CategoryKey, ContourConfig, DemRenderConfig, HillshadeConfig, LayerRole};

/// Label font used throughout the map.
pub const LABEL_FONT: &str = "SimSun";

/// Attribute carrying contour elevations.
pub const ELEVATION_FIELD: &str = "ELEV";

/// Everything the rule table depends on besides the layer itself.
#[derive(Debug, Clone)]
pub struct StyleContext {
    /// Per-interval contour settings.
    pub contours: Vec<ContourConfig>,
    /// DEM color ramp settings.
    pub dem_render: DemRenderConfig,
    /// Hillshade light parameters.
    pub hillshade: HillshadeConfig,
    /// Observed `(min, max)` of the reprojected DEM.
    pub dem_range: Option<(f64, f64)>,
}

impl StyleContext {
    /// Context from run configuration, without DEM statistics.
    pub fn from_config(config: &CartoConfig) -> Self {
        Self {
            contours: config.contours.clone(),
            dem_render: config.dem_render.clone(),
            hillshade: config.hillshade.clone(),
            dem_range: None,
        }
    }

    /// Attach the observed DEM range.
    pub fn with_dem_range(mut self, min: f64, max: f64) -> Self {
        self.dem_range = Some((min, max));
        self
    }
}

impl Default for StyleContext {
    fn default() -> Self {
        Self::from_config(&CartoConfig::default())
    }
}

fn hex(value: u32) -> Color {
    Color::rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

fn label(field: &str, size_pt: f64, color: Color, placement: LabelPlacement) -> LabelRule {
    LabelRule {
        field: field.to_string(),
        font: LABEL_FONT.to_string(),
        size_pt,
        color,
        placement,
        buffer: None,
    }
}

fn white_buffer(rule: LabelRule) -> LabelRule {
    LabelRule {
        buffer: Some(TextBuffer {
            size_mm: 0.5,
            color: Color::WHITE,
        }),
        ..rule
    }
}

fn opaque(symbology: Symbology, label: Option<LabelRule>) -> LayerStyle {
    LayerStyle {
        symbology,
        label,
        opacity_percent: 100,
    }
}

fn category(value: &str, legend: &str, symbol: Symbol) -> StyleCategory {
    StyleCategory {
        value: value.to_string(),
        legend: legend.to_string(),
        symbol,
    }
}

fn marker(shape: MarkerShape, size_mm: f64, color: Color) -> Symbol {
    Symbol::Marker {
        shape,
        size_mm,
        color,
    }
}

fn line(color: Color, width_mm: f64, style: LineStyle) -> Symbol {
    Symbol::Line {
        color,
        width_mm,
        style,
    }
}

fn fill(color: Option<Color>, outline: Color, outline_width_mm: f64, outline_style: LineStyle) -> Symbol {
    Symbol::Fill {
        fill: color,
        outline,
        outline_width_mm,
        outline_style,
    }
}

/// Style for a feature category.
pub fn category_style(key: CategoryKey) -> LayerStyle {
    match key {
        CategoryKey::Transit => opaque(
            Symbology::Categorized {
                field: "fclass".to_string(),
                categories: vec![
                    category(
                        "railway_station",
                        "Railway station",
                        marker(MarkerShape::Triangle, 3.5, hex(0xff0000)),
                    ),
                    category("bus_stop", "Bus stop", marker(MarkerShape::Circle, 3.5, hex(0x0000ff))),
                    category(
                        "bus_station",
                        "Bus station",
                        marker(MarkerShape::Square, 3.3, hex(0x00ff00)),
                    ),
                ],
            },
            None,
        ),
        CategoryKey::Peaks => opaque(
            Symbology::Single {
                symbol: marker(MarkerShape::Triangle, 2.0, Color::BLACK),
            },
            Some(white_buffer(label("name", 11.0, hex(0x825000), LabelPlacement::AroundPoint))),
        ),
        CategoryKey::Roads => {
            let minor = line(hex(0x999999), 0.4, LineStyle::Solid);
            let service = line(hex(0xcccccc), 0.3, LineStyle::Solid);
            let foot = line(hex(0xdddddd), 0.2, LineStyle::Dash);
            opaque(
                Symbology::Categorized {
                    field: "fclass".to_string(),
                    categories: vec![
                        category("primary", "Primary road", line(hex(0x000000), 1.0, LineStyle::Solid)),
                        category("secondary", "Secondary road", line(hex(0x333333), 0.8, LineStyle::Solid)),
                        category("tertiary", "Tertiary road", line(hex(0x666666), 0.6, LineStyle::Solid)),
                        category("residential", "Residential road", minor.clone()),
                        category("unclassified", "Unclassified road", minor),
                        category("service", "Service road", service.clone()),
                        category("track", "Track", service),
                        category("footway", "Footway", foot.clone()),
                        category("path", "Path", foot.clone()),
                        category("pedestrian", "Pedestrian way", foot.clone()),
                        category("steps", "Steps", foot),
                    ],
                },
                Some(label("name", 8.0, Color::BLACK, LabelPlacement::Line)),
            )
        }
        CategoryKey::Waterways => opaque(
            Symbology::Single {
                symbol: line(hex(0x3f9cff), 1.0, LineStyle::Solid),
            },
            Some(white_buffer(label("name", 6.5, hex(0x0000ca), LabelPlacement::Line))),
        ),
        CategoryKey::Lakes => opaque(
            Symbology::Single {
                symbol: fill(Some(hex(0x4a8dd3)), Color::BLACK, 0.1, LineStyle::Solid),
            },
            Some(label("name", 10.0, hex(0x0101ff), LabelPlacement::AroundPoint)),
        ),
        CategoryKey::Landuse => opaque(
            Symbology::Single {
                symbol: fill(Some(hex(0xbac7b8)), hex(0xc3c3c3), 0.1, LineStyle::Solid),
            },
            None,
        ),
    }
}

/// Style for a contour product.
pub fn contour_style(contour: &ContourConfig) -> LayerStyle {
    LayerStyle {
        symbology: Symbology::Single {
            symbol: line(contour.color, contour.width_mm, LineStyle::Solid),
        },
        label: contour
            .labeled
            .then(|| label(ELEVATION_FIELD, 6.0, Color::BLACK, LabelPlacement::OnLine)),
        opacity_percent: contour.opacity_percent,
    }
}

/// Map frame: transparent fill, red dashed outline.
pub fn extent_style() -> LayerStyle {
    opaque(
        Symbology::Single {
            symbol: fill(None, Color::RED, 0.5, LineStyle::Dash),
        },
        None,
    )
}

/// The style a layer of `role` receives, or `None` if it has no rule.
///
/// The DEM render layer needs `ctx.dem_range`; without it this fails with
/// [`StyleError::MissingStatistics`]. A contour layer whose interval is not
/// configured gets no style.
pub fn rule_for(role: LayerRole, layer_name: &str, ctx: &StyleContext) -> Result<Option<LayerStyle>> {
    let style = match role {
        LayerRole::MapExtent => extent_style(),
        LayerRole::ClippedDem | LayerRole::Dem => return Ok(None),
        LayerRole::Hillshade => opaque(
            Symbology::Hillshade {
                azimuth: ctx.hillshade.azimuth,
                altitude: ctx.hillshade.altitude,
                z_factor: ctx.hillshade.z_factor,
            },
            None,
        ),
        LayerRole::DemRender => {
            let (min, max) = ctx
                .dem_range
                .ok_or_else(|| StyleError::MissingStatistics(layer_name.to_string()))?;
            LayerStyle {
                symbology: Symbology::PseudoColor {
                    stops: anchor_stops(min, max, &ctx.dem_render.stops)?,
                    interpolation: ctx.dem_render.interpolation,
                },
                label: None,
                opacity_percent: ctx.dem_render.opacity_percent,
            }
        }
        LayerRole::Contour { interval } => {
            match ctx.contours.iter().find(|c| c.interval == interval) {
                Some(contour) => contour_style(contour),
                None => return Ok(None),
            }
        }
        LayerRole::Feature { category } => category_style(category),
    };
    Ok(Some(style))
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_model::GeometryKind;

    fn symbols(style: &LayerStyle) -> Vec<&Symbol> {
        match &style.symbology {
            Symbology::Single { symbol } => vec![symbol],
            Symbology::Categorized { categories, .. } => categories.iter().map(|c| &c.symbol).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_transit_categories() {
        let style = category_style(CategoryKey::Transit);
        let Symbology::Categorized { field, categories } = &style.symbology else {
            panic!("transit should be categorized");
        };
        assert_eq!(field, "fclass");
        let railway = categories.iter().find(|c| c.value == "railway_station").unwrap();
        assert_eq!(
            railway.symbol,
            Symbol::Marker {
                shape: MarkerShape::Triangle,
                size_mm: 3.5,
                color: Color::RED,
            }
        );
        let station = categories.iter().find(|c| c.value == "bus_station").unwrap();
        assert!(matches!(
            station.symbol,
            Symbol::Marker { shape: MarkerShape::Square, size_mm, .. } if size_mm == 3.3
        ));
        assert!(style.label.is_none());
    }

    #[test]
    fn test_roads_cover_every_accepted_value() {
        let style = category_style(CategoryKey::Roads);
        let Symbology::Categorized { categories, .. } = &style.symbology else {
            panic!("roads should be categorized");
        };
        for value in CategoryKey::Roads.config().values {
            assert!(categories.iter().any(|c| c.value == *value), "no rule for {}", value);
        }
        let steps = categories.iter().find(|c| c.value == "steps").unwrap();
        assert!(matches!(steps.symbol, Symbol::Line { style: LineStyle::Dash, .. }));
        assert_eq!(style.label.as_ref().unwrap().placement, LabelPlacement::Line);
    }

    #[test]
    fn test_symbols_match_category_geometry() {
        for cat in &carto_model::FEATURE_CATEGORIES {
            let style = category_style(cat.key);
            for symbol in symbols(&style) {
                assert_eq!(symbol.geometry_kind(), cat.geometry_kind, "{}", cat.key);
            }
        }
    }

    #[test]
    fn test_peak_label() {
        let label = category_style(CategoryKey::Peaks).label.unwrap();
        assert_eq!(label.font, LABEL_FONT);
        assert_eq!(label.size_pt, 11.0);
        assert_eq!(label.color.to_hex(), "#825000");
        assert_eq!(label.buffer.unwrap().color, Color::WHITE);
    }

    #[test]
    fn test_contour_styles() {
        let ctx = StyleContext::default();
        let index = rule_for(LayerRole::Contour { interval: 100 }, "contour_100m", &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(index.opacity_percent, 60);
        let label = index.label.unwrap();
        assert_eq!(label.field, ELEVATION_FIELD);
        assert_eq!(label.placement, LabelPlacement::OnLine);

        let minor = rule_for(LayerRole::Contour { interval: 20 }, "contour_20m", &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(minor.opacity_percent, 50);
        assert!(minor.label.is_none());
        assert_eq!(
            minor.symbology,
            Symbology::Single {
                symbol: line(hex(0xfff5a5), 0.1, LineStyle::Solid)
            }
        );

        assert!(rule_for(LayerRole::Contour { interval: 50 }, "contour_50m", &ctx)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_dem_render_needs_range() {
        let ctx = StyleContext::default();
        assert_eq!(
            rule_for(LayerRole::DemRender, "dem_render", &ctx),
            Err(StyleError::MissingStatistics("dem_render".to_string()))
        );

        let style = rule_for(LayerRole::DemRender, "dem_render", &ctx.with_dem_range(0.0, 1000.0))
            .unwrap()
            .unwrap();
        assert_eq!(style.opacity_percent, 80);
        let Symbology::PseudoColor { stops, .. } = style.symbology else {
            panic!("expected pseudo-color");
        };
        assert_eq!(stops.len(), 4);
        assert_eq!(stops[3].value, 1000.0);
    }

    #[test]
    fn test_hillshade_and_extent() {
        let ctx = StyleContext::default();
        let shade = rule_for(LayerRole::Hillshade, "shade", &ctx).unwrap().unwrap();
        assert_eq!(
            shade.symbology,
            Symbology::Hillshade {
                azimuth: 315.0,
                altitude: 35.0,
                z_factor: 1.0
            }
        );

        let frame = rule_for(LayerRole::MapExtent, "map_extent", &ctx).unwrap().unwrap();
        let frame_symbols = symbols(&frame);
        let symbol = frame_symbols[0];
        assert_eq!(symbol.geometry_kind(), GeometryKind::Polygon);
        assert!(matches!(
            symbol,
            Symbol::Fill { fill: None, outline_style: LineStyle::Dash, .. }
        ));
    }

    #[test]
    fn test_raw_dem_is_unstyled() {
        let ctx = StyleContext::default();
        assert!(rule_for(LayerRole::Dem, "dem", &ctx).unwrap().is_none());
        assert!(rule_for(LayerRole::ClippedDem, "clipped_dem", &ctx).unwrap().is_none());
    }
}
