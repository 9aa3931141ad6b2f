//! # carto-style
//!
//! The fixed visual style of the map.
//!
//! [`rule_for`] is a pure function from a layer's role to its
//! [`LayerStyle`](carto_model::style::LayerStyle): symbology, labeling and
//! opacity. [`apply_styles`] runs it over a registry, checks each rule
//! against the layer's geometry and schema, and records the result on the
//! layer. A rule that does not fit is logged and the layer left unstyled.
//!
//! The DEM color ramp is anchored on the observed elevation range, passed
//! in through [`StyleContext::with_dem_range`].
//!
//! ## Example
//!
//! ```
//! use carto_style::{anchor_stops, StyleContext};
//! use carto_model::CartoConfig;
//!
//! let config = CartoConfig::default();
//! let stops = anchor_stops(0.0, 1000.0, &config.dem_render.stops)?;
//! assert_eq!(stops.len(), 4);
//! let _ctx = StyleContext::from_config(&config).with_dem_range(0.0, 1000.0);
//! # Ok::<(), carto_style::StyleError>(())
//! ```

mod apply;
mod error;
mod ramp;
mod rules;

pub use apply::{apply_styles, check_style, style_for, StyleReport};
pub use error::StyleError;
pub use ramp::{anchor_stops, color_at};
pub use rules::{
    category_style, contour_style, extent_style, rule_for, StyleContext, ELEVATION_FIELD,
    LABEL_FONT,
};

/// Result type for styling operations.
pub type Result<T> = std::result::Result<T, StyleError>;
