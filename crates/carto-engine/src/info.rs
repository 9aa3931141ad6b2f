//! Raster metadata reported by the engine's probe.

use crate::{EngineError, Result};
use carto_model::{BoundingBox, Crs};
use serde::Deserialize;

/// Size, georeferencing and band layout of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Outer edges in the raster's own reference.
    pub bounds: BoundingBox,
    /// Reference, when it resolves to an authority code.
    pub crs: Option<Crs>,
    /// Number of bands.
    pub band_count: usize,
    /// Nodata value of the first band.
    pub no_data_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GdalInfo {
    size: Option<[u32; 2]>,
    #[serde(rename = "coordinateSystem")]
    coordinate_system: Option<CoordinateSystem>,
    stac: Option<Stac>,
    #[serde(rename = "cornerCoordinates")]
    corner_coordinates: Option<CornerCoordinates>,
    #[serde(default)]
    bands: Vec<Band>,
}

#[derive(Debug, Deserialize)]
struct CoordinateSystem {
    #[serde(default)]
    wkt: String,
}

#[derive(Debug, Deserialize)]
struct Stac {
    #[serde(rename = "proj:epsg")]
    epsg: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CornerCoordinates {
    #[serde(rename = "upperLeft")]
    upper_left: [f64; 2],
    #[serde(rename = "lowerLeft")]
    lower_left: [f64; 2],
    #[serde(rename = "upperRight")]
    upper_right: [f64; 2],
    #[serde(rename = "lowerRight")]
    lower_right: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct Band {
    #[serde(rename = "noDataValue")]
    no_data_value: Option<f64>,
}

/// Parse `gdalinfo -json` output.
pub(crate) fn parse_gdalinfo(json: &str) -> Result<RasterInfo> {
    let info: GdalInfo = serde_json::from_str(json)?;
    let unexpected = |detail: &str| EngineError::UnexpectedOutput {
        tool: "gdalinfo".to_string(),
        detail: detail.to_string(),
    };

    let [width, height] = info.size.ok_or_else(|| unexpected("missing raster size"))?;
    let corners = info
        .corner_coordinates
        .ok_or_else(|| unexpected("raster has no georeferencing"))?;
    let bounds = BoundingBox::from_points([
        (corners.upper_left[0], corners.upper_left[1]),
        (corners.lower_left[0], corners.lower_left[1]),
        (corners.upper_right[0], corners.upper_right[1]),
        (corners.lower_right[0], corners.lower_right[1]),
    ])
    .filter(BoundingBox::is_valid)
    .ok_or_else(|| unexpected("corner coordinates are degenerate"))?;

    let epsg = info.stac.and_then(|s| s.epsg).or_else(|| {
        info.coordinate_system
            .as_ref()
            .and_then(|cs| epsg_from_wkt(&cs.wkt))
    });
    let crs = epsg.and_then(|code| Crs::new(&format!("EPSG:{}", code)).ok());

    Ok(RasterInfo {
        width,
        height,
        bounds,
        crs,
        band_count: info.bands.len(),
        no_data_value: info.bands.first().and_then(|b| b.no_data_value),
    })
}

/// Top-level EPSG identifier of a WKT1 or WKT2 string.
///
/// The CRS's own identifier is the last one in the text; earlier ones belong
/// to nested datum, unit and axis definitions.
fn epsg_from_wkt(wkt: &str) -> Option<u32> {
    ["ID[\"EPSG\",", "AUTHORITY[\"EPSG\",\""]
        .iter()
        .filter_map(|marker| {
            let start = wkt.rfind(marker)? + marker.len();
            let digits: String = wkt[start..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u32>().ok().map(|code| (start, code))
        })
        .max_by_key(|(start, _)| *start)
        .map(|(_, code)| code)
}
