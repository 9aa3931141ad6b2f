//! Single-band float GeoTIFF output.

use crate::raster::{
    TAG_GDAL_NODATA, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT,
};
use crate::{geokeys, DemError, Result};
use carto_model::{BoundingBox, Crs};
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Layout and georeferencing of a raster to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffSpec {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Outer edges of the raster in `crs` units.
    pub bounds: BoundingBox,
    /// Spatial reference.
    pub crs: Crs,
    /// Value marking missing cells.
    pub no_data_value: Option<f32>,
}

/// Write `data` (row-major, north row first) as a georeferenced 32-bit
/// float GeoTIFF.
pub fn write_geotiff(path: &Path, spec: &GeoTiffSpec, data: &[f32]) -> Result<()> {
    let expected = spec.width as usize * spec.height as usize;
    if data.len() != expected {
        return Err(DemError::DimensionMismatch {
            expected,
            actual: data.len(),
        });
    }

    let file = std::fs::File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image::<colortype::Gray32Float>(spec.width, spec.height)?;

    let scale = [
        spec.bounds.width() / spec.width as f64,
        spec.bounds.height() / spec.height as f64,
        0.0,
    ];
    let tiepoint = [0.0, 0.0, 0.0, spec.bounds.min_x, spec.bounds.max_y, 0.0];

    let tags = image.encoder();
    tags.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
    tags.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
    if let Some(code) = spec.crs.epsg_code() {
        let directory = geokeys::directory_for_epsg(code, spec.crs.is_geographic());
        tags.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &directory[..])?;
    }
    if let Some(nodata) = spec.no_data_value {
        tags.write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata.to_string().as_str())?;
    }

    image.write_data(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_buffer_length() {
        let dir = tempfile::tempdir().unwrap();
        let spec = GeoTiffSpec {
            width: 3,
            height: 3,
            bounds: BoundingBox::new(0.0, 0.0, 3.0, 3.0).unwrap(),
            crs: Crs::wgs84(),
            no_data_value: None,
        };
        let err = write_geotiff(&dir.path().join("bad.tif"), &spec, &[0.0; 8]).unwrap_err();
        assert!(matches!(
            err,
            DemError::DimensionMismatch {
                expected: 9,
                actual: 8
            }
        ));
    }
}
