//! Single-band elevation raster loaded from a GeoTIFF file.

use crate::{geokeys, DemError, Result};
use carto_model::{BoundingBox, Crs};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

/// GeoTIFF ModelPixelScaleTag.
pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GeoTIFF ModelTiepointTag.
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF GeoKeyDirectoryTag.
pub(crate) const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
/// GDAL_NODATA, stored as an ASCII string.
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

/// Observed statistics of the valid (non-nodata, finite) cells of a band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// Mean of valid values.
    pub mean: f64,
    /// Number of valid cells.
    pub valid_count: usize,
    /// Number of nodata or non-finite cells.
    pub nodata_count: usize,
}

impl BandStatistics {
    /// `max - min`.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// An elevation raster held in memory.
#[derive(Debug)]
pub struct DemRaster {
    path: PathBuf,
    /// Cell values in row-major order (north to south, west to east).
    data: Vec<f32>,
    width: u32,
    height: u32,
    /// Georeferenced bounds, when the file carries tiepoint and scale tags.
    bounds: Option<BoundingBox>,
    /// EPSG reference from the GeoKey directory, when present.
    crs: Option<Crs>,
    no_data_value: Option<f32>,
}

impl DemRaster {
    /// Load a raster from a GeoTIFF file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        // Large clipped DEMs exceed the decoder's default buffer limits.
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let bounds = Self::read_bounds(&mut decoder, width, height)?;
        let crs = Self::read_crs(&mut decoder);
        let no_data_value = Self::read_nodata_value(&mut decoder);
        let data = Self::decode_band(&mut decoder)?;

        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DemError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }

        debug!(
            path = %path.display(),
            width,
            height,
            crs = ?crs.as_ref().map(Crs::as_str),
            "Loaded raster"
        );

        Ok(Self {
            path: path.to_path_buf(),
            data,
            width,
            height,
            bounds,
            crs,
            no_data_value,
        })
    }

    fn read_bounds<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        width: u32,
        height: u32,
    ) -> Result<Option<BoundingBox>> {
        let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE));

        let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) else {
            return Ok(None);
        };
        if tiepoint.len() < 6 || scale.len() < 2 {
            return Err(DemError::InvalidGeoTiff(format!(
                "tiepoint has {} values and pixel scale {}",
                tiepoint.len(),
                scale.len()
            )));
        }

        // Tiepoint is [i, j, k, x, y, z]: raster cell (i, j) sits at model (x, y).
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (scale_x, scale_y) = (scale[0], scale[1]);
        let min_x = tiepoint[3] - i * scale_x;
        let max_y = tiepoint[4] + j * scale_y;
        let max_x = min_x + width as f64 * scale_x;
        let min_y = max_y - height as f64 * scale_y;

        BoundingBox::new(min_x, min_y, max_x, max_y)
            .map(Some)
            .map_err(|e| DemError::InvalidGeoTiff(e.to_string()))
    }

    fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
        let directory = decoder
            .get_tag_u16_vec(Tag::Unknown(TAG_GEO_KEY_DIRECTORY))
            .ok()?;
        let code = geokeys::epsg_from_directory(&directory)?;
        Crs::new(&format!("EPSG:{}", code)).ok()
    }

    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
        decoder
            .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
    }

    fn decode_band<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        }
    }

    fn is_valid(&self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.no_data_value {
            Some(nodata) => (value - nodata).abs() >= 0.001,
            None => true,
        }
    }

    /// Minimum, maximum and mean over the valid cells.
    pub fn statistics(&self) -> Result<BandStatistics> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut valid_count = 0usize;

        for &value in &self.data {
            if !self.is_valid(value) {
                continue;
            }
            let v = value as f64;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            valid_count += 1;
        }

        if valid_count == 0 {
            return Err(DemError::NoValidData(self.path.clone()));
        }

        Ok(BandStatistics {
            min,
            max,
            mean: sum / valid_count as f64,
            valid_count,
            nodata_count: self.data.len() - valid_count,
        })
    }

    /// Cell value, or `None` for nodata.
    pub fn value_at(&self, col: u32, row: u32) -> Result<Option<f32>> {
        if col >= self.width || row >= self.height {
            return Err(DemError::OutOfBounds {
                col,
                row,
                width: self.width,
                height: self.height,
            });
        }
        let value = self.data[row as usize * self.width as usize + col as usize];
        Ok(self.is_valid(value).then_some(value))
    }

    /// Source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width and height in cells.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Georeferenced bounds, if known.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Spatial reference, if the file declares an EPSG code.
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Nodata value, if declared.
    pub fn no_data_value(&self) -> Option<f32> {
        self.no_data_value
    }

    /// Cell size in CRS units (x, y), if georeferenced.
    pub fn resolution(&self) -> Option<(f64, f64)> {
        self.bounds.map(|b| {
            (
                b.width() / self.width as f64,
                b.height() / self.height as f64,
            )
        })
    }
}
