//! Write-then-read tests over synthetic elevation surfaces.

use approx::assert_relative_eq;
use carto_dem::{write_geotiff, DemRaster, GeoTiffSpec};
use carto_model::{BoundingBox, Crs};

fn ramp_surface(width: u32, height: u32, max: f32) -> Vec<f32> {
    let cells = (width * height) as usize;
    (0..cells)
        .map(|i| max * i as f32 / (cells - 1) as f32)
        .collect()
}

#[test]
fn test_observed_range_of_ramp_surface() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem.tif");
    let spec = GeoTiffSpec {
        width: 50,
        height: 40,
        bounds: BoundingBox::new(410_000.0, 3_270_000.0, 411_500.0, 3_271_200.0).unwrap(),
        crs: Crs::new("EPSG:32650").unwrap(),
        no_data_value: Some(-32768.0),
    };
    write_geotiff(&path, &spec, &ramp_surface(50, 40, 1000.0)).unwrap();

    let dem = DemRaster::from_file(&path).unwrap();
    let stats = dem.statistics().unwrap();
    assert_relative_eq!(stats.min, 0.0);
    assert_relative_eq!(stats.max, 1000.0, epsilon = 1e-3);
    assert_relative_eq!(stats.mean, 500.0, epsilon = 1e-2);
    assert_eq!(stats.valid_count, 2000);
    assert_eq!(stats.nodata_count, 0);
}

#[test]
fn test_geographic_raster_keeps_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("source.tif");
    let spec = GeoTiffSpec {
        width: 10,
        height: 10,
        bounds: BoundingBox::new(115.9, 29.5, 116.05, 29.6).unwrap(),
        crs: Crs::wgs84(),
        no_data_value: None,
    };
    write_geotiff(&path, &spec, &ramp_surface(10, 10, 1474.0)).unwrap();

    let dem = DemRaster::from_file(&path).unwrap();
    assert_eq!(dem.crs(), Some(&Crs::wgs84()));
    assert_eq!(dem.no_data_value(), None);
    let bounds = dem.bounds().unwrap();
    assert_relative_eq!(bounds.min_x, 115.9, epsilon = 1e-9);
    assert_relative_eq!(bounds.max_y, 29.6, epsilon = 1e-9);
}
