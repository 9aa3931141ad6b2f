//! Deterministic engine and feature-service doubles shared by the
//! integration tests.

#![allow(dead_code)]

use carto_dem::{write_geotiff, DemRaster, GeoTiffSpec};
use carto_engine::{
    ClipRequest, ColorReliefRequest, ContourRequest, EngineError, HillshadeRequest, ProbeRequest,
    ProcessingEngine, RasterInfo, ReliefStop, TransformBoundsRequest, VectorReprojectRequest,
    WarpRequest,
};
use carto_features::{AcquisitionError, HttpClient};
use carto_model::{BoundingBox, CartoConfig, Crs, LayerRegistry};
use carto_runner::{CancelToken, ExtentSource, Pipeline};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const TARGET_CRS: &str = "EPSG:32650";

/// Extent of the test area in the target reference.
pub fn extent_bbox() -> BoundingBox {
    BoundingBox::new(400_000.0, 3_260_000.0, 410_000.0, 3_270_000.0).unwrap()
}

/// The same area in EPSG:4326, as the fake engine reports it.
pub fn wgs84_bbox() -> BoundingBox {
    BoundingBox::new(115.9, 29.5, 116.05, 29.6).unwrap()
}

pub fn rect_extent() -> ExtentSource {
    ExtentSource::Rect {
        bbox: extent_bbox(),
        crs: Crs::new(TARGET_CRS).unwrap(),
    }
}

/// 10x10 surface rising evenly from 0 to 1000.
pub fn ramp_surface() -> Vec<f32> {
    (0..100).map(|idx| (idx as f64 * 1000.0 / 99.0) as f32).collect()
}

/// Write a geographic source DEM into `dir`.
pub fn write_source_dem(dir: &Path) -> PathBuf {
    let path = dir.join("lushan_srtm.tif");
    let spec = GeoTiffSpec {
        width: 10,
        height: 10,
        bounds: wgs84_bbox(),
        crs: Crs::wgs84(),
        no_data_value: Some(-32768.0),
    };
    write_geotiff(&path, &spec, &ramp_surface()).unwrap();
    path
}

/// Configuration writing into `out` with the given source DEM.
pub fn config(out: &Path, source_dem: Option<PathBuf>) -> CartoConfig {
    CartoConfig {
        output_dir: out.to_path_buf(),
        source_dem,
        ..CartoConfig::default()
    }
}

pub fn pipeline(config: CartoConfig, engine: &Arc<FakeEngine>, http: &Arc<FakeHttpClient>) -> Pipeline {
    Pipeline::new(config, engine.clone(), http.clone())
}

/// A pipeline over a fresh output directory with the extent already defined.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub engine: Arc<FakeEngine>,
    pub http: Arc<FakeHttpClient>,
    pub registry: LayerRegistry,
}

impl Fixture {
    pub fn new(engine: FakeEngine, http: FakeHttpClient) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            engine: Arc::new(engine),
            http: Arc::new(http),
            registry: LayerRegistry::new(),
        }
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Pipeline configured with a freshly written source DEM.
    pub fn pipeline(&self) -> Pipeline {
        let dem = write_source_dem(self.dir.path());
        pipeline(config(&self.out(), Some(dem)), &self.engine, &self.http)
    }
}

// ============================================================================
// Fake processing engine
// ============================================================================

/// Engine that writes small but real artifacts without GDAL.
///
/// Probing reads the raster with `carto-dem`. Warping writes a 10x10 ramp
/// from 0 to 1000 in the requested reference. Hillshade, color relief and
/// vector reprojection copy their input. Contours write a single line.
#[derive(Default)]
pub struct FakeEngine {
    failing: HashSet<String>,
    cancel_during: Option<(String, CancelToken)>,
    calls: Mutex<Vec<String>>,
    relief_stops: Mutex<Vec<ReliefStop>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an operation fail. Names: `probe`, `clip`, `warp`, `hillshade`,
    /// `color-relief`, `contour:<interval>`, `vector-reproject`,
    /// `transform-bounds`.
    pub fn failing(mut self, op: &str) -> Self {
        self.failing.insert(op.to_string());
        self
    }

    /// Cancel `token` while `op` runs. The operation itself still succeeds.
    pub fn cancelling_during(mut self, op: &str, token: CancelToken) -> Self {
        self.cancel_during = Some((op.to_string(), token));
        self
    }

    /// Operations performed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    /// Stops of the last color-relief request.
    pub fn relief_stops(&self) -> Vec<ReliefStop> {
        self.relief_stops.lock().unwrap().clone()
    }

    fn enter(&self, op: &str) -> carto_engine::Result<()> {
        self.calls.lock().unwrap().push(op.to_string());
        if let Some((_, token)) = self.cancel_during.as_ref().filter(|(name, _)| name == op) {
            token.cancel();
        }
        if self.failing.contains(op) {
            return Err(EngineError::ToolFailed {
                tool: op.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }

    fn copy(source: &Path, output: &Path) -> carto_engine::Result<PathBuf> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, output)?;
        Ok(output.to_path_buf())
    }
}

fn dem_error(e: carto_dem::DemError) -> EngineError {
    EngineError::UnexpectedOutput {
        tool: "fake".to_string(),
        detail: e.to_string(),
    }
}

impl ProcessingEngine for FakeEngine {
    fn probe_raster(&self, req: &ProbeRequest) -> carto_engine::Result<RasterInfo> {
        self.enter("probe")?;
        let raster = DemRaster::from_file(&req.source).map_err(|e| EngineError::SourceUnreadable {
            path: req.source.clone(),
            reason: e.to_string(),
        })?;
        let (width, height) = raster.dimensions();
        let bounds = raster.bounds().ok_or_else(|| EngineError::SourceUnreadable {
            path: req.source.clone(),
            reason: "no georeferencing".to_string(),
        })?;
        Ok(RasterInfo {
            width,
            height,
            bounds,
            crs: raster.crs().cloned(),
            band_count: 1,
            no_data_value: raster.no_data_value().map(f64::from),
        })
    }

    fn clip_raster(&self, req: &ClipRequest) -> carto_engine::Result<PathBuf> {
        self.enter("clip")?;
        Self::copy(&req.source, &req.output)
    }

    fn warp_raster(&self, req: &WarpRequest) -> carto_engine::Result<PathBuf> {
        self.enter("warp")?;
        if let Some(parent) = req.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let spec = GeoTiffSpec {
            width: 10,
            height: 10,
            bounds: extent_bbox(),
            crs: req.target_crs.clone(),
            no_data_value: None,
        };
        write_geotiff(&req.output, &spec, &ramp_surface()).map_err(dem_error)?;
        Ok(req.output.clone())
    }

    fn hillshade(&self, req: &HillshadeRequest) -> carto_engine::Result<PathBuf> {
        self.enter("hillshade")?;
        Self::copy(&req.source, &req.output)
    }

    fn color_relief(&self, req: &ColorReliefRequest) -> carto_engine::Result<PathBuf> {
        self.enter("color-relief")?;
        *self.relief_stops.lock().unwrap() = req.stops.clone();
        Self::copy(&req.source, &req.output)
    }

    fn contours(&self, req: &ContourRequest) -> carto_engine::Result<PathBuf> {
        self.enter(&format!("contour:{}", req.interval))?;
        let mut properties = serde_json::Map::new();
        properties.insert(req.attribute.clone(), serde_json::json!(req.interval));
        let collection = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": properties,
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[401_000.0, 3_261_000.0], [409_000.0, 3_269_000.0]],
                },
            }],
        });
        if let Some(parent) = req.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&req.output, serde_json::to_string(&collection)?)?;
        Ok(req.output.clone())
    }

    fn reproject_vector(&self, req: &VectorReprojectRequest) -> carto_engine::Result<PathBuf> {
        self.enter("vector-reproject")?;
        Self::copy(&req.source, &req.output)
    }

    fn transform_bounds(&self, _req: &TransformBoundsRequest) -> carto_engine::Result<BoundingBox> {
        self.enter("transform-bounds")?;
        Ok(wgs84_bbox())
    }
}

// ============================================================================
// Fake feature service
// ============================================================================

/// One element of every category, so each filter keeps exactly one feature.
pub const SAMPLE_OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <node id="1" lat="29.55" lon="115.99">
    <tag k="natural" v="peak"/>
    <tag k="name" v="Hanyang Peak"/>
  </node>
  <node id="2" lat="29.56" lon="115.98">
    <tag k="highway" v="bus_stop"/>
  </node>
  <node id="10" lat="29.50" lon="115.90"/>
  <node id="11" lat="29.51" lon="115.91"/>
  <node id="12" lat="29.52" lon="115.90"/>
  <node id="13" lat="29.53" lon="115.92"/>
  <way id="100">
    <nd ref="10"/>
    <nd ref="11"/>
    <tag k="highway" v="primary"/>
  </way>
  <way id="101">
    <nd ref="11"/>
    <nd ref="13"/>
    <tag k="waterway" v="stream"/>
  </way>
  <way id="102">
    <nd ref="10"/>
    <nd ref="11"/>
    <nd ref="12"/>
    <nd ref="10"/>
    <tag k="natural" v="water"/>
    <tag k="name" v="Ruqin Lake"/>
  </way>
  <way id="103">
    <nd ref="11"/>
    <nd ref="12"/>
    <nd ref="13"/>
    <nd ref="11"/>
    <tag k="landuse" v="residential"/>
  </way>
</osm>"#;

/// Feature service that either serves a fixed payload or is unreachable.
pub struct FakeHttpClient {
    payload: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FakeHttpClient {
    pub fn serving(payload: &str) -> Self {
        Self {
            payload: Some(payload.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn sample() -> Self {
        Self::serving(SAMPLE_OSM)
    }

    pub fn offline() -> Self {
        Self {
            payload: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl HttpClient for FakeHttpClient {
    fn post_text(&self, _url: &str, body: &str) -> carto_features::Result<String> {
        self.queries.lock().unwrap().push(body.to_string());
        self.payload
            .clone()
            .ok_or_else(|| AcquisitionError::Network("connection refused".to_string()))
    }
}
