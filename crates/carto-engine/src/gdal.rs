//! [`ProcessingEngine`] backed by the GDAL command-line utilities.

use crate::info::parse_gdalinfo;
use crate::{
    ClipRequest, ColorReliefRequest, ContourRequest, EngineError, HillshadeRequest,
    ProbeRequest, ProcessingEngine, RasterInfo, Result, TransformBoundsRequest,
    VectorReprojectRequest, WarpRequest,
};
use carto_model::style::RampInterpolation;
use carto_model::{BoundingBox, EngineConfig};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

/// Points sampled along each edge when transforming a bounding box, so that
/// curved edges in the destination reference are covered.
const EDGE_SAMPLES: usize = 8;

/// Nodata written outside the cutline when clipping by mask.
const MASK_NODATA: &str = "-9999";

/// Runs `gdalinfo`, `gdalwarp`, `gdaldem`, `gdal_contour`, `ogr2ogr` and
/// `gdaltransform` as child processes.
#[derive(Debug, Clone, Default)]
pub struct GdalCliEngine {
    bin_dir: Option<PathBuf>,
}

impl GdalCliEngine {
    /// Engine resolving tools through `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine resolving tools inside `bin_dir`.
    pub fn with_bin_dir(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: Some(bin_dir.into()),
        }
    }

    /// Engine configured from the run configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            bin_dir: config.bin_dir.clone(),
        }
    }

    fn command(&self, tool: &str) -> Command {
        match &self.bin_dir {
            Some(dir) => Command::new(dir.join(tool)),
            None => Command::new(tool),
        }
    }

    fn check(tool: &str, output: Output) -> Result<String> {
        if !output.status.success() {
            return Err(EngineError::ToolFailed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_error(tool: &str, err: std::io::Error) -> EngineError {
        if err.kind() == std::io::ErrorKind::NotFound {
            EngineError::ToolNotFound(tool.to_string())
        } else {
            EngineError::Io(err)
        }
    }

    fn run(&self, tool: &str, args: &[OsString]) -> Result<String> {
        debug!(tool, args = ?args, "Running engine tool");
        let output = self
            .command(tool)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(tool, e))?;
        Self::check(tool, output)
    }

    fn run_with_input(&self, tool: &str, args: &[OsString], input: &str) -> Result<String> {
        debug!(tool, args = ?args, "Running engine tool");
        let mut child = self
            .command(tool)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(tool, e))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        Self::check(tool, output)
    }
}

/// Remove an earlier output so tools that refuse to overwrite can run.
fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn os(s: impl Into<OsString>) -> OsString {
    s.into()
}

pub(crate) fn clip_args(req: &ClipRequest) -> Vec<OsString> {
    let mut args = vec![os("-overwrite"), os("-of"), os("GTiff")];
    match &req.cutline {
        Some(cutline) => {
            args.extend([
                os("-cutline"),
                os(cutline.as_os_str()),
                os("-crop_to_cutline"),
                os("-dstnodata"),
                os(MASK_NODATA),
            ]);
        }
        None => {
            let b = req.bounds;
            args.push(os("-te"));
            args.extend([b.min_x, b.min_y, b.max_x, b.max_y].iter().map(|v| os(v.to_string())));
            args.extend([os("-te_srs"), os(req.bounds_crs.as_str())]);
        }
    }
    args.extend([os(req.source.as_os_str()), os(req.output.as_os_str())]);
    args
}

pub(crate) fn warp_args(req: &WarpRequest) -> Vec<OsString> {
    vec![
        os("-overwrite"),
        os("-of"),
        os("GTiff"),
        os("-t_srs"),
        os(req.target_crs.as_str()),
        os("-r"),
        os(req.resampling.as_str()),
        os(req.source.as_os_str()),
        os(req.output.as_os_str()),
    ]
}

pub(crate) fn hillshade_args(req: &HillshadeRequest) -> Vec<OsString> {
    vec![
        os("hillshade"),
        os(req.source.as_os_str()),
        os(req.output.as_os_str()),
        os("-of"),
        os("GTiff"),
        os("-z"),
        os(req.z_factor.to_string()),
        os("-az"),
        os(req.azimuth.to_string()),
        os("-alt"),
        os(req.altitude.to_string()),
        os("-compute_edges"),
    ]
}

pub(crate) fn color_relief_args(req: &ColorReliefRequest, table: &Path) -> Vec<OsString> {
    let mut args = vec![
        os("color-relief"),
        os(req.source.as_os_str()),
        os(table.as_os_str()),
        os(req.output.as_os_str()),
        os("-of"),
        os("GTiff"),
        os("-alpha"),
    ];
    if req.interpolation == RampInterpolation::Discrete {
        args.push(os("-nearest_color_entry"));
    }
    args
}

pub(crate) fn contour_args(req: &ContourRequest) -> Vec<OsString> {
    vec![
        os("-a"),
        os(req.attribute.as_str()),
        os("-i"),
        os(req.interval.to_string()),
        os("-f"),
        os("GeoJSON"),
        os(req.source.as_os_str()),
        os(req.output.as_os_str()),
    ]
}

pub(crate) fn vector_reproject_args(req: &VectorReprojectRequest) -> Vec<OsString> {
    let mut args = vec![os("-f"), os("GeoJSON"), os("-t_srs"), os(req.target_crs.as_str())];
    if let Some(source_crs) = &req.source_crs {
        args.extend([os("-s_srs"), os(source_crs.as_str())]);
    }
    args.extend([os(req.output.as_os_str()), os(req.source.as_os_str())]);
    args
}

/// Points along the boundary of `bounds`, corners included.
pub(crate) fn boundary_points(bounds: &BoundingBox) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(EDGE_SAMPLES * 4);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        let x = bounds.min_x + t * bounds.width();
        let y = bounds.min_y + t * bounds.height();
        points.push((x, bounds.min_y));
        points.push((bounds.max_x, y));
        points.push((bounds.max_x - t * bounds.width(), bounds.max_y));
        points.push((bounds.min_x, bounds.max_y - t * bounds.height()));
    }
    points
}

/// Parse `gdaltransform -output_xy` output, one `x y` pair per line.
pub(crate) fn parse_transformed(output: &str) -> Result<Vec<(f64, f64)>> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut parts = line.split_whitespace().map(str::parse::<f64>);
            match (parts.next(), parts.next()) {
                (Some(Ok(x)), Some(Ok(y))) if x.is_finite() && y.is_finite() => Ok((x, y)),
                _ => Err(EngineError::UnexpectedOutput {
                    tool: "gdaltransform".to_string(),
                    detail: format!("cannot parse '{}'", line),
                }),
            }
        })
        .collect()
}

impl ProcessingEngine for GdalCliEngine {
    fn probe_raster(&self, req: &ProbeRequest) -> Result<RasterInfo> {
        if !req.source.is_file() {
            return Err(EngineError::SourceUnreadable {
                path: req.source.clone(),
                reason: "file does not exist".to_string(),
            });
        }
        let json = self
            .run("gdalinfo", &[os("-json"), os(req.source.as_os_str())])
            .map_err(|e| match e {
                EngineError::ToolFailed { stderr, .. } => EngineError::SourceUnreadable {
                    path: req.source.clone(),
                    reason: stderr,
                },
                other => other,
            })?;
        parse_gdalinfo(&json).map_err(|e| EngineError::SourceUnreadable {
            path: req.source.clone(),
            reason: e.to_string(),
        })
    }

    fn clip_raster(&self, req: &ClipRequest) -> Result<PathBuf> {
        self.run("gdalwarp", &clip_args(req))?;
        Ok(req.output.clone())
    }

    fn warp_raster(&self, req: &WarpRequest) -> Result<PathBuf> {
        self.run("gdalwarp", &warp_args(req))?;
        Ok(req.output.clone())
    }

    fn hillshade(&self, req: &HillshadeRequest) -> Result<PathBuf> {
        self.run("gdaldem", &hillshade_args(req))?;
        Ok(req.output.clone())
    }

    fn color_relief(&self, req: &ColorReliefRequest) -> Result<PathBuf> {
        let table = req.output.with_extension("colors.txt");
        std::fs::write(&table, req.color_table())?;
        let result = self.run("gdaldem", &color_relief_args(req, &table));
        if let Err(e) = std::fs::remove_file(&table) {
            warn!(path = %table.display(), error = %e, "Could not remove color table");
        }
        result?;
        Ok(req.output.clone())
    }

    fn contours(&self, req: &ContourRequest) -> Result<PathBuf> {
        remove_stale(&req.output)?;
        self.run("gdal_contour", &contour_args(req))?;
        Ok(req.output.clone())
    }

    fn reproject_vector(&self, req: &VectorReprojectRequest) -> Result<PathBuf> {
        remove_stale(&req.output)?;
        self.run("ogr2ogr", &vector_reproject_args(req))?;
        Ok(req.output.clone())
    }

    fn transform_bounds(&self, req: &TransformBoundsRequest) -> Result<BoundingBox> {
        let input: String = boundary_points(&req.bounds)
            .iter()
            .map(|(x, y)| format!("{} {}\n", x, y))
            .collect();
        let args = [
            os("-s_srs"),
            os(req.from.as_str()),
            os("-t_srs"),
            os(req.to.as_str()),
            os("-output_xy"),
        ];
        let output = self.run_with_input("gdaltransform", &args, &input)?;
        let points = parse_transformed(&output)?;
        BoundingBox::from_points(points)
            .filter(BoundingBox::is_valid)
            .ok_or_else(|| EngineError::UnexpectedOutput {
                tool: "gdaltransform".to_string(),
                detail: "transformed bounds are degenerate".to_string(),
            })
    }
}
