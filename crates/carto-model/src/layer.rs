//! Layers produced by the pipeline and the registry that owns them.

use crate::style::LayerStyle;
use crate::{CategoryKey, Crs, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the persisted registry inside the output directory.
pub const PROJECT_FILE: &str = "project.yaml";

/// Geometry type of a vector layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    /// Points.
    Point,
    /// Line strings.
    Line,
    /// Polygons.
    Polygon,
}

impl GeometryKind {
    /// GeoJSON geometry type names accepted for this kind.
    pub fn geojson_types(&self) -> &'static [&'static str] {
        match self {
            GeometryKind::Point => &["Point", "MultiPoint"],
            GeometryKind::Line => &["LineString", "MultiLineString"],
            GeometryKind::Polygon => &["Polygon", "MultiPolygon"],
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeometryKind::Point => "point",
            GeometryKind::Line => "line",
            GeometryKind::Polygon => "polygon",
        };
        f.write_str(s)
    }
}

/// Raster or vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "geometry", rename_all = "lowercase")]
pub enum LayerKind {
    /// Gridded data.
    Raster,
    /// Features of a single geometry kind.
    Vector(GeometryKind),
}

impl LayerKind {
    /// Geometry kind for vector layers.
    pub fn geometry(&self) -> Option<GeometryKind> {
        match self {
            LayerKind::Raster => None,
            LayerKind::Vector(g) => Some(*g),
        }
    }

    /// Whether this is a raster layer.
    pub fn is_raster(&self) -> bool {
        matches!(self, LayerKind::Raster)
    }
}

/// Which pipeline artifact a layer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerRole {
    /// The map extent polygon.
    MapExtent,
    /// DEM clipped to the extent, in the source CRS.
    ClippedDem,
    /// Clipped DEM reprojected to the target CRS.
    Dem,
    /// Shaded relief.
    Hillshade,
    /// Color-ramp rendering of the DEM.
    DemRender,
    /// Contour lines at a fixed interval.
    Contour {
        /// Elevation interval between lines.
        interval: u32,
    },
    /// One of the fixed feature categories.
    Feature {
        /// Category key.
        category: CategoryKey,
    },
}

impl LayerRole {
    /// Feature category, if this is a feature layer.
    pub fn category(&self) -> Option<CategoryKey> {
        match self {
            LayerRole::Feature { category } => Some(*category),
            _ => None,
        }
    }
}

/// Attribute field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// Integer.
    Integer,
    /// Floating point.
    Real,
}

/// One attribute column of a vector layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    /// Create a field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Attribute schema shared by every feature category layer.
pub fn feature_schema() -> Vec<Field> {
    vec![
        Field::new("osm_id", FieldType::String),
        Field::new("fclass", FieldType::String),
        Field::new("name", FieldType::String),
    ]
}

/// A named artifact on disk with its spatial reference and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique name within the registry.
    pub name: String,
    /// Pipeline artifact this layer represents.
    pub role: LayerRole,
    /// Raster or vector, with geometry kind.
    pub kind: LayerKind,
    /// Spatial reference of the data.
    pub crs: Crs,
    /// Backing file.
    pub path: PathBuf,
    /// Attribute schema (empty for rasters).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    /// Number of features, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<usize>,
    /// Assigned by the styling pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<LayerStyle>,
}

impl Layer {
    /// A raster layer.
    pub fn raster(name: impl Into<String>, role: LayerRole, crs: Crs, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            role,
            kind: LayerKind::Raster,
            crs,
            path,
            fields: Vec::new(),
            feature_count: None,
            style: None,
        }
    }

    /// A vector layer with the given schema.
    pub fn vector(
        name: impl Into<String>,
        role: LayerRole,
        geometry: GeometryKind,
        crs: Crs,
        path: PathBuf,
        fields: Vec<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            kind: LayerKind::Vector(geometry),
            crs,
            path,
            fields,
            feature_count: None,
            style: None,
        }
    }

    /// Set the feature count.
    pub fn with_feature_count(mut self, count: usize) -> Self {
        self.feature_count = Some(count);
        self
    }

    /// Whether the layer has a field of this name.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

/// Insertion-ordered collection of layers keyed by unique name.
///
/// This is the only place pipeline stages register, replace or look up
/// layers. It is passed explicitly to every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
}

impl LayerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    /// Register a new layer. Fails if the name is taken.
    pub fn add(&mut self, layer: Layer) -> Result<()> {
        if self.position(&layer.name).is_some() {
            return Err(ModelError::DuplicateLayer(layer.name));
        }
        debug!(name = %layer.name, crs = %layer.crs, "Registered layer");
        self.layers.push(layer);
        Ok(())
    }

    /// Register a layer, replacing any existing layer of the same name.
    pub fn upsert(&mut self, layer: Layer) {
        match self.position(&layer.name) {
            Some(idx) => self.layers[idx] = layer,
            None => self.layers.push(layer),
        }
    }

    /// Swap the layer of the same name for `layer`, keeping its position.
    /// Returns the layer that was replaced.
    pub fn replace(&mut self, layer: Layer) -> Result<Layer> {
        let idx = self
            .position(&layer.name)
            .ok_or_else(|| ModelError::LayerNotFound(layer.name.clone()))?;
        Ok(std::mem::replace(&mut self.layers[idx], layer))
    }

    /// Remove a layer by name.
    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        self.position(name).map(|idx| self.layers.remove(idx))
    }

    /// Look up a layer by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Mutable lookup by name.
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// First layer with the given role.
    pub fn find_by_role(&self, role: LayerRole) -> Option<&Layer> {
        self.layers.iter().find(|l| l.role == role)
    }

    /// Layers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Layer names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layers are registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Write `project.yaml` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(PROJECT_FILE);
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(&path, yaml)?;
        debug!(path = %path.display(), layers = self.len(), "Saved project");
        Ok(path)
    }

    /// Read `project.yaml` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(PROJECT_FILE);
        let yaml = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    /// Read `project.yaml` from `dir`, or start empty if there is none.
    pub fn load_or_new(dir: &Path) -> Result<Self> {
        if dir.join(PROJECT_FILE).exists() {
            Self::load(dir)
        } else {
            Ok(Self::new())
        }
    }
}
