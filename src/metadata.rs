use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::{CoordinateDescriptor, OTHER_UNIT_ATTR, UNIT_ATTR};

/// Name given to axes the metadata leaves unnamed.
fn dim_name(idx: usize) -> String {
    format!("dim_{idx}")
}

/// Axis naming shared by both viewer metadata variants.
///
/// `axes` is declared outer-to-inner (N5 convention, the reverse of the
/// array's storage order). `coordinateArrays` replaces computed coordinates
/// with explicit labels for the named axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axes: Option<Vec<String>>,
    #[serde(
        default,
        rename = "coordinateArrays",
        skip_serializing_if = "Option::is_none"
    )]
    pub coordinate_arrays: Option<BTreeMap<String, Vec<String>>>,
}

impl AxisOverrides {
    fn validate(&self) -> crate::Result<()> {
        let Some(arrays) = &self.coordinate_arrays else {
            return Ok(());
        };
        if arrays.is_empty() {
            return Ok(());
        }
        let Some(axes) = &self.axes else {
            return Err(crate::Error::schema("coordinateArrays given, but no axes"));
        };
        for name in arrays.keys() {
            if !axes.iter().any(|a| a == name) {
                return Err(crate::Error::UnknownAxis(name.clone()));
            }
        }
        Ok(())
    }

    /// Check the axis list length against a dimensionality derived from
    /// another field.
    fn check_ndim(&self, ndim: usize) -> crate::Result<()> {
        if let Some(axes) = &self.axes
            && axes.len() != ndim
        {
            return Err(crate::Error::Dimensionality {
                field: "axes",
                expected: ndim,
                actual: axes.len(),
            });
        }
        Ok(())
    }

    fn coordinate_array(&self, axis: &str) -> Option<&[String]> {
        self.coordinate_arrays.as_ref()?.get(axis).map(Vec::as_slice)
    }
}

/// The `pixelResolution` attribute: one base resolution vector and a single
/// unit shared by all axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelResolution {
    pub unit: String,
    pub dimensions: Vec<f64>,
}

/// Neuroglancer-style N5 multiscale metadata, keyed by absolute per-level
/// scale factors over a base `pixelResolution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct N5ViewerMetadata {
    #[serde(flatten)]
    pub overrides: AxisOverrides,
    #[serde(rename = "pixelResolution")]
    pub pixel_resolution: PixelResolution,
    pub scales: Vec<Vec<f64>>,
}

impl N5ViewerMetadata {
    pub fn from_attributes(attrs: &Map<String, Value>) -> crate::Result<Self> {
        let meta: Self = serde_json::from_value(Value::Object(attrs.clone()))?;
        meta.validate()?;
        Ok(meta)
    }

    fn validate(&self) -> crate::Result<()> {
        self.overrides.validate()?;
        let ndim = self.ndim();
        self.overrides.check_ndim(ndim)?;
        for row in &self.scales {
            if row.len() != ndim {
                return Err(crate::Error::Dimensionality {
                    field: "scales",
                    expected: ndim,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.pixel_resolution.dimensions.len()
    }

    pub fn n_scales(&self) -> usize {
        self.scales.len()
    }

    pub fn to_coords(
        &self,
        level: usize,
        shape: &[u64],
    ) -> crate::Result<Vec<CoordinateDescriptor>> {
        let factors = self.scales.get(level).ok_or(crate::Error::IndexOutOfRange {
            index: level as isize,
            len: self.n_scales(),
        })?;
        let scale: Vec<f64> = self
            .pixel_resolution
            .dimensions
            .iter()
            .zip(factors)
            .map(|(base, factor)| base * factor)
            .collect();
        level_coords(&self.overrides, self.ndim(), shape, &scale, |_| {
            (OTHER_UNIT_ATTR, self.pixel_resolution.unit.clone())
        })
    }
}

/// BigDataViewer-style N5 multiscale metadata, keyed by per-level
/// downsampling factors over a base `resolution` with per-axis units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigDataViewerMetadata {
    #[serde(flatten)]
    pub overrides: AxisOverrides,
    #[serde(rename = "downsamplingFactors")]
    pub downsampling_factors: Vec<Vec<f64>>,
    pub resolution: Vec<f64>,
    pub units: Vec<String>,
}

impl BigDataViewerMetadata {
    pub fn from_attributes(attrs: &Map<String, Value>) -> crate::Result<Self> {
        let meta: Self = serde_json::from_value(Value::Object(attrs.clone()))?;
        meta.validate()?;
        Ok(meta)
    }

    fn validate(&self) -> crate::Result<()> {
        self.overrides.validate()?;
        let ndim = self.ndim();
        self.overrides.check_ndim(ndim)?;
        if self.units.len() != ndim {
            return Err(crate::Error::Dimensionality {
                field: "units",
                expected: ndim,
                actual: self.units.len(),
            });
        }
        for row in &self.downsampling_factors {
            if row.len() != ndim {
                return Err(crate::Error::Dimensionality {
                    field: "downsamplingFactors",
                    expected: ndim,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.resolution.len()
    }

    pub fn n_scales(&self) -> usize {
        self.downsampling_factors.len()
    }

    pub fn to_coords(
        &self,
        level: usize,
        shape: &[u64],
    ) -> crate::Result<Vec<CoordinateDescriptor>> {
        let factors =
            self.downsampling_factors
                .get(level)
                .ok_or(crate::Error::IndexOutOfRange {
                    index: level as isize,
                    len: self.n_scales(),
                })?;
        let scale: Vec<f64> = self
            .resolution
            .iter()
            .zip(factors)
            .map(|(base, factor)| base * factor)
            .collect();
        level_coords(&self.overrides, self.ndim(), shape, &scale, |meta_idx| {
            (UNIT_ATTR, self.units[meta_idx].clone())
        })
    }
}

/// Viewer-dialect metadata, either historical variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewerMetadata {
    BigDataViewer(BigDataViewerMetadata),
    N5Viewer(N5ViewerMetadata),
}

impl ViewerMetadata {
    /// Parse a group's attributes as viewer multiscale metadata.
    ///
    /// The downsampling-factor variant is tried first: its field names are
    /// the more specific of the two, so it cannot silently accept a
    /// `pixelResolution`-variant object. If both fail, the second failure
    /// is the one reported.
    pub fn from_attributes(attrs: &Map<String, Value>) -> crate::Result<Self> {
        match BigDataViewerMetadata::from_attributes(attrs) {
            Ok(meta) => Ok(Self::BigDataViewer(meta)),
            Err(err) => {
                log::debug!(
                    "attributes are not downsamplingFactors metadata ({err}); trying pixelResolution variant"
                );
                N5ViewerMetadata::from_attributes(attrs).map(Self::N5Viewer)
            }
        }
    }

    pub fn ndim(&self) -> usize {
        match self {
            ViewerMetadata::BigDataViewer(m) => m.ndim(),
            ViewerMetadata::N5Viewer(m) => m.ndim(),
        }
    }

    pub fn n_scales(&self) -> usize {
        match self {
            ViewerMetadata::BigDataViewer(m) => m.n_scales(),
            ViewerMetadata::N5Viewer(m) => m.n_scales(),
        }
    }

    pub fn to_coords(
        &self,
        level: usize,
        shape: &[u64],
    ) -> crate::Result<Vec<CoordinateDescriptor>> {
        match self {
            ViewerMetadata::BigDataViewer(m) => m.to_coords(level, shape),
            ViewerMetadata::N5Viewer(m) => m.to_coords(level, shape),
        }
    }
}

/// Compute descriptors for every array axis from a per-axis scale vector in
/// metadata (outer-to-inner) order.
///
/// Array axis `i` maps to metadata axis `ndim - i - 1`: the metadata lists
/// axes outer-to-inner while the array indexes its fastest-varying dimension
/// last. An explicit coordinate array for a named axis is used verbatim;
/// axes without one fall through to computed coordinates.
fn level_coords(
    overrides: &AxisOverrides,
    ndim: usize,
    shape: &[u64],
    scale: &[f64],
    unit_for: impl Fn(usize) -> (&'static str, String),
) -> crate::Result<Vec<CoordinateDescriptor>> {
    if shape.len() != ndim {
        return Err(crate::Error::Dimensionality {
            field: "shape",
            expected: ndim,
            actual: shape.len(),
        });
    }
    let mut coords = Vec::with_capacity(ndim);
    for (idx, &dim_len) in shape.iter().enumerate() {
        let meta_idx = ndim - idx - 1;
        let mut name = match &overrides.axes {
            None => dim_name(idx),
            Some(axes) => axes[meta_idx].clone(),
        };
        if let Some(labels) = overrides.coordinate_array(&name) {
            coords.push(CoordinateDescriptor::labels(name, labels.to_vec()));
            continue;
        }
        if name.is_empty() {
            name = dim_name(idx);
        }
        let step = scale[meta_idx];
        let values = (0..dim_len).map(|i| i as f64 * step).collect();
        let (key, unit) = unit_for(meta_idx);
        coords.push(CoordinateDescriptor::numeric(name, values).with_unit(key, unit));
    }
    Ok(coords)
}
