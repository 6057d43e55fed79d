use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::coord::CoordinateDescriptor;
use crate::storage::MultiscaleArray;

/// A backend array wrapped with per-axis coordinate labels.
///
/// Construction performs no I/O: the handle records the backend array and
/// its coordinates, and chunk payloads are only read when
/// [materialize](LabeledArray::materialize) is called.
pub struct LabeledArray {
    array: Arc<dyn MultiscaleArray>,
    coords: Vec<CoordinateDescriptor>,
    attributes: Map<String, Value>,
}

impl LabeledArray {
    pub fn new(array: Arc<dyn MultiscaleArray>, coords: Vec<CoordinateDescriptor>) -> Self {
        let attributes = array.attributes().clone();
        Self {
            array,
            coords,
            attributes,
        }
    }

    pub fn shape(&self) -> &[u64] {
        self.array.shape()
    }

    pub fn ndim(&self) -> usize {
        self.array.shape().len()
    }

    /// Coordinate descriptors, one per axis in array dimension order.
    pub fn coords(&self) -> &[CoordinateDescriptor] {
        &self.coords
    }

    /// Auxiliary non-coordinate attributes carried over from the backend
    /// array.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Read the full array payload from the backend.
    pub fn materialize(&self) -> crate::Result<Bytes> {
        self.array.retrieve()
    }
}

impl std::fmt::Debug for LabeledArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabeledArray")
            .field("shape", &self.array.shape())
            .field("coords", &self.coords)
            .finish_non_exhaustive()
    }
}

/// Relative/absolute tolerances for uniform-spacing checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

/// Summary of one coordinate axis of a [LabeledArray].
///
/// `offset` and `resolution` are `None` for categorical (label-valued) axes
/// and for axes too short to measure a spacing on.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    pub name: String,
    pub offset: Option<f64>,
    pub resolution: Option<f64>,
    pub unit: Option<String>,
    pub len: usize,
}

/// Per-axis offset/resolution/unit/length reconstructed from an
/// already-labeled array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    /// One entry per axis, in the array's dimension order.
    pub axes: Vec<AxisInfo>,
}

impl ArrayInfo {
    /// Derive axis summaries from the array's coordinate labels.
    ///
    /// With `tolerances` given, the spacing of each numeric axis is checked
    /// for uniformity: the spread of consecutive differences must not exceed
    /// `atol + rtol * min(|diff|)`, and the resolution is the smallest
    /// difference. Without, the first difference is taken as-is.
    pub fn from_array(array: &LabeledArray, tolerances: Option<Tolerances>) -> crate::Result<Self> {
        let mut axes = Vec::with_capacity(array.coords().len());
        for coord in array.coords() {
            let unit = coord.unit().map(str::to_string);
            let (offset, resolution) = match coord.values.as_numeric() {
                Some(values) => (
                    values.first().copied(),
                    axis_resolution(&coord.name, values, tolerances)?,
                ),
                None => (None, None),
            };
            axes.push(AxisInfo {
                name: coord.name.clone(),
                offset,
                resolution,
                unit,
                len: coord.len(),
            });
        }
        Ok(Self { axes })
    }

    pub fn axis(&self, name: &str) -> Option<&AxisInfo> {
        self.axes.iter().find(|a| a.name == name)
    }

    /// The same summaries with the axis order flipped.
    pub fn reversed_order(&self) -> Self {
        let mut axes = self.axes.clone();
        axes.reverse();
        Self { axes }
    }
}

fn axis_resolution(
    name: &str,
    values: &[f64],
    tolerances: Option<Tolerances>,
) -> crate::Result<Option<f64>> {
    if values.len() < 2 {
        return Ok(None);
    }
    let resolution = match tolerances {
        None => values[1] - values[0],
        Some(Tolerances { rtol, atol }) => {
            let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
            let min = diffs.iter().copied().fold(f64::INFINITY, f64::min);
            let max = diffs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min_abs = diffs.iter().map(|d| d.abs()).fold(f64::INFINITY, f64::min);
            let spread = max - min;
            let tolerance = atol + rtol * min_abs;
            if spread > tolerance {
                return Err(crate::Error::InconsistentSpacing {
                    axis: name.to_string(),
                    spread,
                    tolerance,
                });
            }
            min
        }
    };
    if resolution <= 0.0 {
        return Err(crate::Error::NonMonotonic {
            axis: name.to_string(),
            resolution,
        });
    }
    Ok(Some(resolution))
}
