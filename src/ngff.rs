//! OME-NGFF-style multiscale metadata: each scale level described by a
//! chain of coordinate transformations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::{CoordinateDescriptor, UNIT_ATTR};

/// One axis of a multiscale image, in array dimension order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {}

/// A scale vector, either inline or stored at a path within the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Scale(Vec<f64>),
    Path(String),
}

/// A translation vector, either inline or stored at a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Translation {
    Translation(Vec<f64>),
    Path(String),
}

/// A single coordinate transformation, tagged by its `type` field.
///
/// Kinds this crate cannot resolve still deserialize (into
/// [Unknown](CoordinateTransformation::Unknown)) so that a whole attribute
/// object parses eagerly and the unsupported kind is reported at
/// coordinate-resolution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoordinateTransformation {
    Identity(Identity),
    Scale(Scale),
    Translation(Translation),
    #[serde(untagged)]
    Unknown(Map<String, Value>),
}

impl CoordinateTransformation {
    /// Reverse the dimension order of the transformation's vector.
    ///
    /// e.g. for switching between N5 and Zarr dimension order conventions.
    /// Identity, path-valued and unknown transformations carry no inline
    /// vector and are left as they are.
    pub fn reverse_in_place(&mut self) {
        match self {
            CoordinateTransformation::Scale(Scale::Scale(v)) => v.reverse(),
            CoordinateTransformation::Translation(Translation::Translation(v)) => v.reverse(),
            _ => {}
        }
    }

    pub fn reversed(&self) -> Self {
        let mut out = self.clone();
        out.reverse_in_place();
        out
    }

    fn kind(&self) -> String {
        match self {
            CoordinateTransformation::Identity(_) => "identity".to_string(),
            CoordinateTransformation::Scale(_) => "scale".to_string(),
            CoordinateTransformation::Translation(_) => "translation".to_string(),
            CoordinateTransformation::Unknown(map) => map
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("<untyped>")
                .to_string(),
        }
    }
}

/// One scale level: the path to its array and the transformations mapping
/// its indices to physical coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub path: String,
    #[serde(rename = "coordinateTransformations")]
    pub coordinate_transformations: Vec<CoordinateTransformation>,
}

/// One multiscale pyramid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multiscale {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub axes: Vec<Axis>,
    pub datasets: Vec<Dataset>,
    /// Transformations applied to every dataset, after its own.
    #[serde(
        rename = "coordinateTransformations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub coordinate_transformations: Option<Vec<CoordinateTransformation>>,
    /// Downscaling method, free-form.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub downscale_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Multiscale {
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn n_scales(&self) -> usize {
        self.datasets.len()
    }

    /// Resolve the transformation chain of one level against its array
    /// shape.
    pub fn to_coords(
        &self,
        level: usize,
        shape: &[u64],
    ) -> crate::Result<Vec<CoordinateDescriptor>> {
        let dataset = self.datasets.get(level).ok_or(crate::Error::IndexOutOfRange {
            index: level as isize,
            len: self.n_scales(),
        })?;
        let transforms = dataset
            .coordinate_transformations
            .iter()
            .chain(self.coordinate_transformations.iter().flatten());
        transforms_to_coords(&self.axes, transforms, shape)
    }

    /// Reverse the dimension order of the axis list and of every attached
    /// transformation vector.
    ///
    /// e.g. for switching between N5 and Zarr dimension order conventions.
    pub fn reverse_in_place(&mut self) {
        self.axes.reverse();
        for ct in self.coordinate_transformations.iter_mut().flatten() {
            ct.reverse_in_place();
        }
        for dataset in &mut self.datasets {
            for ct in &mut dataset.coordinate_transformations {
                ct.reverse_in_place();
            }
        }
    }

    pub fn reversed(&self) -> Self {
        let mut out = self.clone();
        out.reverse_in_place();
        out
    }
}

/// The `multiscales` attribute object: a list of pyramids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiscaleAttrs {
    pub multiscales: Vec<Multiscale>,
}

impl MultiscaleAttrs {
    pub fn from_attributes(attrs: &Map<String, Value>) -> crate::Result<Self> {
        Ok(serde_json::from_value(Value::Object(attrs.clone()))?)
    }

    pub fn reverse_in_place(&mut self) {
        for multiscale in &mut self.multiscales {
            multiscale.reverse_in_place();
        }
    }

    pub fn reversed(&self) -> Self {
        let mut out = self.clone();
        out.reverse_in_place();
        out
    }
}

/// Compose a transformation chain into one (offset, spacing) pair per axis
/// and expand those against the array shape.
///
/// Transformations apply in declaration order: a scale multiplies the
/// running spacing and offset, a translation adds to the offset. Axes with
/// no transformation default to spacing 1, offset 0. NGFF axes are declared
/// in array dimension order, so no reversal happens here.
pub fn transforms_to_coords<'a>(
    axes: &[Axis],
    transforms: impl IntoIterator<Item = &'a CoordinateTransformation>,
    shape: &[u64],
) -> crate::Result<Vec<CoordinateDescriptor>> {
    let ndim = axes.len();
    if shape.len() != ndim {
        return Err(crate::Error::Dimensionality {
            field: "shape",
            expected: ndim,
            actual: shape.len(),
        });
    }
    let mut offset = vec![0.0_f64; ndim];
    let mut spacing = vec![1.0_f64; ndim];
    for transform in transforms {
        match transform {
            CoordinateTransformation::Identity(_) => {}
            CoordinateTransformation::Scale(Scale::Scale(factors)) => {
                check_vector_len("scale", factors, ndim)?;
                for idx in 0..ndim {
                    spacing[idx] *= factors[idx];
                    offset[idx] *= factors[idx];
                }
            }
            CoordinateTransformation::Translation(Translation::Translation(shifts)) => {
                check_vector_len("translation", shifts, ndim)?;
                for idx in 0..ndim {
                    offset[idx] += shifts[idx];
                }
            }
            other => {
                return Err(crate::Error::UnsupportedTransform(other.kind()));
            }
        }
    }
    let coords = axes
        .iter()
        .enumerate()
        .map(|(idx, axis)| {
            let step = spacing[idx];
            let start = offset[idx];
            let values = (0..shape[idx]).map(|i| start + i as f64 * step).collect();
            let mut coord = CoordinateDescriptor::numeric(&axis.name, values);
            if let Some(unit) = &axis.unit {
                coord = coord.with_unit(UNIT_ATTR, unit.clone());
            }
            coord
        })
        .collect();
    Ok(coords)
}

fn check_vector_len(field: &'static str, vector: &[f64], ndim: usize) -> crate::Result<()> {
    if vector.len() != ndim {
        return Err(crate::Error::Dimensionality {
            field,
            expected: ndim,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, from_value, json, to_value};

    fn axes_zyx() -> Vec<Axis> {
        ["z", "y", "x"]
            .into_iter()
            .map(|name| Axis {
                name: name.to_string(),
                axis_type: Some("space".to_string()),
                unit: Some("micrometer".to_string()),
            })
            .collect()
    }

    fn scale(v: &[f64]) -> CoordinateTransformation {
        CoordinateTransformation::Scale(Scale::Scale(v.to_vec()))
    }

    fn translation(v: &[f64]) -> CoordinateTransformation {
        CoordinateTransformation::Translation(Translation::Translation(v.to_vec()))
    }

    #[test]
    fn deserialize_scale() {
        let ct: CoordinateTransformation =
            from_str(r#"{"type": "scale", "scale": [1.0, 2.0, 3.0]}"#).unwrap();
        assert_eq!(ct, scale(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn deserialize_translation_path() {
        let ct: CoordinateTransformation =
            from_str(r#"{"type": "translation", "path": "shifts"}"#).unwrap();
        assert_eq!(
            ct,
            CoordinateTransformation::Translation(Translation::Path("shifts".to_string()))
        );
    }

    #[test]
    fn deserialize_unknown_kind() {
        let ct: CoordinateTransformation =
            from_str(r#"{"type": "rotation", "rotation": [0.0, 1.0]}"#).unwrap();
        assert!(matches!(ct, CoordinateTransformation::Unknown(_)));
    }

    #[test]
    fn serialize_round_trip() {
        for ct in [
            scale(&[1.0, 2.0]),
            translation(&[3.0, 4.0]),
            CoordinateTransformation::Identity(Identity {}),
        ] {
            let value = to_value(&ct).unwrap();
            let back: CoordinateTransformation = from_value(value).unwrap();
            assert_eq!(back, ct);
        }
    }

    #[test]
    fn scale_then_translation() {
        let transforms = [scale(&[2.0, 2.0, 2.0]), translation(&[10.0, 10.0, 10.0])];
        let coords = transforms_to_coords(&axes_zyx(), &transforms, &[5, 5, 5]).unwrap();
        assert_eq!(
            coords[0].values.as_numeric().unwrap(),
            &[10.0, 12.0, 14.0, 16.0, 18.0]
        );
        assert_eq!(coords[0].name, "z");
        assert_eq!(coords[0].unit(), Some("micrometer"));
    }

    #[test]
    fn translation_then_scale_scales_the_offset() {
        let transforms = [translation(&[1.0, 1.0, 1.0]), scale(&[2.0, 2.0, 2.0])];
        let coords = transforms_to_coords(&axes_zyx(), &transforms, &[3, 3, 3]).unwrap();
        assert_eq!(coords[0].values.as_numeric().unwrap(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn no_transforms_default_to_unit_spacing() {
        let coords = transforms_to_coords(&axes_zyx(), [], &[3, 3, 3]).unwrap();
        assert_eq!(coords[1].values.as_numeric().unwrap(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn unknown_kind_fails_resolution() {
        let ct: CoordinateTransformation =
            from_str(r#"{"type": "rotation", "rotation": [0.0]}"#).unwrap();
        let err = transforms_to_coords(&axes_zyx(), [&ct], &[3, 3, 3]).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedTransform(kind) if kind == "rotation"));
    }

    #[test]
    fn path_valued_scale_fails_resolution() {
        let ct = CoordinateTransformation::Scale(Scale::Path("scales".to_string()));
        let err = transforms_to_coords(&axes_zyx(), [&ct], &[3, 3, 3]).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedTransform(_)));
    }

    #[test]
    fn vector_length_mismatch_fails() {
        let err = transforms_to_coords(&axes_zyx(), [&scale(&[2.0, 2.0])], &[3, 3, 3]).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Dimensionality {
                field: "scale",
                expected: 3,
                actual: 2,
            }
        ));
    }

    fn multiscale_fixture() -> Multiscale {
        from_value(json!({
            "version": "0.4",
            "name": "em",
            "axes": [
                {"name": "z", "type": "space", "unit": "nanometer"},
                {"name": "y", "type": "space", "unit": "nanometer"},
                {"name": "x", "type": "space", "unit": "nanometer"},
            ],
            "datasets": [
                {
                    "path": "s0",
                    "coordinateTransformations": [
                        {"type": "scale", "scale": [40.0, 4.0, 4.0]},
                    ],
                },
                {
                    "path": "s1",
                    "coordinateTransformations": [
                        {"type": "scale", "scale": [40.0, 8.0, 8.0]},
                        {"type": "translation", "translation": [0.0, 2.0, 2.0]},
                    ],
                },
            ],
            "coordinateTransformations": [
                {"type": "scale", "scale": [1.0, 1.0, 1.0]},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn multiscale_level_coords() {
        let multiscale = multiscale_fixture();
        assert_eq!(multiscale.ndim(), 3);
        assert_eq!(multiscale.n_scales(), 2);
        let coords = multiscale.to_coords(1, &[10, 10, 10]).unwrap();
        assert_eq!(coords[1].values.as_numeric().unwrap()[..3], [2.0, 10.0, 18.0]);
        assert_eq!(coords[0].values.as_numeric().unwrap()[..3], [0.0, 40.0, 80.0]);
    }

    #[test]
    fn multiscale_axis_shape_mismatch() {
        let err = multiscale_fixture().to_coords(0, &[10, 10]).unwrap_err();
        assert!(matches!(err, crate::Error::Dimensionality { field: "shape", .. }));
    }

    #[test]
    fn reverse_flips_axes_and_vectors() {
        let multiscale = multiscale_fixture();
        let reversed = multiscale.reversed();
        let names: Vec<_> = reversed.axes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
        assert_eq!(
            reversed.datasets[1].coordinate_transformations[0],
            scale(&[8.0, 8.0, 40.0])
        );
        assert_eq!(
            reversed.datasets[1].coordinate_transformations[1],
            translation(&[2.0, 2.0, 0.0])
        );
    }

    #[test]
    fn double_reversal_is_identity() {
        let multiscale = multiscale_fixture();
        assert_eq!(multiscale.reversed().reversed(), multiscale);

        let mut attrs = MultiscaleAttrs {
            multiscales: vec![multiscale],
        };
        let original = attrs.clone();
        attrs.reverse_in_place();
        attrs.reverse_in_place();
        assert_eq!(attrs, original);
    }
}
