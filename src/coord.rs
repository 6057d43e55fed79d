use serde_json::{Map, Value};

/// Canonical attribute key for an axis' physical unit.
pub const UNIT_ATTR: &str = "unit";
/// Legacy attribute key used by some writers for the same thing.
pub const OTHER_UNIT_ATTR: &str = "units";

/// Values along one axis: physical positions, or opaque labels
/// for categorical axes.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateValues {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

impl CoordinateValues {
    pub fn len(&self) -> usize {
        match self {
            CoordinateValues::Numeric(v) => v.len(),
            CoordinateValues::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            CoordinateValues::Numeric(v) => Some(v),
            CoordinateValues::Labels(_) => None,
        }
    }
}

/// Coordinate label for one axis of one scale level.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateDescriptor {
    pub name: String,
    pub values: CoordinateValues,
    /// Unstructured per-axis attributes (unit tags and anything else
    /// the metadata carried).
    pub attributes: Map<String, Value>,
}

impl CoordinateDescriptor {
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: CoordinateValues::Numeric(values),
            attributes: Map::new(),
        }
    }

    pub fn labels(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: CoordinateValues::Labels(labels),
            attributes: Map::new(),
        }
    }

    /// Tag with a unit under the given attribute key.
    pub fn with_unit(mut self, key: &str, unit: impl Into<String>) -> Self {
        self.attributes
            .insert(key.to_string(), Value::String(unit.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The unit under the canonical key, if any.
    pub fn unit(&self) -> Option<&str> {
        self.attributes.get(UNIT_ATTR).and_then(Value::as_str)
    }

    /// Move a unit stored under the legacy key to the canonical key.
    ///
    /// The legacy value wins if both are present; afterwards at most the
    /// canonical key is set.
    pub fn normalize_unit(&mut self) {
        if let Some(unit) = self.attributes.remove(OTHER_UNIT_ATTR) {
            self.attributes.insert(UNIT_ATTR.to_string(), unit);
        }
    }

    /// Numeric values plus canonical unit, when both are present.
    ///
    /// A descriptor in this state can be promoted to a unit-aware numeric
    /// representation by a [Quantify] implementation.
    pub fn quantifiable(&self) -> Option<(&[f64], &str)> {
        Some((self.values.as_numeric()?, self.unit()?))
    }
}

/// Normalize the unit attribute key on every descriptor.
pub fn normalize_units(coords: &mut [CoordinateDescriptor]) {
    for coord in coords {
        coord.normalize_unit();
    }
}

/// Capability for promoting plain coordinate values to a unit-aware
/// numeric representation. Implementations live outside this crate;
/// nothing here requires one.
pub trait Quantify {
    type Output;

    fn quantify(&self, values: &[f64], unit: &str) -> Option<Self::Output>;
}
