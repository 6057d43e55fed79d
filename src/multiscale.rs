use crate::array::LabeledArray;
use crate::coord::normalize_units;
use crate::metadata::ViewerMetadata;
use crate::ngff::{Multiscale, MultiscaleAttrs};
use crate::storage::MultiscaleGroup;

/// Viewer-dialect level arrays are named by this prefix plus the zero-based
/// level index ("s0", "s1", ...).
pub const DATASET_PREFIX: &str = "s";

/// A read-only sequence of scale levels, shared by both metadata dialects.
///
/// Implementors provide [len](MultiscaleSequence::len),
/// [ndim](MultiscaleSequence::ndim) and level retrieval by resolved index;
/// negative-index and slice handling come for free.
pub trait MultiscaleSequence {
    /// Number of scale levels.
    fn len(&self) -> usize;

    /// Dimensionality of every level array.
    fn ndim(&self) -> usize;

    /// Retrieve one level by non-negative index.
    fn get_level(&self, level: usize) -> crate::Result<LabeledArray>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve a level, counting from the end for negative indices.
    fn get(&self, index: isize) -> crate::Result<LabeledArray> {
        let len = self.len();
        let level = resolve_index(index, len)
            .ok_or(crate::Error::IndexOutOfRange { index, len })?;
        self.get_level(level)
    }

    /// Whether `index` is strictly between `-len` and `len`.
    ///
    /// Note the open lower bound: `contains(-len)` is false even though
    /// `get(-len)` resolves to the first level.
    fn contains(&self, index: isize) -> bool {
        let len = self.len() as isize;
        -len < index && index < len
    }

    /// Retrieve the levels selected by `slice`, in slice order.
    fn get_range(&self, slice: &SliceSpec) -> crate::Result<Vec<LabeledArray>> {
        let levels = slice.resolve(self.len());
        let mut out = Vec::with_capacity(levels.len());
        for level in levels {
            out.push(self.get_level(level)?);
        }
        Ok(out)
    }
}

fn resolve_index(index: isize, len: usize) -> Option<usize> {
    let len = len as isize;
    let shifted = if index < 0 { index + len } else { index };
    (0..len).contains(&shifted).then_some(shifted as usize)
}

/// A Python-style slice: optional start/stop/step, any of them negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceSpec {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl SliceSpec {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// Resolve against a sequence length, yielding indices in slice order.
    ///
    /// Follows Python `slice.indices` semantics: out-of-range bounds clamp
    /// rather than error, and a negative step walks backwards.
    ///
    /// # Panics
    /// If `step` is zero.
    pub fn resolve(&self, len: usize) -> Vec<usize> {
        let len = len as isize;
        let step = self.step.unwrap_or(1);
        assert!(step != 0, "slice step cannot be zero");

        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
        let clamp = |bound: isize| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };
        let start = self.start.map_or(if step < 0 { upper } else { lower }, clamp);
        let stop = self.stop.map_or(if step < 0 { lower } else { upper }, clamp);

        let mut out = Vec::new();
        let mut idx = start;
        if step > 0 {
            while idx < stop {
                out.push(idx as usize);
                idx += step;
            }
        } else {
            while idx > stop {
                out.push(idx as usize);
                idx += step;
            }
        }
        out
    }
}

/// Multiscale group described by neuroglancer/BigDataViewer N5 metadata.
///
/// Metadata is parsed eagerly at construction; level arrays are resolved
/// lazily, one per [get](MultiscaleSequence::get).
#[derive(Debug)]
pub struct NglN5Multiscale<G> {
    group: G,
    metadata: ViewerMetadata,
}

impl<G: MultiscaleGroup> NglN5Multiscale<G> {
    pub fn new(group: G) -> crate::Result<Self> {
        let family = group.storage_family();
        if !family.is_n5() {
            return Err(crate::Error::IncompatibleBackend {
                family: family.to_string(),
            });
        }
        let metadata = ViewerMetadata::from_attributes(group.attributes())?;
        Ok(Self { group, metadata })
    }

    pub fn metadata(&self) -> &ViewerMetadata {
        &self.metadata
    }
}

impl<G: MultiscaleGroup> MultiscaleSequence for NglN5Multiscale<G> {
    fn len(&self) -> usize {
        self.metadata.n_scales()
    }

    fn ndim(&self) -> usize {
        self.metadata.ndim()
    }

    fn get_level(&self, level: usize) -> crate::Result<LabeledArray> {
        let array = self.group.array(&format!("{DATASET_PREFIX}{level}"))?;
        let mut coords = self.metadata.to_coords(level, array.shape())?;
        normalize_units(&mut coords);
        Ok(LabeledArray::new(array, coords))
    }
}

/// Multiscale group described by a `multiscales` transformation-chain
/// attribute. Store-agnostic.
///
/// Axis and transformation consistency is only checked when a level is
/// accessed; construction just parses the attribute object and selects one
/// pyramid by positional index.
#[derive(Debug)]
pub struct OmeMultiscale<G> {
    group: G,
    multiscale: Multiscale,
}

impl<G: MultiscaleGroup> OmeMultiscale<G> {
    /// Open the first pyramid in the group's `multiscales` list.
    pub fn new(group: G) -> crate::Result<Self> {
        Self::with_index(group, 0)
    }

    pub fn with_index(group: G, index: usize) -> crate::Result<Self> {
        let mut attrs = MultiscaleAttrs::from_attributes(group.attributes())?;
        let available = attrs.multiscales.len();
        if index >= available {
            return Err(crate::Error::schema(format!(
                "multiscales index {index} out of range for {available} pyramids"
            )));
        }
        let multiscale = attrs.multiscales.swap_remove(index);
        Ok(Self { group, multiscale })
    }

    pub fn multiscale(&self) -> &Multiscale {
        &self.multiscale
    }
}

impl<G: MultiscaleGroup> MultiscaleSequence for OmeMultiscale<G> {
    fn len(&self) -> usize {
        self.multiscale.n_scales()
    }

    fn ndim(&self) -> usize {
        self.multiscale.ndim()
    }

    fn get_level(&self, level: usize) -> crate::Result<LabeledArray> {
        let dataset =
            self.multiscale
                .datasets
                .get(level)
                .ok_or(crate::Error::IndexOutOfRange {
                    index: level as isize,
                    len: self.multiscale.n_scales(),
                })?;
        let array = self.group.array(&dataset.path)?;
        let mut coords = self.multiscale.to_coords(level, array.shape())?;
        normalize_units(&mut coords);
        Ok(LabeledArray::new(array, coords))
    }
}
