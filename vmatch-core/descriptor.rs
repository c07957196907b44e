use crate::error::{DescriptorError, DescriptorResult};
use crate::MetricFamily;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major descriptor matrix, one fixed-width row per keypoint
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMatrix<T> {
    data: Vec<T>,
    width: usize,
}

impl<T: Copy> DescriptorMatrix<T> {
    /// Wrap a flat row-major buffer. `data.len()` must be a multiple of `width`.
    pub fn from_flat(data: Vec<T>, width: usize) -> DescriptorResult<Self> {
        if width == 0 {
            return Err(DescriptorError::ZeroWidth);
        }
        if data.len() % width != 0 {
            return Err(DescriptorError::TruncatedBuffer {
                len: data.len(),
                width,
            });
        }
        Ok(Self { data, width })
    }

    /// Build from per-keypoint rows; all rows must share the first row's length.
    ///
    /// An empty row list yields an empty matrix of width 1 so that absent
    /// features and "zero features" look the same downstream.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> DescriptorResult<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self { data: Vec::new(), width: 1 });
        };
        let width = first.as_ref().len();
        if width == 0 {
            return Err(DescriptorError::ZeroWidth);
        }

        let mut data = Vec::with_capacity(width * rows.len());
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(DescriptorError::RaggedRow {
                    row,
                    expected: width,
                    actual: r.len(),
                });
            }
            data.extend_from_slice(r);
        }
        Ok(Self { data, width })
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements per descriptor
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.data.chunks_exact(self.width)
    }

    pub fn as_flat(&self) -> &[T] {
        &self.data
    }
}

/// Descriptors produced by one detector run, tagged by family
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "DescriptorSetRepr", into = "DescriptorSetRepr")
)]
pub enum DescriptorSet {
    /// Packed bit strings (ORB, BRIEF, AKAZE), compared under Hamming distance
    Binary(DescriptorMatrix<u8>),
    /// Floating point vectors (SIFT, SURF), compared under Euclidean distance
    Float(DescriptorMatrix<f32>),
}

impl DescriptorSet {
    pub fn family(&self) -> MetricFamily {
        match self {
            DescriptorSet::Binary(_) => MetricFamily::Binary,
            DescriptorSet::Float(_) => MetricFamily::Floating,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DescriptorSet::Binary(m) => m.len(),
            DescriptorSet::Float(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements per descriptor (bytes for binary sets)
    pub fn descriptor_len(&self) -> usize {
        match self {
            DescriptorSet::Binary(m) => m.width(),
            DescriptorSet::Float(m) => m.width(),
        }
    }

    /// Element type name, reported alongside extraction timings
    pub fn element_type(&self) -> &'static str {
        match self {
            DescriptorSet::Binary(_) => "uint8",
            DescriptorSet::Float(_) => "float32",
        }
    }

    pub fn as_binary(&self) -> Option<&DescriptorMatrix<u8>> {
        match self {
            DescriptorSet::Binary(m) => Some(m),
            DescriptorSet::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<&DescriptorMatrix<f32>> {
        match self {
            DescriptorSet::Float(m) => Some(m),
            DescriptorSet::Binary(_) => None,
        }
    }
}

/// Wire shape of a descriptor set: `{"kind": "binary", "rows": [[...], ...]}`
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DescriptorSetRepr {
    Binary { rows: Vec<Vec<u8>> },
    Float { rows: Vec<Vec<f32>> },
}

#[cfg(feature = "serde")]
impl TryFrom<DescriptorSetRepr> for DescriptorSet {
    type Error = DescriptorError;

    fn try_from(repr: DescriptorSetRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            DescriptorSetRepr::Binary { rows } => {
                DescriptorSet::Binary(DescriptorMatrix::from_rows(&rows)?)
            }
            DescriptorSetRepr::Float { rows } => {
                DescriptorSet::Float(DescriptorMatrix::from_rows(&rows)?)
            }
        })
    }
}

#[cfg(feature = "serde")]
impl From<DescriptorSet> for DescriptorSetRepr {
    fn from(set: DescriptorSet) -> Self {
        match set {
            DescriptorSet::Binary(m) => DescriptorSetRepr::Binary {
                rows: m.rows().map(<[u8]>::to_vec).collect(),
            },
            DescriptorSet::Float(m) => DescriptorSetRepr::Float {
                rows: m.rows().map(<[f32]>::to_vec).collect(),
            },
        }
    }
}
