use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use ndarray::ArrayView1;

use crate::error::{PartitionError, Result};

/// The concrete kind of a [`DistanceValue`], ordered by declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistanceKind {
    Double,
    Float,
    Integer,
    Bit,
    Correlation,
}

/// A distance between two objects.
///
/// Equality is derived from the ordering: two values are equal iff they are
/// of the same kind and compare as `Equal`. Values of different kinds are
/// never equal, whatever their magnitude. Floating-point kinds use
/// `total_cmp`, so `-0.0` and `0.0` are distinct and `NaN` equals itself.
#[derive(Debug, Clone, Copy)]
pub enum DistanceValue {
    Double(f64),
    Float(f32),
    Integer(i64),
    Bit(bool),
    /// Correlation distance: the correlation dimensionality is compared
    /// first, the Euclidean part breaks ties.
    Correlation { dimension: usize, distance: f64 },
}

impl DistanceValue {
    pub fn kind(&self) -> DistanceKind {
        match self {
            DistanceValue::Double(_) => DistanceKind::Double,
            DistanceValue::Float(_) => DistanceKind::Float,
            DistanceValue::Integer(_) => DistanceKind::Integer,
            DistanceValue::Bit(_) => DistanceKind::Bit,
            DistanceValue::Correlation { .. } => DistanceKind::Correlation,
        }
    }

    /// Equality against an arbitrary value. Anything that is not a
    /// `DistanceValue` is simply unequal.
    pub fn equals(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<DistanceValue>()
            .is_some_and(|other| self == other)
    }

    /// The largest value of the same kind.
    pub fn infinite_like(&self) -> Self {
        match self {
            DistanceValue::Double(_) => DistanceValue::Double(f64::INFINITY),
            DistanceValue::Float(_) => DistanceValue::Float(f32::INFINITY),
            DistanceValue::Integer(_) => DistanceValue::Integer(i64::MAX),
            DistanceValue::Bit(_) => DistanceValue::Bit(true),
            DistanceValue::Correlation { .. } => DistanceValue::Correlation {
                dimension: usize::MAX,
                distance: f64::INFINITY,
            },
        }
    }

    /// The zero value of the same kind.
    pub fn null_like(&self) -> Self {
        match self {
            DistanceValue::Double(_) => DistanceValue::Double(0.0),
            DistanceValue::Float(_) => DistanceValue::Float(0.0),
            DistanceValue::Integer(_) => DistanceValue::Integer(0),
            DistanceValue::Bit(_) => DistanceValue::Bit(false),
            DistanceValue::Correlation { .. } => DistanceValue::Correlation {
                dimension: 0,
                distance: 0.0,
            },
        }
    }

    pub fn is_infinite(&self) -> bool {
        *self == self.infinite_like()
    }

    /// Scalar view of the value, used for reporting.
    pub fn as_f64(&self) -> f64 {
        match *self {
            DistanceValue::Double(d) => d,
            DistanceValue::Float(f) => f as f64,
            DistanceValue::Integer(i) => i as f64,
            DistanceValue::Bit(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            DistanceValue::Correlation { distance, .. } => distance,
        }
    }
}

impl Ord for DistanceValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use DistanceValue::*;
        match (self, other) {
            (Double(a), Double(b)) => a.total_cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Bit(a), Bit(b)) => a.cmp(b),
            (
                Correlation {
                    dimension: da,
                    distance: a,
                },
                Correlation {
                    dimension: db,
                    distance: b,
                },
            ) => da.cmp(db).then_with(|| a.total_cmp(b)),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl PartialOrd for DistanceValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DistanceValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceValue {}

// Must agree with `Ord`: equal values share the kind and the bit pattern.
impl Hash for DistanceValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match *self {
            DistanceValue::Double(d) => d.to_bits().hash(state),
            DistanceValue::Float(f) => f.to_bits().hash(state),
            DistanceValue::Integer(i) => i.hash(state),
            DistanceValue::Bit(b) => b.hash(state),
            DistanceValue::Correlation {
                dimension,
                distance,
            } => {
                dimension.hash(state);
                distance.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for DistanceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceValue::Double(d) => write!(f, "{d}"),
            DistanceValue::Float(v) => write!(f, "{v}"),
            DistanceValue::Integer(i) => write!(f, "{i}"),
            DistanceValue::Bit(b) => write!(f, "{}", u8::from(*b)),
            DistanceValue::Correlation {
                dimension,
                distance,
            } => write!(f, "{dimension}:{distance}"),
        }
    }
}

/// Distance metric used to compare dataset vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "persistence",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum DistanceMetric {
    /// Euclidean (L2) distance. Range [0, inf).
    #[default]
    Euclidean,
    /// Cosine distance: 1 - cos(a, b). Range [0, 2]. 0 = identical direction.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors, accumulated in double precision.
    pub fn distance(&self, a: &ArrayView1<f32>, b: &ArrayView1<f32>) -> Result<DistanceValue> {
        if a.len() != b.len() {
            return Err(PartitionError::DimensionMismatch {
                expected: a.len(),
                got: b.len(),
            });
        }
        let pairs = a.iter().zip(b.iter()).map(|(&x, &y)| (f64::from(x), f64::from(y)));
        let d = match self {
            DistanceMetric::Euclidean => pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt(),
            DistanceMetric::Cosine => {
                let (dot, aa, bb) = pairs.fold((0.0, 0.0, 0.0), |(dot, aa, bb), (x, y)| {
                    (dot + x * y, aa + x * x, bb + y * y)
                });
                let norms = (aa * bb).sqrt();
                // A zero vector has no direction.
                if norms == 0.0 {
                    1.0
                } else {
                    1.0 - dot / norms
                }
            }
        };
        Ok(DistanceValue::Double(d))
    }
}
