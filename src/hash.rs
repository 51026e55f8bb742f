use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use rand::Rng;

use crate::distance::DistanceMetric;
use crate::error::{PartitionError, Result};
use crate::projection::{GaussianRandomProjectionFamily, Projection, RandomProjectionFamily};
use crate::random::RandomFactory;

/// Composite bucket key: one bucket index per combined hash function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(pub Vec<i64>);

impl BucketKey {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{b}")?;
        }
        write!(f, ")")
    }
}

/// A hash function that maps nearby vectors to the same key more often than
/// distant ones.
pub trait LocalitySensitiveHashFunction: fmt::Debug + Send + Sync {
    fn hash(&self, vector: &ArrayView1<f32>) -> Result<BucketKey>;

    /// Number of combined components in every key.
    fn num_projections(&self) -> usize;

    fn dimensionality(&self) -> usize;
}

/// Builds hash functions for a given dimensionality.
pub trait HashFunctionFamily: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Draw a fresh hash function. With a seeded random source the result
    /// is identical on every call.
    fn generate_hash_function(
        &self,
        dimensionality: usize,
    ) -> Result<Box<dyn LocalitySensitiveHashFunction>>;

    fn num_projections(&self) -> usize;

    /// Whether keys from this family approximate `metric`.
    fn is_compatible(&self, metric: DistanceMetric) -> bool;
}

fn check_combination(l: usize) -> Result<()> {
    if l < 1 {
        return Err(PartitionError::InvalidCombination(l));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Euclidean (2-stable) family
// ---------------------------------------------------------------------------

/// Hash function `floor((<a_i, v> + b_i) / w)` for `i` in `0..l`.
#[derive(Debug, Clone)]
pub struct EuclideanHashFunction {
    projection: Projection,
    offsets: Array1<f64>,
    width: f64,
}

impl EuclideanHashFunction {
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn offsets(&self) -> &Array1<f64> {
        &self.offsets
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

impl LocalitySensitiveHashFunction for EuclideanHashFunction {
    fn hash(&self, vector: &ArrayView1<f32>) -> Result<BucketKey> {
        let projected = self.projection.project(vector)?;
        let buckets = projected
            .iter()
            .zip(self.offsets.iter())
            .map(|(&p, &b)| ((p as f64 + b) / self.width).floor() as i64)
            .collect();
        Ok(BucketKey(buckets))
    }

    fn num_projections(&self) -> usize {
        self.projection.output_dim()
    }

    fn dimensionality(&self) -> usize {
        self.projection.input_dim()
    }
}

/// 2-stable hash function family for Euclidean distances.
///
/// Reference: M. Datar, N. Immorlica, P. Indyk, V. S. Mirrokni,
/// "Locality-sensitive hashing scheme based on p-stable distributions",
/// Proc. 20th Symposium on Computational Geometry, 2004.
#[derive(Debug, Clone)]
pub struct EuclideanHashFunctionFamily {
    random: RandomFactory,
    projections: Arc<dyn RandomProjectionFamily>,
    width: f64,
    l: usize,
}

impl EuclideanHashFunctionFamily {
    /// Family with Gaussian projections, bucket width `width`, and `l`
    /// combined functions per key.
    pub fn new(random: RandomFactory, width: f64, l: usize) -> Result<Self> {
        Self::with_projections(
            random,
            Arc::new(GaussianRandomProjectionFamily::new(random)),
            width,
            l,
        )
    }

    pub fn with_projections(
        random: RandomFactory,
        projections: Arc<dyn RandomProjectionFamily>,
        width: f64,
        l: usize,
    ) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(PartitionError::InvalidWidth(width));
        }
        check_combination(l)?;
        Ok(Self {
            random,
            projections,
            width,
            l,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Concrete variant of [`HashFunctionFamily::generate_hash_function`].
    pub fn generate(&self, dimensionality: usize) -> Result<EuclideanHashFunction> {
        let mut rng = self.random.rng();
        let projection =
            self.projections
                .generate_projection(&mut rng, dimensionality, self.l)?;
        let offsets = (0..self.l)
            .map(|_| rng.gen_range(0.0..self.width))
            .collect();
        Ok(EuclideanHashFunction {
            projection,
            offsets,
            width: self.width,
        })
    }
}

impl HashFunctionFamily for EuclideanHashFunctionFamily {
    fn name(&self) -> &'static str {
        "euclidean"
    }

    fn generate_hash_function(
        &self,
        dimensionality: usize,
    ) -> Result<Box<dyn LocalitySensitiveHashFunction>> {
        Ok(Box::new(self.generate(dimensionality)?))
    }

    fn num_projections(&self) -> usize {
        self.l
    }

    fn is_compatible(&self, metric: DistanceMetric) -> bool {
        metric == DistanceMetric::Euclidean
    }
}

// ---------------------------------------------------------------------------
// Cosine (random hyperplane) family
// ---------------------------------------------------------------------------

/// Sign-of-random-projection hash: each component is 1 when the vector lies
/// on the positive side of the hyperplane, else 0.
#[derive(Debug, Clone)]
pub struct CosineHashFunction {
    projection: Projection,
}

impl LocalitySensitiveHashFunction for CosineHashFunction {
    fn hash(&self, vector: &ArrayView1<f32>) -> Result<BucketKey> {
        let projected = self.projection.project(vector)?;
        Ok(BucketKey(
            projected.iter().map(|&dot| i64::from(dot >= 0.0)).collect(),
        ))
    }

    fn num_projections(&self) -> usize {
        self.projection.output_dim()
    }

    fn dimensionality(&self) -> usize {
        self.projection.input_dim()
    }
}

/// Random hyperplane family for cosine distance (Charikar 2002).
#[derive(Debug, Clone)]
pub struct CosineHashFunctionFamily {
    random: RandomFactory,
    projections: Arc<dyn RandomProjectionFamily>,
    l: usize,
}

impl CosineHashFunctionFamily {
    pub fn new(random: RandomFactory, l: usize) -> Result<Self> {
        Self::with_projections(
            random,
            Arc::new(GaussianRandomProjectionFamily::new(random)),
            l,
        )
    }

    pub fn with_projections(
        random: RandomFactory,
        projections: Arc<dyn RandomProjectionFamily>,
        l: usize,
    ) -> Result<Self> {
        check_combination(l)?;
        Ok(Self {
            random,
            projections,
            l,
        })
    }
}

impl HashFunctionFamily for CosineHashFunctionFamily {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn generate_hash_function(
        &self,
        dimensionality: usize,
    ) -> Result<Box<dyn LocalitySensitiveHashFunction>> {
        let mut rng = self.random.rng();
        let projection = self
            .projections
            .generate_projection(&mut rng, dimensionality, self.l)?;
        Ok(Box::new(CosineHashFunction { projection }))
    }

    fn num_projections(&self) -> usize {
        self.l
    }

    fn is_compatible(&self, metric: DistanceMetric) -> bool {
        metric == DistanceMetric::Cosine
    }
}
