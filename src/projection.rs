//! Random linear projections used to build locality-sensitive hash functions.

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{PartitionError, Result};
use crate::random::RandomFactory;

/// A fixed linear map from `input_dim` to `output_dim` dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// `output_dim x input_dim`, one row per projected component.
    matrix: Array2<f32>,
}

impl Projection {
    pub fn from_matrix(matrix: Array2<f32>) -> Result<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(PartitionError::ZeroDimension);
        }
        Ok(Self { matrix })
    }

    pub fn input_dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &Array2<f32> {
        &self.matrix
    }

    /// Apply the projection to one vector.
    pub fn project(&self, vector: &ArrayView1<f32>) -> Result<Array1<f32>> {
        if vector.len() != self.input_dim() {
            return Err(PartitionError::DimensionMismatch {
                expected: self.input_dim(),
                got: vector.len(),
            });
        }
        Ok(self.matrix.dot(vector))
    }
}

/// A source of random projections.
pub trait RandomProjectionFamily: fmt::Debug + Send + Sync {
    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// Draw a projection from `rng`.
    fn generate_projection(
        &self,
        rng: &mut StdRng,
        input_dim: usize,
        output_dim: usize,
    ) -> Result<Projection>;

    /// Draw a projection from the family's own random source. With a seeded
    /// factory the result is identical on every call.
    fn generate(&self, input_dim: usize, output_dim: usize) -> Result<Projection> {
        let mut rng = self.random().rng();
        self.generate_projection(&mut rng, input_dim, output_dim)
    }

    fn random(&self) -> RandomFactory;
}

fn check_dims(input_dim: usize, output_dim: usize) -> Result<()> {
    if input_dim == 0 || output_dim == 0 {
        return Err(PartitionError::ZeroDimension);
    }
    Ok(())
}

/// Projections with independent standard normal coefficients. This is the
/// 2-stable family that makes Euclidean hashing locality-sensitive.
#[derive(Debug, Clone, Default)]
pub struct GaussianRandomProjectionFamily {
    random: RandomFactory,
}

impl GaussianRandomProjectionFamily {
    pub fn new(random: RandomFactory) -> Self {
        Self { random }
    }
}

impl RandomProjectionFamily for GaussianRandomProjectionFamily {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn generate_projection(
        &self,
        rng: &mut StdRng,
        input_dim: usize,
        output_dim: usize,
    ) -> Result<Projection> {
        check_dims(input_dim, output_dim)?;
        let matrix =
            Array2::from_shape_simple_fn((output_dim, input_dim), || rng.sample(StandardNormal));
        Ok(Projection { matrix })
    }

    fn random(&self) -> RandomFactory {
        self.random
    }
}

/// Sparse database-friendly projections (Achlioptas 2001): each coefficient
/// is `+sqrt(3)` or `-sqrt(3)` with probability 1/6 each, else 0.
#[derive(Debug, Clone, Default)]
pub struct AchlioptasRandomProjectionFamily {
    random: RandomFactory,
}

impl AchlioptasRandomProjectionFamily {
    pub fn new(random: RandomFactory) -> Self {
        Self { random }
    }
}

impl RandomProjectionFamily for AchlioptasRandomProjectionFamily {
    fn name(&self) -> &'static str {
        "achlioptas"
    }

    fn generate_projection(
        &self,
        rng: &mut StdRng,
        input_dim: usize,
        output_dim: usize,
    ) -> Result<Projection> {
        check_dims(input_dim, output_dim)?;
        let scale = 3.0_f32.sqrt();
        let matrix = Array2::from_shape_simple_fn((output_dim, input_dim), || {
            match rng.gen_range(0..6) {
                0 => scale,
                1 => -scale,
                _ => 0.0,
            }
        });
        Ok(Projection { matrix })
    }

    fn random(&self) -> RandomFactory {
        self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = GaussianRandomProjectionFamily::new(RandomFactory::seeded(42));
        let b = GaussianRandomProjectionFamily::new(RandomFactory::seeded(42));
        assert_eq!(a.generate(16, 4).unwrap(), b.generate(16, 4).unwrap());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = GaussianRandomProjectionFamily::new(RandomFactory::seeded(1));
        let b = GaussianRandomProjectionFamily::new(RandomFactory::seeded(2));
        assert_ne!(a.generate(16, 4).unwrap(), b.generate(16, 4).unwrap());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let family = GaussianRandomProjectionFamily::default();
        assert!(matches!(
            family.generate(0, 4),
            Err(PartitionError::ZeroDimension)
        ));
        assert!(matches!(
            family.generate(4, 0),
            Err(PartitionError::ZeroDimension)
        ));
    }

    #[test]
    fn test_project_shape_and_mismatch() {
        let proj = Projection::from_matrix(array![[1.0, 0.0, 0.0], [0.0, 2.0, 0.0]]).unwrap();
        let out = proj.project(&array![3.0, 4.0, 5.0].view()).unwrap();
        assert_eq!(out, array![3.0, 8.0]);
        assert!(matches!(
            proj.project(&array![1.0, 2.0].view()),
            Err(PartitionError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_achlioptas_coefficients() {
        let family = AchlioptasRandomProjectionFamily::new(RandomFactory::seeded(5));
        let proj = family.generate(64, 8).unwrap();
        let scale = 3.0_f32.sqrt();
        let zeros = proj.matrix().iter().filter(|&&c| c == 0.0).count();
        assert!(proj
            .matrix()
            .iter()
            .all(|&c| c == 0.0 || (c.abs() - scale).abs() < 1e-6));
        // 2/3 of 512 coefficients are expected to be zero.
        assert!(zeros > 250 && zeros < 430, "zeros={zeros}");
    }
}
