//! Discrete contour-time grids and path quadrature
//!
//! A [`TimeGrid`] discretizes each branch of a [`Contour`] into a fixed
//! number of uniformly spaced points, assigns every point a global 1-based
//! index usable as a matrix index for two-point functions, and exposes the
//! path-integration primitives along the discretized contour.

use crate::contour::{BranchKind, BranchPoint, Contour};
use crate::error::{BuildError, ConfigurationError};
use nalgebra::RealField;
use num_complex::Complex;
use num_traits::NumCast;

/// A discretized contour point together with its global index
#[derive(Clone, Copy, Debug)]
pub struct GridPoint<T> {
    point: BranchPoint<T>,
    index: usize,
}

impl<T: Copy + RealField> GridPoint<T> {
    /// The underlying branch point
    pub fn point(&self) -> &BranchPoint<T> {
        &self.point
    }

    /// Global 1-based index of this point in contour-branch order
    pub fn index(&self) -> usize {
        self.index
    }

    /// The physical complex time of this point
    pub fn value(&self) -> Complex<T> {
        self.point.value()
    }
}

/// Builder for a [`TimeGrid`]
///
/// The real-time branches share one point count, the imaginary branch has an
/// independent one. Supplying a count for a branch family absent from the
/// contour topology, or omitting a required one, fails at `build`.
pub struct TimeGridBuilder<RefContour> {
    contour: RefContour,
    real_points: Option<usize>,
    imaginary_points: Option<usize>,
}

impl TimeGridBuilder<()> {
    /// Start an empty builder
    pub fn new() -> Self {
        Self {
            contour: (),
            real_points: None,
            imaginary_points: None,
        }
    }
}

impl Default for TimeGridBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RefContour> TimeGridBuilder<RefContour> {
    /// Attach the contour to discretize
    pub fn with_contour<T>(self, contour: Contour<T>) -> TimeGridBuilder<Contour<T>> {
        TimeGridBuilder {
            contour,
            real_points: self.real_points,
            imaginary_points: self.imaginary_points,
        }
    }

    /// Number of points on each real-time branch
    pub fn with_real_points(self, real_points: usize) -> Self {
        Self {
            real_points: Some(real_points),
            ..self
        }
    }

    /// Number of points on the imaginary branch
    pub fn with_imaginary_points(self, imaginary_points: usize) -> Self {
        Self {
            imaginary_points: Some(imaginary_points),
            ..self
        }
    }
}

impl<T: Copy + RealField + NumCast> TimeGridBuilder<Contour<T>> {
    /// Discretize the contour
    #[tracing::instrument(name = "Time grid builder", level = "info", skip_all)]
    pub fn build(self) -> Result<TimeGrid<T>, BuildError> {
        let has_real = self
            .contour
            .branches()
            .iter()
            .any(|branch| branch.kind() != BranchKind::Imaginary);
        let has_imaginary = self
            .contour
            .branches()
            .iter()
            .any(|branch| branch.kind() == BranchKind::Imaginary);

        let real_points = match (has_real, self.real_points) {
            (true, Some(n)) => n,
            (true, None) => {
                return Err(ConfigurationError::IncompatiblePointCounts(
                    "the contour has real-time branches but no real point count was supplied"
                        .into(),
                )
                .into())
            }
            (false, Some(_)) => {
                return Err(ConfigurationError::IncompatiblePointCounts(
                    "a real point count was supplied for a contour without real-time branches"
                        .into(),
                )
                .into())
            }
            (false, None) => 0,
        };
        let imaginary_points = match (has_imaginary, self.imaginary_points) {
            (true, Some(n)) => n,
            (true, None) => {
                return Err(ConfigurationError::IncompatiblePointCounts(
                    "the contour has an imaginary branch but no imaginary point count was supplied"
                        .into(),
                )
                .into())
            }
            (false, Some(_)) => {
                return Err(ConfigurationError::IncompatiblePointCounts(
                    "an imaginary point count was supplied for a purely real-time contour".into(),
                )
                .into())
            }
            (false, None) => 0,
        };

        let mut points = Vec::new();
        let mut steps = Vec::new();
        let mut bounds = Vec::new();
        let mut index = 1_usize;
        for branch in self.contour.branches() {
            let n = match branch.kind() {
                BranchKind::Imaginary => imaginary_points,
                _ => real_points,
            };
            if n < 2 {
                return Err(BuildError::Domain(format!(
                    "each branch needs at least two grid points, got {} for {:?}",
                    n,
                    branch.kind()
                )));
            }
            let intervals = T::from_usize(n - 1).unwrap();
            let first = index;
            for j in 0..n {
                let reference = T::from_usize(j).unwrap() / intervals;
                points.push(GridPoint {
                    point: branch.point(reference),
                    index,
                });
                index += 1;
            }
            bounds.push((first, index - 1));
            steps.push(branch.extent() / intervals);
        }
        tracing::trace!("Discretized the contour into {} points", points.len());

        Ok(TimeGrid {
            contour: self.contour,
            points,
            steps,
            bounds,
        })
    }
}

/// A discretization of a contour
///
/// Built once from a contour and a point-count configuration and immutable
/// thereafter; changing the discretization means rebuilding. Indices run
/// contiguously from 1 in contour-branch order.
#[derive(Clone, Debug)]
pub struct TimeGrid<T> {
    contour: Contour<T>,
    points: Vec<GridPoint<T>>,
    /// Complex increment between adjacent points, one entry per branch in
    /// traversal order
    steps: Vec<Complex<T>>,
    /// First and last global index of each branch, in traversal order
    bounds: Vec<(usize, usize)>,
}

impl<T: Copy + RealField + NumCast> TimeGrid<T> {
    /// The contour this grid discretizes
    pub fn contour(&self) -> &Contour<T> {
        &self.contour
    }

    /// All grid points in index order
    pub fn points(&self) -> &[GridPoint<T>] {
        &self.points
    }

    /// Total number of grid points across all branches
    pub fn total_points(&self) -> usize {
        self.points.len()
    }

    /// The grid point carrying a global 1-based index
    pub fn point(&self, index: usize) -> Option<&GridPoint<T>> {
        self.points.get(index.checked_sub(1)?)
    }

    /// The complex increment between adjacent points of a branch
    pub fn step(&self, kind: BranchKind) -> Option<Complex<T>> {
        self.contour
            .branches()
            .iter()
            .position(|branch| branch.kind() == kind)
            .map(|position| self.steps[position])
    }

    /// First and last grid point of a branch
    pub fn branch_bounds(&self, kind: BranchKind) -> Option<(&GridPoint<T>, &GridPoint<T>)> {
        self.contour
            .branches()
            .iter()
            .position(|branch| branch.kind() == kind)
            .map(|position| {
                let (first, last) = self.bounds[position];
                (&self.points[first - 1], &self.points[last - 1])
            })
    }

    /// The time coordinates of every grid point, in index order
    ///
    /// This is the "t" array handed to persistence and plotting
    /// collaborators alongside a Greens function matrix.
    pub fn times(&self) -> Vec<Complex<T>> {
        self.points.iter().map(|point| point.value()).collect()
    }

    /// The time-ordering step function between two grid points
    pub fn heaviside(&self, t1: &GridPoint<T>, t2: &GridPoint<T>) -> bool {
        self.contour.heaviside(t1.point(), t2.point())
    }

    /// Resolve the inverse temperature for this grid
    ///
    /// The contour's imaginary branch and an explicitly supplied value are
    /// mutually exclusive; exactly one of the two must be available.
    pub fn inverse_temperature(&self, supplied: Option<T>) -> Result<T, ConfigurationError> {
        match (self.contour.inverse_temperature(), supplied) {
            (Some(_), Some(_)) => Err(ConfigurationError::ConflictingInverseTemperature),
            (Some(beta), None) => Ok(beta),
            (None, Some(beta)) => Ok(beta),
            (None, None) => Err(ConfigurationError::MissingInverseTemperature),
        }
    }

    /// Path integral of a function of one contour time over the whole contour
    ///
    /// Trapezium quadrature along each branch, summed in traversal order. The
    /// constant function integrates to the sum of the branch spans, which on
    /// a full contour is −iβ: the forward and backward contributions cancel.
    pub fn integrate<F>(&self, integrand: F) -> Complex<T>
    where
        F: Fn(&BranchPoint<T>) -> Complex<T>,
    {
        let half = T::from_f64(0.5).unwrap();
        let mut total = Complex::new(T::zero(), T::zero());
        for (position, &(first, last)) in self.bounds.iter().enumerate() {
            let step = self.steps[position];
            let mut branch_sum = Complex::new(T::zero(), T::zero());
            for grid_point in &self.points[first - 1..last] {
                let weight = if grid_point.index == first || grid_point.index == last {
                    half
                } else {
                    T::one()
                };
                branch_sum += integrand(grid_point.point()) * weight;
            }
            total += step * branch_sum;
        }
        total
    }

    /// Path integral over the sub-path between two grid points
    ///
    /// Follows the contour direction from `t2` to `t1`, so for the constant
    /// function the result is `t1.value() − t2.value()`. Adjacent points on
    /// different branches coincide in physical time and contribute no
    /// extent.
    pub fn integrate_between<F>(
        &self,
        integrand: F,
        t1: &GridPoint<T>,
        t2: &GridPoint<T>,
    ) -> Complex<T>
    where
        F: Fn(&BranchPoint<T>) -> Complex<T>,
    {
        assert!(
            (1..=self.points.len()).contains(&t1.index)
                && (1..=self.points.len()).contains(&t2.index),
            "Both integration limits must carry indices of this grid"
        );
        let half = T::from_f64(0.5).unwrap();
        let (lower, upper) = if t1.index >= t2.index {
            (t2.index, t1.index)
        } else {
            (t1.index, t2.index)
        };
        let mut total = Complex::new(T::zero(), T::zero());
        for interval in lower..upper {
            let start = &self.points[interval - 1];
            let end = &self.points[interval];
            if start.point().kind() == end.point().kind() {
                let step = self
                    .step(start.point().kind())
                    .expect("interval endpoints lie on a contour branch");
                total += step * (integrand(start.point()) + integrand(end.point())) * half;
            }
        }
        if t1.index >= t2.index {
            total
        } else {
            -total
        }
    }
}
