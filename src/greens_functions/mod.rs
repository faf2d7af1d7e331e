//! Two-time Greens functions on a contour grid
//!
//! A [`GreensFunction`] is a dense matrix over the global grid indices,
//! G(i, j) = G(t_i, t_j), together with the time coordinates of its grid.
//! The generators here produce the two standard equilibrium objects: the
//! Greens function of an isolated level and the hybridization function of a
//! band described by a density of states.

use crate::dos::{DensityOfStates, IntegrationSettings};
use crate::error::BuildError;
use crate::grid::TimeGrid;
use nalgebra::{ComplexField, DMatrix, RealField};
use num_complex::Complex;
use num_traits::NumCast;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Builder for contour Greens functions
///
/// The inverse temperature is optional here because a grid whose contour
/// carries an imaginary branch already fixes it; supplying it twice, or not
/// at all, is a configuration error surfaced by the generator.
pub struct GreensFunctionBuilder<T, RefGrid> {
    grid: RefGrid,
    inverse_temperature: Option<T>,
    settings: Option<IntegrationSettings<T>>,
}

impl<T> GreensFunctionBuilder<T, ()> {
    /// Start an empty builder
    pub fn new() -> Self {
        Self {
            grid: (),
            inverse_temperature: None,
            settings: None,
        }
    }
}

impl<T> Default for GreensFunctionBuilder<T, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, RefGrid> GreensFunctionBuilder<T, RefGrid> {
    /// Attach the time grid the Greens function is defined on
    pub fn with_grid(self, grid: &TimeGrid<T>) -> GreensFunctionBuilder<T, &TimeGrid<T>> {
        GreensFunctionBuilder {
            grid,
            inverse_temperature: self.inverse_temperature,
            settings: self.settings,
        }
    }

    /// Supply the inverse temperature explicitly
    ///
    /// Only valid for grids over purely real-time contours; an imaginary
    /// branch fixes β through its extent.
    pub fn with_inverse_temperature(self, inverse_temperature: T) -> Self {
        Self {
            inverse_temperature: Some(inverse_temperature),
            ..self
        }
    }

    /// Override the default quadrature tolerances and budget
    pub fn with_integration_settings(self, settings: IntegrationSettings<T>) -> Self {
        Self {
            settings: Some(settings),
            ..self
        }
    }
}

impl<'a, T> GreensFunctionBuilder<T, &'a TimeGrid<T>>
where
    T: Copy + RealField + NumCast,
{
    /// The equilibrium Greens function of an isolated level
    ///
    /// `G(t1, t2) = −i (θ(t1, t2) − f(ϵ)) e^{−iϵ(t1 − t2)}` with the Fermi
    /// occupation f at the resolved inverse temperature.
    #[tracing::instrument(name = "Single level Greens function", level = "info", skip_all)]
    pub fn single_level(self, energy: T) -> Result<GreensFunction<T>, BuildError> {
        let beta = self.grid.inverse_temperature(self.inverse_temperature)?;
        let occupation = fermi_occupation(energy, beta);
        let points = self.grid.points();
        let n = self.grid.total_points();
        let minus_i = Complex::new(T::zero(), -T::one());
        let matrix = DMatrix::from_fn(n, n, |row, col| {
            let t1 = &points[row];
            let t2 = &points[col];
            let weight = if self.grid.heaviside(t1, t2) {
                T::one() - occupation
            } else {
                -occupation
            };
            let phase = minus_i * (t1.value() - t2.value()) * energy;
            Complex::new(T::zero(), -weight) * phase.exp()
        });
        tracing::trace!("Assembled a {n}x{n} single level Greens function");
        Ok(GreensFunction {
            matrix,
            times: self.grid.times(),
            quadrature_error: T::zero(),
            unconverged_points: 0,
        })
    }

    /// The hybridization function of a band with the given density of states
    ///
    /// `Δ(t1, t2) = −i (2θ(t1, t2) − 1) ∫ D(ω) k(ω, t1 − t2) dω` where the
    /// thermal kernel k carries the phase and the Fermi weight of each
    /// frequency. Every matrix entry is an independent adaptive integral, so
    /// the entries are computed in parallel. Entries whose quadrature did not
    /// reach tolerance are kept at their best estimate and counted on the
    /// result.
    #[tracing::instrument(name = "Hybridization function", level = "info", skip_all)]
    pub fn hybridization<D>(self, dos: &D) -> Result<GreensFunction<T>, BuildError>
    where
        T: Send + Sync,
        D: DensityOfStates<T> + Sync,
    {
        let beta = self.grid.inverse_temperature(self.inverse_temperature)?;
        let settings = self.settings.unwrap_or_default();
        let points = self.grid.points();
        let n = self.grid.total_points();

        let entries: Vec<(Complex<T>, T, bool)> = (0..n * n)
            .into_par_iter()
            .map(|flat| {
                let t1 = &points[flat / n];
                let t2 = &points[flat % n];
                let later = self.grid.heaviside(t1, t2);
                let time = t1.value() - t2.value();
                let result = dos.integrate_against(
                    |omega| thermal_kernel(omega, time, beta, later),
                    &settings,
                );
                let sign = if later {
                    Complex::new(T::zero(), -T::one())
                } else {
                    Complex::new(T::zero(), T::one())
                };
                (sign * result.value, result.error, result.converged)
            })
            .collect();

        let mut unconverged_points = 0_usize;
        let mut quadrature_error = T::zero();
        for &(_, error, converged) in &entries {
            if !converged {
                unconverged_points += 1;
            }
            quadrature_error = quadrature_error.max(error);
        }
        if unconverged_points > 0 {
            tracing::warn!(
                "{} of {} hybridization entries did not reach tolerance, worst residual {:?}",
                unconverged_points,
                n * n,
                quadrature_error
            );
        }

        let matrix =
            DMatrix::from_row_iterator(n, n, entries.iter().map(|&(value, _, _)| value));
        Ok(GreensFunction {
            matrix,
            times: self.grid.times(),
            quadrature_error,
            unconverged_points,
        })
    }
}

/// The Fermi occupation 1/(e^{βϵ} + 1)
fn fermi_occupation<T: Copy + RealField>(energy: T, beta: T) -> T {
    T::one() / ((beta * energy).exp() + T::one())
}

/// Phase and thermal weight of one frequency in the hybridization integrand
///
/// For a later first argument the weight is 1 − f(ω), otherwise f(ω). Each
/// case is written with non-positive real exponents only, so neither large β
/// nor large |ω| can overflow the intermediate exponential.
fn thermal_kernel<T: Copy + RealField>(
    omega: T,
    time: Complex<T>,
    beta: T,
    later: bool,
) -> Complex<T> {
    let one = T::one();
    let phase = Complex::new(T::zero(), -one) * time * omega;
    if later {
        if omega >= T::zero() {
            phase.exp() * Complex::from_real(one / (one + (-beta * omega).exp()))
        } else {
            (phase + Complex::from_real(beta * omega)).exp()
                * Complex::from_real(one / (one + (beta * omega).exp()))
        }
    } else if omega >= T::zero() {
        (phase - Complex::from_real(beta * omega)).exp()
            * Complex::from_real(one / (one + (-beta * omega).exp()))
    } else {
        phase.exp() * Complex::from_real(one / (one + (beta * omega).exp()))
    }
}

/// A two-time function on a contour grid
///
/// Rows and columns follow the global grid indices, so entry (i, j) is the
/// function at the pair of contour times with 1-based indices i and j.
pub struct GreensFunction<T> {
    matrix: DMatrix<Complex<T>>,
    times: Vec<Complex<T>>,
    quadrature_error: T,
    unconverged_points: usize,
}

impl<T: Copy + RealField> GreensFunction<T> {
    /// The full two-time matrix
    pub fn matrix(&self) -> &DMatrix<Complex<T>> {
        &self.matrix
    }

    /// The time coordinates of the grid the function was assembled on
    pub fn times(&self) -> &[Complex<T>] {
        &self.times
    }

    /// The value at a pair of global 1-based grid indices
    pub fn value(&self, i: usize, j: usize) -> Option<Complex<T>> {
        self.matrix.get((i.checked_sub(1)?, j.checked_sub(1)?)).copied()
    }

    /// Worst residual quadrature error across the entries
    pub fn quadrature_error(&self) -> T {
        self.quadrature_error
    }

    /// Number of entries whose quadrature did not reach tolerance
    pub fn unconverged_points(&self) -> usize {
        self.unconverged_points
    }
}

#[cfg(test)]
mod test {
    use super::GreensFunctionBuilder;
    use crate::contour::Contour;
    use crate::dos::{flat_band, gaussian};
    use crate::error::{BuildError, ConfigurationError};
    use crate::grid::{TimeGrid, TimeGridBuilder};
    use approx::assert_relative_eq;

    fn full_grid(tmax: f64, beta: f64, real: usize, imaginary: usize) -> TimeGrid<f64> {
        TimeGridBuilder::new()
            .with_contour(Contour::full(tmax, beta).unwrap())
            .with_real_points(real)
            .with_imaginary_points(imaginary)
            .build()
            .unwrap()
    }

    #[test]
    fn the_equal_time_single_level_value_is_the_hole_occupation() {
        // θ(t, t) = 1, so G(t, t) = −i (1 − f(ϵ))
        let grid = full_grid(2.0, 2.0, 11, 11);
        let energy = 0.5;
        let greens = GreensFunctionBuilder::new()
            .with_grid(&grid)
            .single_level(energy)
            .unwrap();
        let occupation = 1.0 / ((2.0 * energy).exp() + 1.0);
        for index in [1, 7, 23] {
            let value = greens.value(index, index).unwrap();
            assert_relative_eq!(value.re, 0.0, epsilon = 1e-12);
            assert_relative_eq!(value.im, -(1.0 - occupation), epsilon = 1e-12);
        }
    }

    #[test]
    fn the_single_level_decays_down_the_imaginary_branch() {
        // For τ on the imaginary branch, G(−iτ, 0) = −i (1 − f(ϵ)) e^{−ϵτ}
        let beta: f64 = 3.0;
        let energy: f64 = 0.8;
        let grid = TimeGridBuilder::new()
            .with_contour(Contour::imaginary_time(beta).unwrap())
            .with_imaginary_points(31)
            .build()
            .unwrap();
        let greens = GreensFunctionBuilder::new()
            .with_grid(&grid)
            .single_level(energy)
            .unwrap();
        let occupation = 1.0 / ((beta * energy).exp() + 1.0);
        for index in [1, 11, 31] {
            let tau = -grid.point(index).unwrap().value().im;
            let value = greens.value(index, 1).unwrap();
            assert_relative_eq!(value.re, 0.0, epsilon = 1e-12);
            assert_relative_eq!(
                value.im,
                -(1.0 - occupation) * (-energy * tau).exp(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn the_flat_band_equal_time_hybridization_is_half_filled() {
        // A particle-hole symmetric band carries ∫D·f = 1/2 at any β, so the
        // equal-time value is −i/2
        let grid = TimeGridBuilder::new()
            .with_contour(Contour::real_time(1.0).unwrap())
            .with_real_points(3)
            .build()
            .unwrap();
        let dos = flat_band(1.0).unwrap();
        let greens = GreensFunctionBuilder::new()
            .with_grid(&grid)
            .with_inverse_temperature(2.0)
            .hybridization(&dos)
            .unwrap();
        assert_eq!(greens.unconverged_points(), 0);
        let value = greens.value(1, 1).unwrap();
        assert_relative_eq!(value.re, 0.0, epsilon = 1e-9);
        assert_relative_eq!(value.im, -0.5, epsilon = 1e-9);
    }

    #[test]
    fn a_narrow_band_hybridization_approaches_the_single_level() {
        // A Gaussian band of vanishing width at ϵ acts as a delta function,
        // collapsing the hybridization onto the isolated level at ϵ
        let grid = full_grid(1.0, 2.0, 5, 5);
        let energy = 0.3;
        let dos = gaussian(energy, 1e-3).unwrap();
        let builder = GreensFunctionBuilder::new().with_grid(&grid);
        let narrow = builder.hybridization(&dos).unwrap();
        let level = GreensFunctionBuilder::new()
            .with_grid(&grid)
            .single_level(energy)
            .unwrap();
        let difference = narrow.matrix() - level.matrix();
        let worst = difference
            .iter()
            .map(|entry| entry.norm())
            .fold(0.0_f64, f64::max);
        assert!(worst < 1e-4, "worst entry difference {}", worst);
    }

    #[test]
    fn conflicting_and_missing_inverse_temperatures_are_rejected() {
        let full = full_grid(1.0, 2.0, 5, 5);
        let result = GreensFunctionBuilder::new()
            .with_grid(&full)
            .with_inverse_temperature(1.0)
            .single_level(0.0);
        assert!(matches!(
            result,
            Err(BuildError::Configuration(
                ConfigurationError::ConflictingInverseTemperature
            ))
        ));

        let real = TimeGridBuilder::new()
            .with_contour(Contour::real_time(1.0).unwrap())
            .with_real_points(5)
            .build()
            .unwrap();
        let result = GreensFunctionBuilder::new().with_grid(&real).single_level(0.0);
        assert!(matches!(
            result,
            Err(BuildError::Configuration(
                ConfigurationError::MissingInverseTemperature
            ))
        ));
    }
}
