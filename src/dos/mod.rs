//! Densities of states and the singularity-subtracting integrator
//!
//! A density of states is either a plain smooth callable on the whole real
//! line, or a [`SingularDos`]: a smooth regular part plus a finite list of
//! terms with known local asymptotics and known exact definite integrals.
//! The singular variant is integrated by subtracting each asymptotic form
//! and adding back its exact integral, which turns slowly converging or
//! divergent-looking integrands into smooth ones.

mod factories;
mod quadrature;

pub use factories::{bethe_lattice, flat_band, gaussian, linear_chain, square_lattice};
pub use quadrature::{IntegrationResult, IntegrationSettings};

use crate::error::BuildError;
use nalgebra::{ComplexField, RealField};
use num_traits::NumCast;

/// Support of a spectral weight function
#[derive(Clone, Copy, Debug)]
pub enum Support<T> {
    /// The whole real line
    Infinite,
    /// A finite interval
    Finite {
        /// Lower edge of the support
        lower: T,
        /// Upper edge of the support
        upper: T,
    },
}

/// A density of states that can be integrated against smooth test functions
///
/// The integration method is part of the trait so that each variant carries
/// its own robust algorithm: the implementor knows where its integrand is
/// awkward, the caller does not have to.
pub trait DensityOfStates<T>
where
    T: Copy + RealField + NumCast,
{
    /// Spectral weight at a frequency
    ///
    /// For a singular DOS the value diverges at the singular positions.
    fn evaluate(&self, omega: T) -> T;

    /// The support of the spectral weight
    fn support(&self) -> Support<T>;

    /// Integrate `f(ω)·D(ω)` over the support
    fn integrate_against<V, F>(
        &self,
        integrand: F,
        settings: &IntegrationSettings<T>,
    ) -> IntegrationResult<T, V>
    where
        V: ComplexField<RealField = T> + Copy,
        F: Fn(T) -> V;
}

/// A smooth density of states given as a plain callable
pub struct FunctionDos<F> {
    function: F,
}

impl<F> FunctionDos<F> {
    /// Wrap a callable as a density of states on the whole real line
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<T, F> DensityOfStates<T> for FunctionDos<F>
where
    T: Copy + RealField + NumCast,
    F: Fn(T) -> T,
{
    fn evaluate(&self, omega: T) -> T {
        (self.function)(omega)
    }

    fn support(&self) -> Support<T> {
        Support::Infinite
    }

    fn integrate_against<V, G>(
        &self,
        integrand: G,
        settings: &IntegrationSettings<T>,
    ) -> IntegrationResult<T, V>
    where
        V: ComplexField<RealField = T> + Copy,
        G: Fn(T) -> V,
    {
        quadrature::integrate_infinite(
            &|omega: T| integrand(omega) * V::from_real(self.evaluate(omega)),
            &[T::zero()],
            settings,
        )
    }
}

/// One singular term of a singular DOS decomposition
///
/// Carries the singular position Ω, the local asymptotic form S(ω) with
/// `lim_{ω→Ω} [D(ω) − S(ω)] = 0`, and the exact value of ∫S(ω)dω over the
/// DOS support. The exact integrals are load-bearing for the accuracy of the
/// subtract-and-add-back integration.
pub struct Singularity<T> {
    position: T,
    asymptotics: Box<dyn Fn(T) -> T + Send + Sync>,
    integral: T,
}

impl<T: Copy + RealField> Singularity<T> {
    /// A singular term from its position, asymptotic form and exact integral
    pub fn new(
        position: T,
        asymptotics: impl Fn(T) -> T + Send + Sync + 'static,
        integral: T,
    ) -> Self {
        Self {
            position,
            asymptotics: Box::new(asymptotics),
            integral,
        }
    }

    /// The singular position Ω
    pub fn position(&self) -> T {
        self.position
    }

    /// The exact value of ∫S(ω)dω over the DOS support
    pub fn integral(&self) -> T {
        self.integral
    }

    /// The asymptotic form S(ω); diverges at the singular position
    pub fn evaluate(&self, omega: T) -> T {
        (self.asymptotics)(omega)
    }
}

/// A density of states `D(ω) = R(ω) + Σ_p S_p(ω)` on a finite support
///
/// Each `S_p` is regular on the support except exactly at its own position,
/// and the positions are pairwise distinct.
pub struct SingularDos<T> {
    lower: T,
    upper: T,
    regular: Box<dyn Fn(T) -> T + Send + Sync>,
    singularities: Vec<Singularity<T>>,
}

impl<T: Copy + RealField + NumCast> SingularDos<T> {
    /// Assemble a singular DOS, validating the support and the positions
    pub fn new(
        lower: T,
        upper: T,
        regular: impl Fn(T) -> T + Send + Sync + 'static,
        singularities: Vec<Singularity<T>>,
    ) -> Result<Self, BuildError> {
        if lower >= upper {
            return Err(BuildError::Domain(format!(
                "the DOS support must be a non-empty interval, got [{:?}, {:?}]",
                lower, upper
            )));
        }
        for (count, singularity) in singularities.iter().enumerate() {
            if singularity.position() < lower || singularity.position() > upper {
                return Err(BuildError::Domain(format!(
                    "singular position {:?} lies outside the support",
                    singularity.position()
                )));
            }
            if singularities[..count]
                .iter()
                .any(|other| other.position() == singularity.position())
            {
                return Err(BuildError::Domain(format!(
                    "singular positions must be pairwise distinct, {:?} appears twice",
                    singularity.position()
                )));
            }
        }
        Ok(Self {
            lower,
            upper,
            regular: Box::new(regular),
            singularities,
        })
    }

    /// The singular terms in their stored order
    pub fn singularities(&self) -> &[Singularity<T>] {
        &self.singularities
    }
}

impl<T> DensityOfStates<T> for SingularDos<T>
where
    T: Copy + RealField + NumCast,
{
    fn evaluate(&self, omega: T) -> T {
        self.singularities
            .iter()
            .fold((self.regular)(omega), |sum, singularity| {
                sum + singularity.evaluate(omega)
            })
    }

    fn support(&self) -> Support<T> {
        Support::Finite {
            lower: self.lower,
            upper: self.upper,
        }
    }

    /// Subtract-and-add-back integration:
    /// `∫f·D = ∫f·R + Σ_p ∫(f − f(Ω_p))·S_p + Σ_p f(Ω_p)·∫S_p`
    ///
    /// The first two classes of integral are smooth under adaptive
    /// quadrature, the third uses the exact integrals stored on the
    /// singular terms.
    fn integrate_against<V, F>(
        &self,
        integrand: F,
        settings: &IntegrationSettings<T>,
    ) -> IntegrationResult<T, V>
    where
        V: ComplexField<RealField = T> + Copy,
        F: Fn(T) -> V,
    {
        let positions: Vec<T> = self
            .singularities
            .iter()
            .map(|singularity| singularity.position())
            .collect();
        let regular_part = quadrature::integrate(
            &|omega: T| integrand(omega) * V::from_real((self.regular)(omega)),
            self.lower,
            self.upper,
            &positions,
            settings,
        );

        let mut value = regular_part.value;
        let mut error = regular_part.error;
        let mut evaluations = regular_part.evaluations;
        let mut converged = regular_part.converged;
        for singularity in &self.singularities {
            let position = singularity.position();
            let at_position = integrand(position);
            let subtracted = quadrature::integrate(
                &|omega: T| {
                    // The subtracted integrand has a removable zero at the
                    // singular position; evaluate it as exactly zero there
                    // rather than as 0·∞ through the formula
                    if omega == position {
                        V::zero()
                    } else {
                        (integrand(omega) - at_position)
                            * V::from_real(singularity.evaluate(omega))
                    }
                },
                self.lower,
                self.upper,
                &[position],
                settings,
            );
            value += subtracted.value + at_position * V::from_real(singularity.integral());
            error += subtracted.error;
            evaluations += subtracted.evaluations;
            converged &= subtracted.converged;
        }

        IntegrationResult {
            value,
            error,
            evaluations,
            converged,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DensityOfStates, FunctionDos, IntegrationSettings, SingularDos, Singularity};
    use approx::assert_relative_eq;

    #[test]
    fn a_function_dos_integrates_over_the_whole_real_line() {
        let width = 0.5_f64;
        let norm = 1.0 / (width * (2.0 * std::f64::consts::PI).sqrt());
        let dos = FunctionDos::new(move |omega: f64| {
            norm * (-0.5 * (omega / width) * (omega / width)).exp()
        });
        let settings = IntegrationSettings::default();
        let result: super::IntegrationResult<f64, f64> =
            dos.integrate_against(|_| 1.0, &settings);
        assert!(result.converged);
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn the_exact_integral_is_added_back_for_the_constant_test_function() {
        // D(ω) = 1/(2√ω) on (0, 1]: the subtracted integrand vanishes
        // identically for f = 1 and the result is the stored exact integral
        let dos = SingularDos::new(
            0.0_f64,
            1.0,
            |_| 0.0,
            vec![Singularity::new(0.0, |omega: f64| 0.5 / omega.sqrt(), 1.0)],
        )
        .unwrap();
        let settings = IntegrationSettings::default();
        let result: super::IntegrationResult<f64, f64> =
            dos.integrate_against(|_| 1.0, &settings);
        assert!(result.converged);
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_singular_positions_are_rejected() {
        let result = SingularDos::new(
            -1.0_f64,
            1.0,
            |_| 0.0,
            vec![
                Singularity::new(0.5, |_| 0.0, 0.0),
                Singularity::new(0.5, |_| 0.0, 0.0),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_support_singular_positions_are_rejected() {
        let result = SingularDos::new(
            -1.0_f64,
            1.0,
            |_| 0.0,
            vec![Singularity::new(2.0, |_| 0.0, 0.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn evaluation_is_the_direct_sum_of_regular_and_singular_parts() {
        let dos = SingularDos::new(
            0.0_f64,
            4.0,
            |omega: f64| omega,
            vec![Singularity::new(1.0, |omega: f64| (omega - 1.0).abs().ln(), 0.0)],
        )
        .unwrap();
        assert_relative_eq!(dos.evaluate(3.0), 3.0 + 2.0_f64.ln());
    }
}
