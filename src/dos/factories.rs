//! Closed-form density-of-states constructors
//!
//! The lattice factories carry analytically derived asymptotic forms and
//! exact integrals at their van Hove singularities. These constants are
//! reference fixtures the singular integrator's accuracy rests on; the
//! regular parts are written in rationalised forms so that the subtraction
//! does not cancel catastrophically near the band edges.

use super::{SingularDos, Singularity};
use crate::error::BuildError;
use nalgebra::{ComplexField, RealField};
use num_traits::NumCast;

fn positive<T: Copy + RealField>(name: &str, value: T) -> Result<(), BuildError> {
    if value <= T::zero() {
        return Err(BuildError::Domain(format!(
            "{} must be positive, got {:?}",
            name, value
        )));
    }
    Ok(())
}

/// A flat band of height 1/(2D) on [−D, D]
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
pub fn flat_band<T>(half_bandwidth: T) -> Result<SingularDos<T>, BuildError>
where
    T: Copy + RealField + NumCast + Send + Sync + 'static,
{
    positive("the half bandwidth", half_bandwidth)?;
    let height = 0.5 / half_bandwidth;
    SingularDos::new(
        -half_bandwidth,
        half_bandwidth,
        move |_| height,
        Vec::new(),
    )
}

/// A normalised Gaussian of the given centre and width
///
/// The support is truncated at ten widths from the centre, discarding a tail
/// mass of order 1e-23. In the limit of vanishing width this approaches a
/// delta function at the centre.
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
pub fn gaussian<T>(centre: T, width: T) -> Result<SingularDos<T>, BuildError>
where
    T: Copy + RealField + NumCast + Send + Sync + 'static,
{
    positive("the width", width)?;
    let norm = 1.0 / (width * (2.0 * T::pi()).sqrt());
    SingularDos::new(
        centre - 10.0 * width,
        centre + 10.0 * width,
        move |omega: T| {
            let argument = (omega - centre) / width;
            norm * (-0.5 * argument * argument).exp()
        },
        Vec::new(),
    )
}

/// The Bethe lattice semicircle 2√(D²−ω²)/(πD²) on [−D, D]
///
/// The band edges at ±D carry square-root asymptotics of exact integral
/// 16/(3π) each.
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
pub fn bethe_lattice<T>(half_bandwidth: T) -> Result<SingularDos<T>, BuildError>
where
    T: Copy + RealField + NumCast + Send + Sync + 'static,
{
    positive("the half bandwidth", half_bandwidth)?;
    let d = half_bandwidth;
    let prefactor = 2.0 / (T::pi() * d * d);
    let edge_scale = prefactor * (2.0 * d).sqrt();
    let singularities = vec![
        Singularity::new(
            d,
            move |omega: T| edge_scale * (d - omega).max(T::zero()).sqrt(),
            16.0 / (3.0 * T::pi()),
        ),
        Singularity::new(
            -d,
            move |omega: T| edge_scale * (d + omega).max(T::zero()).sqrt(),
            16.0 / (3.0 * T::pi()),
        ),
    ];
    // ρ − S₊ = −(2/(πD²))·(D−ω)^{3/2}/(√(D+ω)+√(2D)), grouped towards the
    // near edge so neither difference of close square roots is evaluated
    let regular = move |omega: T| {
        if omega >= T::zero() {
            let distance = (d - omega).max(T::zero());
            -prefactor * distance * distance.sqrt() / ((d + omega).sqrt() + (2.0 * d).sqrt())
                - edge_scale * (d + omega).sqrt()
        } else {
            let distance = (d + omega).max(T::zero());
            -prefactor * distance * distance.sqrt() / ((d - omega).sqrt() + (2.0 * d).sqrt())
                - edge_scale * (d - omega).sqrt()
        }
    };
    SingularDos::new(-d, d, regular, singularities)
}

/// The linear chain 1/(π√(D²−ω²)) on [−D, D]
///
/// The band edges at ±D carry inverse-square-root divergences of exact
/// integral 2/π each.
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
pub fn linear_chain<T>(half_bandwidth: T) -> Result<SingularDos<T>, BuildError>
where
    T: Copy + RealField + NumCast + Send + Sync + 'static,
{
    positive("the half bandwidth", half_bandwidth)?;
    let d = half_bandwidth;
    let inv_pi = 1.0 / T::pi();
    // (2D)^{-1/2}, the value both edge asymptotics take at the opposite edge
    let c = 1.0 / (2.0 * d).sqrt();
    let singularities = vec![
        Singularity::new(
            d,
            move |omega: T| inv_pi * c / (d - omega).max(T::zero()).sqrt(),
            2.0 / T::pi(),
        ),
        Singularity::new(
            -d,
            move |omega: T| inv_pi * c / (d + omega).max(T::zero()).sqrt(),
            2.0 / T::pi(),
        ),
    ];
    // ρ − S₊ − S₋ = (1/π)[u(v−c) − cv] with u = (D−ω)^{-1/2}, v = (D+ω)^{-1/2};
    // the differences are rationalised, v−c = (D−ω)/(2D(D+ω)(v+c)), so the
    // regular part stays finite-precision clean at both edges
    let regular = move |omega: T| {
        if omega >= T::zero() {
            let v = 1.0 / (d + omega).sqrt();
            inv_pi
                * ((d - omega).max(T::zero()).sqrt() / (2.0 * d * (d + omega) * (v + c)) - c * v)
        } else {
            let u = 1.0 / (d - omega).sqrt();
            inv_pi
                * ((d + omega).max(T::zero()).sqrt() / (2.0 * d * (d - omega) * (u + c)) - c * u)
        }
    };
    SingularDos::new(-d, d, regular, singularities)
}

/// The 2-D square lattice (2/(π²D))·K(√(1−(ω/D)²)) on [−D, D]
///
/// K is the complete elliptic integral of the first kind. The van Hove point
/// at ω = 0 carries the logarithmic asymptotics (2/(π²D))·ln(4D/|ω|), of
/// exact integral (4/π²)(1 + ln 4).
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
pub fn square_lattice<T>(half_bandwidth: T) -> Result<SingularDos<T>, BuildError>
where
    T: Copy + RealField + NumCast + Send + Sync + 'static,
{
    positive("the half bandwidth", half_bandwidth)?;
    let d = half_bandwidth;
    let prefactor = 2.0 / (T::pi() * T::pi() * d);
    let singularities = vec![Singularity::new(
        T::zero(),
        move |omega: T| prefactor * (4.0 * d / omega.abs()).ln(),
        4.0 * (1.0 + (4.0).ln()) / (T::pi() * T::pi()),
    )];
    let regular = move |omega: T| {
        if omega == T::zero() {
            // The limit of K(k′) − ln(4/k′) at the van Hove point
            return T::zero();
        }
        let complementary_modulus = (omega / d).abs().min(T::one());
        prefactor
            * (complete_elliptic_integral(complementary_modulus)
                - (4.0 / complementary_modulus).ln())
    };
    SingularDos::new(-d, d, regular, singularities)
}

/// K(k) from the complementary modulus k′ via the arithmetic–geometric mean
#[numeric_literals::replace_float_literals(T::from_f64(literal).unwrap())]
fn complete_elliptic_integral<T: Copy + RealField + NumCast>(complementary_modulus: T) -> T {
    let tolerance = T::from_f64(f64::EPSILON).unwrap();
    let mut a = T::one();
    let mut b = complementary_modulus;
    for _ in 0..64 {
        if (a - b).abs() <= tolerance * a {
            break;
        }
        let arithmetic = (a + b) * 0.5;
        b = (a * b).sqrt();
        a = arithmetic;
    }
    T::pi() / (2.0 * a)
}

#[cfg(test)]
mod test {
    use super::super::{DensityOfStates, IntegrationResult, IntegrationSettings};
    use super::{bethe_lattice, flat_band, gaussian, linear_chain, square_lattice};
    use approx::assert_relative_eq;

    fn normalisation(dos: &impl DensityOfStates<f64>) -> IntegrationResult<f64, f64> {
        dos.integrate_against(|_| 1.0, &IntegrationSettings::default())
    }

    fn second_moment(dos: &impl DensityOfStates<f64>) -> IntegrationResult<f64, f64> {
        dos.integrate_against(|omega| omega * omega, &IntegrationSettings::default())
    }

    #[test]
    fn the_flat_band_is_flat_and_normalised() {
        let dos = flat_band(2.0).unwrap();
        assert_relative_eq!(dos.evaluate(0.3), 0.25);
        let result = normalisation(&dos);
        assert!(result.converged);
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn the_gaussian_is_normalised() {
        let result = normalisation(&gaussian(0.3, 0.05).unwrap());
        assert!(result.converged);
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn the_bethe_decomposition_sums_to_the_semicircle() {
        let d: f64 = 1.5;
        let dos = bethe_lattice(d).unwrap();
        for omega in [0.0, 0.6, -0.6, 1.2, -1.2] {
            let exact =
                2.0 * (d * d - omega * omega).sqrt() / (std::f64::consts::PI * d * d);
            assert_relative_eq!(dos.evaluate(omega), exact, epsilon = 1e-12);
        }
    }

    #[test]
    fn the_bethe_lattice_is_normalised_through_the_singular_integrator() {
        let result = normalisation(&bethe_lattice(1.0).unwrap());
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn the_bethe_second_moment_is_a_quarter_of_the_half_bandwidth_squared() {
        let result = second_moment(&bethe_lattice(2.0).unwrap());
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn the_chain_decomposition_sums_to_the_closed_form() {
        let d: f64 = 2.0;
        let dos = linear_chain(d).unwrap();
        for omega in [0.0, 0.8, -0.8, 1.7, -1.7] {
            let exact = 1.0 / (std::f64::consts::PI * (d * d - omega * omega).sqrt());
            assert_relative_eq!(dos.evaluate(omega), exact, epsilon = 1e-12);
        }
    }

    #[test]
    fn the_linear_chain_is_normalised_through_the_singular_integrator() {
        let result = normalisation(&linear_chain(1.0).unwrap());
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn the_chain_second_moment_is_half_the_half_bandwidth_squared() {
        let result = second_moment(&linear_chain(1.0).unwrap());
        assert_relative_eq!(result.value, 0.5, epsilon = 1e-8);
    }

    #[test]
    fn the_square_lattice_takes_its_band_edge_value() {
        // K(0) = π/2, so the density steps down from 1/(πD) at the edges
        let d = 1.0;
        let dos = square_lattice(d).unwrap();
        assert_relative_eq!(
            dos.evaluate(1.0),
            1.0 / (std::f64::consts::PI * d),
            epsilon = 1e-12
        );
        assert_relative_eq!(dos.evaluate(0.4), dos.evaluate(-0.4), epsilon = 1e-12);
    }

    #[test]
    fn the_square_lattice_is_normalised_through_the_singular_integrator() {
        let result = normalisation(&square_lattice(1.0).unwrap());
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn the_square_second_moment_is_a_quarter_of_the_half_bandwidth_squared() {
        let result = second_moment(&square_lattice(2.0).unwrap());
        assert_relative_eq!(result.value, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn non_positive_bandwidths_are_rejected() {
        assert!(flat_band(0.0).is_err());
        assert!(bethe_lattice(-1.0).is_err());
        assert!(gaussian(0.0, 0.0).is_err());
    }
}
