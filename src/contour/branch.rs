//! Directed branches of the integration path
//!
//! A branch maps a normalized parameter in [0, 1] to a physical complex time.
//! The three branch kinds are a closed set: the forward and backward
//! real-time branches of extent `tmax` and the imaginary branch of extent
//! β, running down to −iβ.

use crate::error::BuildError;
use nalgebra::RealField;
use num_complex::Complex;

/// The three directed segments a contour can be assembled from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum BranchKind {
    /// Forward real-time branch, 0 → tmax
    Forward,
    /// Backward real-time branch, tmax → 0
    Backward,
    /// Imaginary-time branch, 0 → −iβ
    Imaginary,
}

/// Canonical branch order
///
/// This single table is the tie-break for cross-branch time ordering when no
/// contour is at hand, and the construction order of every contour topology.
/// Both uses must reference it so the two conventions cannot drift apart.
pub(crate) static CANONICAL_BRANCH_ORDER: [BranchKind; 3] = [
    BranchKind::Forward,
    BranchKind::Backward,
    BranchKind::Imaginary,
];

impl BranchKind {
    /// Position of this kind in the canonical order
    pub(crate) fn canonical_position(&self) -> usize {
        CANONICAL_BRANCH_ORDER
            .iter()
            .position(|kind| kind == self)
            .expect("every branch kind appears in the canonical order")
    }
}

/// One directed, parametrized segment of the contour
///
/// The direction is fixed by the kind at construction and never mutated.
#[derive(Clone, Copy, Debug)]
pub struct Branch<T> {
    kind: BranchKind,
    length: T,
}

impl<T: Copy + RealField> Branch<T> {
    pub(crate) fn new(kind: BranchKind, length: T) -> Result<Self, BuildError> {
        if length < T::zero() {
            return Err(BuildError::Domain(format!(
                "branch extent must be non-negative, got {:?}",
                length
            )));
        }
        Ok(Self { kind, length })
    }

    /// The kind of this branch
    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// Real extent of the branch: `tmax` for the real-time branches, β for
    /// the imaginary branch
    pub fn length(&self) -> T {
        self.length
    }

    /// Evaluate the branch parametrization at a normalized parameter in [0, 1]
    pub fn point(&self, reference: T) -> BranchPoint<T> {
        debug_assert!(
            reference >= T::zero() && reference <= T::one(),
            "The normalized branch parameter must lie in [0, 1]"
        );
        let value = match self.kind {
            BranchKind::Forward => Complex::new(self.length * reference, T::zero()),
            BranchKind::Backward => {
                Complex::new(self.length * (T::one() - reference), T::zero())
            }
            BranchKind::Imaginary => Complex::new(T::zero(), -self.length * reference),
        };
        BranchPoint {
            kind: self.kind,
            reference,
            value,
        }
    }

    /// Signed complex span of the branch, end minus start
    pub(crate) fn extent(&self) -> Complex<T> {
        self.point(T::one()).value - self.point(T::zero()).value
    }
}

/// A point on a specific branch
///
/// Value type carrying the branch kind, the normalized parameter it was
/// evaluated at and the physical complex time. Only produced by
/// [`Branch::point`].
#[derive(Clone, Copy, Debug)]
pub struct BranchPoint<T> {
    kind: BranchKind,
    reference: T,
    value: Complex<T>,
}

impl<T: Copy + RealField> BranchPoint<T> {
    /// The branch this point lives on
    pub fn kind(&self) -> BranchKind {
        self.kind
    }

    /// The normalized parameter in [0, 1] the branch was evaluated at
    pub fn reference(&self) -> T {
        self.reference
    }

    /// The physical complex time
    pub fn value(&self) -> Complex<T> {
        self.value
    }
}

/// Canonical two-argument time ordering without an explicit contour
///
/// On a common branch later-on-branch means later. Across branches the
/// canonical order decides: a kind at a greater position in
/// [`CANONICAL_BRANCH_ORDER`] is later. Returns `true` when `t1` is the later
/// point, so equal points give `true`.
pub fn heaviside<T: Copy + RealField>(t1: &BranchPoint<T>, t2: &BranchPoint<T>) -> bool {
    if t1.kind == t2.kind {
        t1.reference >= t2.reference
    } else {
        t1.kind.canonical_position() > t2.kind.canonical_position()
    }
}
