//! Composite integration paths for two-time Green's functions
//!
//! A contour is an ordered sequence of directed branches selected by a
//! topology tag. The branch membership is fixed at construction; only the
//! traversal order can be changed, by cyclic rotation. The contour also
//! carries the time-ordering relation between points on its branches.

mod branch;

pub use branch::{heaviside, Branch, BranchKind, BranchPoint};

pub(crate) use branch::CANONICAL_BRANCH_ORDER;

use crate::error::BuildError;
use nalgebra::RealField;

/// The three canonical contour topologies
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
pub enum ContourTopology {
    /// Forward, backward and imaginary branches
    Full,
    /// Forward and backward branches only
    RealTime,
    /// The imaginary branch only
    ImaginaryTime,
}

impl ContourTopology {
    /// Branch kinds of this topology, filtered from the canonical order
    fn branch_kinds(&self) -> &'static [BranchKind] {
        match self {
            ContourTopology::Full => &CANONICAL_BRANCH_ORDER,
            ContourTopology::RealTime => &CANONICAL_BRANCH_ORDER[..2],
            ContourTopology::ImaginaryTime => &CANONICAL_BRANCH_ORDER[2..],
        }
    }
}

/// An ordered sequence of branches with fixed membership
#[derive(Clone, Debug)]
pub struct Contour<T> {
    topology: ContourTopology,
    branches: Vec<Branch<T>>,
}

impl<T: Copy + RealField> Contour<T> {
    /// Build the branch list of the requested topology in canonical order
    ///
    /// `tmax` is the extent of the real-time branches and `beta` the extent
    /// of the imaginary branch; a parameter belonging to a branch absent from
    /// the topology is ignored.
    pub fn new(topology: ContourTopology, tmax: T, beta: T) -> Result<Self, BuildError> {
        let branches = topology
            .branch_kinds()
            .iter()
            .map(|&kind| {
                let length = match kind {
                    BranchKind::Imaginary => beta,
                    _ => tmax,
                };
                Branch::new(kind, length)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { topology, branches })
    }

    /// A full contour: forward, backward and imaginary branches
    pub fn full(tmax: T, beta: T) -> Result<Self, BuildError> {
        Self::new(ContourTopology::Full, tmax, beta)
    }

    /// A two-branch real-time contour
    pub fn real_time(tmax: T) -> Result<Self, BuildError> {
        Self::new(ContourTopology::RealTime, tmax, T::zero())
    }

    /// An imaginary-time contour
    pub fn imaginary_time(beta: T) -> Result<Self, BuildError> {
        Self::new(ContourTopology::ImaginaryTime, T::zero(), beta)
    }

    /// The topology tag this contour was built from
    pub fn topology(&self) -> ContourTopology {
        self.topology
    }

    /// The branches in traversal order
    pub fn branches(&self) -> &[Branch<T>] {
        &self.branches
    }

    /// Cyclically rotate the branch list left by one position
    ///
    /// Changes the tie-break of the time-ordering relation without touching
    /// any branch's own parametrization. Used to explore alternative
    /// traversal conventions, such as starting the path on the imaginary
    /// branch.
    pub fn twist(mut self) -> Self {
        self.branches.rotate_left(1);
        self
    }

    /// The branch matching a kind, if it belongs to this contour
    pub fn get_branch(&self, kind: BranchKind) -> Option<&Branch<T>> {
        self.branches.iter().find(|branch| branch.kind() == kind)
    }

    /// β read off the imaginary branch, when the topology carries one
    pub fn inverse_temperature(&self) -> Option<T> {
        self.get_branch(BranchKind::Imaginary)
            .map(|branch| branch.length())
    }

    /// The time-ordering step function between two points of this contour
    ///
    /// On a common branch later-on-branch means later. Across branches the
    /// branch appearing earlier in the traversal sequence is the later one;
    /// the scan returns on the first operand branch encountered. Boundary
    /// points shared between adjacent branches (`reference` 0 or 1) are
    /// therefore resolved by branch membership, never by comparing their
    /// coincident time values.
    pub fn heaviside(&self, t1: &BranchPoint<T>, t2: &BranchPoint<T>) -> bool {
        if t1.kind() == t2.kind() {
            return t1.reference() >= t2.reference();
        }
        for branch in &self.branches {
            if branch.kind() == t1.kind() {
                return true;
            }
            if branch.kind() == t2.kind() {
                return false;
            }
        }
        // Neither point lies on this contour, fall back to the canonical order
        heaviside(t1, t2)
    }
}
