use miette::Diagnostic;

/// Contradictory or missing construction parameters
///
/// These are surfaced immediately at construction time. The library never
/// silently picks a default when the caller's inputs disagree.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigurationError {
    /// The contour carries an imaginary branch, which fixes the inverse
    /// temperature, but a value was also supplied explicitly
    #[error("the imaginary branch fixes the inverse temperature, but a value was also supplied")]
    ConflictingInverseTemperature,
    /// The contour has no imaginary branch and no inverse temperature was
    /// supplied
    #[error("the contour has no imaginary branch, so an inverse temperature must be supplied")]
    MissingInverseTemperature,
    /// A per-branch point count was supplied for a branch family absent from
    /// the contour topology, or a required count was omitted
    #[error("{0}")]
    IncompatiblePointCounts(String),
}

/// General error for contour, grid and Greens function assembly
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum BuildError {
    /// A numeric parameter lies outside its admissible domain
    #[error("{0}")]
    Domain(String),
    /// Contradictory or missing construction parameters
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),
}
