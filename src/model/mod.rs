pub mod refs;
pub mod repospec;

pub use refs::{ListingParseError, RefMap, ResolvedRevision};
pub use repospec::{DecompositionError, RepositorySpec, DEFAULT_REVISION};
