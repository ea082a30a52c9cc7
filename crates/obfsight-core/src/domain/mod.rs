//! Domain models for obfsight.
//!
//! - `Stage`: pipeline states and their dependency order
//! - `RepositoryIdentity`: which repository is tracked and where it comes from
//! - `TransformProfile`: opaque obfuscation options under a name

pub mod error;
pub mod repository;
pub mod stage;

pub use error::{PipelineError, Result};
pub use repository::{RepositoryIdentity, TransformProfile};
pub use stage::Stage;
