//! Plan Quality Assurance
//!
//! Assertion chains, built-in checks, and quality profiles.

#![warn(missing_docs)]

pub mod asserter;
pub mod checks;
pub mod profile;

pub use asserter::{IntoVerdict, PqAsserter, Priority};
pub use checks::BuiltinCheck;
pub use profile::{ProfileError, QualityProfile};
