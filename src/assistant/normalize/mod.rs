//! Response normalization.

pub mod normalizer;
pub mod sections;

pub use normalizer::ResponseNormalizer;
pub use sections::{DISCLAIMER, HeaderKind, PrimaryTitle, REQUIRED_MARKERS, Section};
