//! Core domain types: markers, formats, errors, and the content tree abstraction.

pub mod errors;
pub mod model;
pub mod tree;
