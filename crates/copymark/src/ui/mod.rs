//! Presentation layer: the copy button and the command-line front end.

pub mod button;
pub mod cli;
