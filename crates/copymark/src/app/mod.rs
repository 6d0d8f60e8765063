//! Application layer: the copy pipeline over an abstract content tree.

pub mod extract;
pub mod format;
pub mod options;
pub mod order;
pub mod scan;
pub mod session;
pub mod watch;
