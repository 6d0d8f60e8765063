//! Infrastructure adapters for HTML, clipboard, config, and file watching.

pub mod clipboard;
pub mod config;
pub mod document;
pub mod fs_watch;
pub mod html;
