//! bp-rename CLI - rename a buildpack inside a buildpackage image.

pub mod commands;
