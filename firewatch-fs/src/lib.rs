//! Filesystem abstraction for Firewatch.
//!
//! This crate provides the `Filesystem` trait used for photo storage and for
//! the CLI's input/output files, with a real implementation and an in-memory
//! mock for tests.

pub mod filesystem;

pub use filesystem::{Filesystem, FsError, MockFilesystem, RealFilesystem};
