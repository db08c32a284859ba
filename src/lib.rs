//! Tilestitch - library for compositing directories of tiles into sheets
//!
//! This library provides functionality to:
//! - Resolve the tiles of a directory with an optional name filter
//! - Plan a sheet layout (auto grid, strips, explicit matrix, or name-indexed grid)
//! - Composite tiles onto one canvas and encode it atomically
//! - Walk archive trees and convert matched textures to PNG

pub mod batch;
pub mod cli;
pub mod codec;
pub mod color;
pub mod composite;
pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod output;
pub mod resolve;
pub mod tile;

pub use error::{ErrorKind, Result, StitchError};
