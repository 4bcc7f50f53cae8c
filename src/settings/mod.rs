//! Settings of the `hwconf` management tool itself (not the hardware
//! configuration it manages), loaded from a TOML file.
//!
//! Your starting point should probably be [`Settings::load_from_default_path`].
//!
//! # Internals
//! The settings file is first deserialized into [`UnresolvedSettings`],
//! which is then `resolve`d, recursively, into the validated [`Settings`].
//! Any validation lives in [`resolve`][traits::ResolvableSettings::resolve],
//! e.g. rejecting a level filter that doesn't parse or a base data directory
//! path that points at a file.

#![allow(rustdoc::private_intra_doc_links)]

mod structure;
mod traits;
mod utilities;

pub use structure::*;
