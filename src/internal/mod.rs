//! Internal Implementation Details
//!
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Frame sizes, ring limits and protocol constants
//! - [`dma`]: Descriptor layout and the ring engine
//! - [`hash`]: Multicast hash filter and setup-frame encoding
//!
//! # Stability
//!
//! **WARNING:** This module is `pub(crate)` only. Do not depend on any types
//! or functions in this module from external code.

pub(crate) mod constants;
pub(crate) mod dma;
pub(crate) mod hash;
