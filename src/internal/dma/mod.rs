//! DMA Engine
//!
//! Descriptor rings shared with the MAC's DMA controller. Memory for the
//! descriptors is owned here and sized by const generics; frame buffers come
//! from the host stack's pool.
//!
//! # Architecture
//!
//! - [`DmaEngine`]: both rings, their cursors, and the buffers bound to them
//! - [`DescriptorRing`](ring::DescriptorRing): circular array with a wrapping cursor
//! - RX/TX descriptor types carrying the ownership protocol

mod descriptor;
mod engine;
mod ring;

pub use descriptor::RxErrorKind;
pub use descriptor::bits;
pub use engine::{DmaEngine, RxFollowup, RxPoll, TxCompletion};

#[cfg(test)]
pub use descriptor::{RxDescriptor, TxDescriptor};
