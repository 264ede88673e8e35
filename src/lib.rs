/*!
# GLES trace/replay transform pipeline.

This crate is the GLES subsystem of a graphics-API trace/replay framework. It
consumes a captured stream of OpenGL ES commands, mutates a model of GLES
state as it goes, and rewrites the stream through a chain of composable
transforms (dead-code elimination, a desktop-GL compatibility layer,
framebuffer/texture readback, a wireframe overlay, an undefined-framebuffer
painter, and an end-of-stream resource destructor) into a device-compatible
stream that a separate replay backend can execute.

The crate never calls into a real OpenGL driver. Commands are emitted to an
opaque [`builder::Builder`] sink; everything here operates on data.
*/

#![allow(clippy::too_many_arguments)]

#[macro_use]
extern crate bitflags;

pub mod arena;
pub mod auxil;
pub mod builder;
pub mod command;
pub mod error;
pub mod externs;
pub mod ids;
pub mod issues;
pub mod memory;
pub mod mutator;
pub mod remap;
pub mod replay;
pub mod state;
pub mod transform;

pub use error::Error;
pub use replay::{replay, get_replay_priority};
