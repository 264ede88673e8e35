//! The compatibility transform (spec §4.5): bridges ES/desktop GL semantic
//! gaps. Each concern is its own [`crate::transform::Transformer`]; `replay`
//! composes the ones a given device descriptor needs into the chain.

pub mod glsl;
pub mod program_link;
pub mod texture_format;
pub mod ubo_align;
pub mod vertex_arrays;
