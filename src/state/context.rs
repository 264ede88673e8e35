//! A single GLES rendering context (spec §3 `Context`).

use super::objects::{PerContextObjects, SharedObjects};
use crate::auxil::FastHashSet;
use crate::command::GlesVersion;
use crate::ids::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Constants a context exposes that compat passes key decisions on (spec
/// §4.5.2, §4.5.3): alignment requirements and which extensions/formats the
/// target device actually supports.
#[derive(Clone, Debug)]
pub struct ConstantsBlock {
    pub uniform_buffer_offset_alignment: u32,
    pub max_color_attachments: u32,
    pub max_combined_texture_image_units: u32,
}

impl Default for ConstantsBlock {
    fn default() -> Self {
        ConstantsBlock {
            uniform_buffer_offset_alignment: 256,
            max_color_attachments: 4,
            max_combined_texture_image_units: 16,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Info {
    pub initialized: bool,
    pub preserve_on_swap: bool,
    pub supported_version: GlesVersion,
    pub supported_extensions: FastHashSet<String>,
    pub constants: ConstantsBlock,
}

/// The set of objects currently bound to each target (spec §3 `Bound`).
/// Binding a new object on a target implicitly unbinds the previous one
/// without destroying it (spec invariants).
#[derive(Default)]
pub struct Bound {
    pub array_buffer: BufferId,
    pub element_array_buffer: BufferId,
    pub draw_framebuffer: FramebufferId,
    pub read_framebuffer: FramebufferId,
    pub program: Option<ProgramId>,
    pub vertex_array: VertexArrayId,
    pub uniform_buffers: [BufferId; 16],
    pub transform_feedback: Option<TransformFeedbackId>,
    pub pixel_unpack_buffer: BufferId,
    pub pixel_pack_buffer: BufferId,
    pub copy_read_buffer: BufferId,
    pub copy_write_buffer: BufferId,
    pub texture_unit: u32,
    pub texture_2d: [TextureId; 16],
    pub renderbuffer: RenderbufferId,
}

#[derive(Default)]
pub struct BackbufferInfo {
    pub width: u32,
    pub height: u32,
}

/// A GLES context (spec §3). Objects that are shareable across a
/// share-group (buffers, textures, ...) live behind an `Rc<RefCell<..>>`
/// so deleting one from any sharing context's view removes it for all of
/// them atomically (spec §3 invariants, §5a design note); the
/// non-shareable tables (VAOs, FBOs, queries, ...) are owned directly.
pub struct Context {
    pub id: ContextId,
    pub info: Info,
    pub bound: Bound,
    pub shared: Rc<RefCell<SharedObjects>>,
    pub objects: PerContextObjects,
    pub backbuffer: BackbufferInfo,
    /// GL capability enums currently enabled via `glEnable`/`glDisable`
    /// (spec §4.7 "the tweaker" needs the real prior state to revert to).
    pub enabled: FastHashSet<u32>,
}

impl Context {
    pub fn new(id: ContextId, shared: Rc<RefCell<SharedObjects>>) -> Self {
        Context {
            id,
            info: Info::default(),
            bound: Bound::default(),
            shared,
            objects: PerContextObjects::default(),
            backbuffer: BackbufferInfo::default(),
            enabled: FastHashSet::default(),
        }
    }

    /// Create a context that shares object tables with `other` (a new
    /// context created with `share_context` set, per the GL spec).
    pub fn new_sharing(id: ContextId, other: &Context) -> Self {
        Self::new(id, other.shared.clone())
    }
}
