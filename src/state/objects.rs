//! Object tables and object records (spec §3 `Objects`, `Object records`).

use crate::auxil::FastHashMap;
use crate::command::catalog::{ShaderStage, SwizzleChannel, TextureTarget};
use crate::ids::*;
use std::collections::BTreeMap;
use std::hash::Hash;

/// A typed id -> object-record table. Ids are unique within a
/// context-share-group; id `0` is a reserved "null" id and is never stored
/// (spec §3 invariants).
#[derive(Debug)]
pub struct ObjectTable<Id: Eq + Hash + Copy + Ord, Obj> {
    objects: FastHashMap<Id, Obj>,
}

impl<Id: Eq + Hash + Copy + Ord, Obj> Default for ObjectTable<Id, Obj> {
    fn default() -> Self {
        ObjectTable {
            objects: FastHashMap::default(),
        }
    }
}

impl<Id: Eq + Hash + Copy + Ord, Obj> ObjectTable<Id, Obj> {
    pub fn get(&self, id: Id) -> Option<&Obj> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: Id) -> Option<&mut Obj> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn keys_sorted(&self) -> Vec<Id> {
        let mut keys: Vec<Id> = self.objects.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn range(&self, lo: Id, hi: Id) -> Vec<Id> {
        self.keys_sorted()
            .into_iter()
            .filter(|&k| k >= lo && k <= hi)
            .collect()
    }

    pub fn add(&mut self, id: Id, obj: Obj) {
        self.objects.insert(id, obj);
    }

    pub fn remove(&mut self, id: Id) -> Option<Obj> {
        self.objects.remove(&id)
    }
}

#[derive(Clone, Debug)]
pub struct Buffer {
    pub id: BufferId,
    pub data: Vec<u8>,
    pub size: u64,
    pub usage: u32,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct TextureLevel {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub sized_format: u32,
    pub samples: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Swizzle {
    pub r: SwizzleChannel,
    pub g: SwizzleChannel,
    pub b: SwizzleChannel,
    pub a: SwizzleChannel,
}

impl Default for Swizzle {
    fn default() -> Self {
        Swizzle {
            r: SwizzleChannel::Red,
            g: SwizzleChannel::Green,
            b: SwizzleChannel::Blue,
            a: SwizzleChannel::Alpha,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Texture {
    pub id: TextureId,
    pub kind: Option<TextureTarget>,
    pub levels: BTreeMap<u32, BTreeMap<u32, TextureLevel>>,
    pub swizzle: Swizzle,
    pub egl_image: Option<EglImageBackref>,
}

/// Back-reference installed by `glEGLImageTargetTexture2DOES`-equivalent
/// commands: the texture actually lives in another context's table (spec
/// §4.3, scenario 5).
#[derive(Copy, Clone, Debug)]
pub struct EglImageBackref {
    pub target_context: ContextId,
    pub target_texture: TextureId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttachmentKind {
    None,
    Texture,
    Renderbuffer,
}

impl Default for AttachmentKind {
    fn default() -> Self {
        AttachmentKind::None
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct FramebufferAttachment {
    pub kind: AttachmentKind,
    pub texture: TextureId,
    pub texture_level: u32,
    pub texture_layer: u32,
    pub renderbuffer: RenderbufferId,
}

pub const MAX_COLOR_ATTACHMENTS: usize = 8;

#[derive(Clone, Debug)]
pub struct Framebuffer {
    pub id: FramebufferId,
    pub color_attachments: [FramebufferAttachment; MAX_COLOR_ATTACHMENTS],
    pub depth_attachment: FramebufferAttachment,
    pub stencil_attachment: FramebufferAttachment,
}

impl Framebuffer {
    pub fn new(id: FramebufferId) -> Self {
        Framebuffer {
            id,
            color_attachments: Default::default(),
            depth_attachment: Default::default(),
            stencil_attachment: Default::default(),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Renderbuffer {
    pub id: RenderbufferId,
    pub width: u32,
    pub height: u32,
    pub internal_format: u32,
    pub samples: u32,
}

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub id: ProgramId,
    pub link_status: bool,
    pub active_attributes: Vec<(String, i32)>,
    pub active_uniforms: Vec<String>,
    pub active_uniform_blocks: Vec<String>,
    pub uniforms: FastHashMap<String, i32>,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct VertexAttribState {
    pub enabled: bool,
    pub size: u32,
    pub gl_type: crate::command::catalog::VertexAttribType,
    pub normalized: bool,
    pub stride: u32,
    pub relative_offset: u32,
    pub binding: u32,
    pub pointer: u64,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct VertexBufferBinding {
    pub buffer: BufferId,
    pub offset: u64,
    pub stride: u32,
    pub divisor: u32,
}

pub const MAX_VERTEX_ATTRIBS: usize = 16;

#[derive(Clone, Debug)]
pub struct VertexArray {
    pub id: VertexArrayId,
    pub element_array_buffer: BufferId,
    pub attribs: [VertexAttribState; MAX_VERTEX_ATTRIBS],
    pub bindings: [VertexBufferBinding; MAX_VERTEX_ATTRIBS],
    /// Commands recorded for attributes whose data still lives in client
    /// memory (compat §4.5.1 `clientVAs`), keyed by attribute index.
    pub client_vertex_attribs: FastHashMap<u32, crate::command::catalog::VertexAttribPointer>,
    pub client_element_array: Option<crate::memory::Pointer>,
}

impl VertexArray {
    pub fn new(id: VertexArrayId) -> Self {
        VertexArray {
            id,
            element_array_buffer: BufferId::NULL,
            attribs: Default::default(),
            bindings: Default::default(),
            client_vertex_attribs: FastHashMap::default(),
            client_element_array: None,
        }
    }
}

/// Per-context (non-shareable) and shared (multi-context) object tables
/// (spec §3 `Objects`).
#[derive(Default)]
pub struct SharedObjects {
    pub buffers: ObjectTable<BufferId, Buffer>,
    pub textures: ObjectTable<TextureId, Texture>,
    pub renderbuffers: ObjectTable<RenderbufferId, Renderbuffer>,
    pub shaders: ObjectTable<ShaderId, (ShaderStage, String)>,
    pub programs: ObjectTable<ProgramId, Program>,
    pub samplers: ObjectTable<SamplerId, ()>,
    pub syncs: ObjectTable<SyncId, ()>,
}

#[derive(Default)]
pub struct PerContextObjects {
    pub vertex_arrays: ObjectTable<VertexArrayId, VertexArray>,
    pub framebuffers: ObjectTable<FramebufferId, Framebuffer>,
    pub queries: ObjectTable<QueryId, ()>,
    pub transform_feedbacks: ObjectTable<TransformFeedbackId, ()>,
    pub pipelines: ObjectTable<PipelineId, ()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_add_get_remove() {
        let mut t: ObjectTable<BufferId, Buffer> = ObjectTable::default();
        t.add(
            BufferId(3),
            Buffer {
                id: BufferId(3),
                data: vec![],
                size: 0,
                usage: 0,
            },
        );
        assert!(t.contains(BufferId(3)));
        assert!(t.get(BufferId(3)).is_some());
        t.remove(BufferId(3));
        assert!(!t.contains(BufferId(3)));
    }

    #[test]
    fn keys_sorted_is_sorted() {
        let mut t: ObjectTable<BufferId, ()> = ObjectTable::default();
        for i in [5u32, 1, 3] {
            t.add(BufferId(i), ());
        }
        assert_eq!(t.keys_sorted(), vec![BufferId(1), BufferId(3), BufferId(5)]);
    }
}
