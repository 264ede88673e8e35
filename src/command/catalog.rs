//! The concrete tagged sum of GLES (and window-system) API calls this crate
//! understands in detail (spec §9 "Dynamic dispatch": "model commands as a
//! tagged sum over all API calls").
//!
//! Calls the transform chain has no special handling for still flow through
//! as [`GlCommand::Other`] so the pipeline never has to reject an unknown
//! command; only the ones the spec gives rewrite/compat/DCE rules for need a
//! dedicated variant.

use super::CmdFlags;
use crate::ids::*;
use crate::memory::Pointer;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WindowSystem {
    Egl,
    Wgl,
    Glx,
    Cgl,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VertexAttribType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Float,
    HalfFloat,
    Int,
    UnsignedInt,
}

impl Default for VertexAttribType {
    fn default() -> Self {
        VertexAttribType::Float
    }
}

impl VertexAttribType {
    pub fn size_bytes(self) -> u32 {
        match self {
            VertexAttribType::Byte | VertexAttribType::UnsignedByte => 1,
            VertexAttribType::Short | VertexAttribType::UnsignedShort | VertexAttribType::HalfFloat => 2,
            VertexAttribType::Float | VertexAttribType::Int | VertexAttribType::UnsignedInt => 4,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    pub fn size_bytes(self) -> u32 {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FramebufferTarget {
    Draw,
    Read,
    DrawAndRead,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Attachment {
    Color(u32),
    Depth,
    Stencil,
    DepthStencil,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SwizzleChannel {
    Red,
    Green,
    Blue,
    Alpha,
    One,
    Zero,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SwizzleParam {
    SwizzleR,
    SwizzleG,
    SwizzleB,
    SwizzleA,
}

/// A vertex attribute pointer's full state, as recorded by
/// `glVertexAttribPointer` (spec §3 `VertexArray`, §4.5.1).
#[derive(Copy, Clone, Debug)]
pub struct VertexAttribPointer {
    pub index: u32,
    pub size: u32,
    pub attrib_type: VertexAttribType,
    pub normalized: bool,
    pub stride: u32,
    pub pointer: Pointer,
}

#[derive(Copy, Clone, Debug)]
pub struct TexImageDesc {
    pub target: TextureTarget,
    pub level: u32,
    pub internal_format: u32,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub component_type: u32,
    pub data: Pointer,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TextureTarget {
    Texture2D,
    Texture3D,
    CubeMapPositiveX,
    CubeMapNegativeX,
    CubeMapPositiveY,
    CubeMapNegativeY,
    CubeMapPositiveZ,
    CubeMapNegativeZ,
    CubeMap,
    Texture2DArray,
}

impl TextureTarget {
    pub fn is_cube_face(self) -> bool {
        matches!(
            self,
            TextureTarget::CubeMapPositiveX
                | TextureTarget::CubeMapNegativeX
                | TextureTarget::CubeMapPositiveY
                | TextureTarget::CubeMapNegativeY
                | TextureTarget::CubeMapPositiveZ
                | TextureTarget::CubeMapNegativeZ
        )
    }

    /// Normalize a cube-map face target to `GL_TEXTURE_CUBE_MAP` the way the
    /// object table keys on it (spec §8 boundary behavior).
    pub fn normalized(self) -> TextureTarget {
        if self.is_cube_face() {
            TextureTarget::CubeMap
        } else {
            self
        }
    }
}

/// The concrete set of API calls the transform chain has dedicated
/// knowledge of.
#[derive(Clone, Debug)]
pub enum GlCommand {
    // --- window-system context lifecycle -------------------------------
    CreateContext {
        ws: WindowSystem,
        context: ContextId,
        share: Option<ContextId>,
    },
    MakeCurrent {
        ws: WindowSystem,
        context: Option<ContextId>,
        surface: Option<u64>,
    },
    SwapBuffers {
        ws: WindowSystem,
    },
    SwapBuffersWithDamage {
        ws: WindowSystem,
        rects: Vec<(i32, i32, i32, i32)>,
    },

    // --- buffers ---------------------------------------------------------
    GenBuffers(Vec<BufferId>),
    DeleteBuffers(Vec<BufferId>),
    BindBuffer { target: BufferTarget, buffer: BufferId },
    BufferData { target: BufferTarget, size: u64, data: Option<Pointer>, usage: u32 },
    BufferSubData { target: BufferTarget, offset: u64, size: u64, data: Pointer },
    CopyBufferSubData { read_target: BufferTarget, write_target: BufferTarget, read_offset: u64, write_offset: u64, size: u64 },
    BindBufferRange { target: BufferTarget, index: u32, buffer: BufferId, offset: u64, size: u64 },
    BindBufferBase { target: BufferTarget, index: u32, buffer: BufferId },

    // --- vertex arrays -----------------------------------------------------
    GenVertexArrays(Vec<VertexArrayId>),
    DeleteVertexArrays(Vec<VertexArrayId>),
    BindVertexArray(VertexArrayId),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointerCmd(VertexAttribPointer),
    VertexAttribDivisor { index: u32, divisor: u32 },

    // --- draws -------------------------------------------------------------
    DrawArrays { mode: DrawMode, first: u32, count: u32 },
    DrawElements { mode: DrawMode, count: u32, index_type: IndexType, indices: Pointer },
    DrawRangeElements { mode: DrawMode, start: u32, end: u32, count: u32, index_type: IndexType, indices: Pointer },
    DrawArraysInstanced { mode: DrawMode, first: u32, count: u32, instance_count: u32 },
    DrawElementsInstanced { mode: DrawMode, count: u32, index_type: IndexType, indices: Pointer, instance_count: u32 },
    DrawArraysIndirect { mode: DrawMode, indirect: Pointer },
    DrawElementsIndirect { mode: DrawMode, index_type: IndexType, indirect: Pointer },

    // --- textures ------------------------------------------------------------
    GenTextures(Vec<TextureId>),
    DeleteTextures(Vec<TextureId>),
    BindTexture { target: TextureTarget, texture: TextureId },
    TexImage2D(TexImageDesc),
    TexStorage2D { target: TextureTarget, levels: u32, internal_format: u32, width: u32, height: u32 },
    TexSubImage2D { target: TextureTarget, level: u32, x: u32, y: u32, width: u32, height: u32, format: u32, component_type: u32, data: Pointer },
    CompressedTexImage2D { target: TextureTarget, level: u32, internal_format: u32, width: u32, height: u32, image_size: u32, data: Pointer },
    CompressedTexSubImage2D { target: TextureTarget, level: u32, x: u32, y: u32, width: u32, height: u32, format: u32, image_size: u32, data: Pointer },
    TexParameterSwizzle { target: TextureTarget, param: SwizzleParam, value: SwizzleChannel },
    TexParameteri { target: TextureTarget, pname: u32, value: i32 },

    // --- renderbuffers / framebuffers -----------------------------------------
    GenRenderbuffers(Vec<RenderbufferId>),
    DeleteRenderbuffers(Vec<RenderbufferId>),
    BindRenderbuffer(RenderbufferId),
    RenderbufferStorage { internal_format: u32, width: u32, height: u32 },
    GenFramebuffers(Vec<FramebufferId>),
    DeleteFramebuffers(Vec<FramebufferId>),
    BindFramebuffer { target: FramebufferTarget, framebuffer: FramebufferId },
    FramebufferTexture2D { target: FramebufferTarget, attachment: Attachment, tex_target: TextureTarget, texture: TextureId, level: u32 },
    FramebufferRenderbuffer { target: FramebufferTarget, attachment: Attachment, renderbuffer: RenderbufferId },
    BlitFramebuffer { src: (i32, i32, i32, i32), dst: (i32, i32, i32, i32), mask: u32, filter: u32 },
    ReadBuffer(u32),
    ReadPixels { x: i32, y: i32, width: u32, height: u32, format: u32, component_type: u32 },
    InvalidateFramebuffer { target: FramebufferTarget, attachments: Vec<Attachment> },

    // --- shaders / programs ---------------------------------------------------
    CreateShader { shader: ShaderId, stage: ShaderStage },
    ShaderSource { shader: ShaderId, source: String },
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader { program: ProgramId, shader: ShaderId },
    LinkProgram(ProgramId),
    ProgramBinary { program: ProgramId, format: u32, data: Pointer, length: u32 },
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    BindAttribLocation { program: ProgramId, index: u32, name: String },
    GetActiveUniform { program: ProgramId, index: u32 },
    GetUniformLocation { program: ProgramId, name: String },
    GetActiveUniformBlockName { program: ProgramId, index: u32 },
    GetActiveUniformBlockiv { program: ProgramId, index: u32, pname: u32 },
    GetUniformBlockIndex { program: ProgramId, name: String },
    UniformBlockBinding { program: ProgramId, index: u32, binding: u32 },

    // --- misc objects ------------------------------------------------------
    GenSamplers(Vec<SamplerId>),
    DeleteSamplers(Vec<SamplerId>),
    GenQueries(Vec<QueryId>),
    DeleteQueries(Vec<QueryId>),
    GenTransformFeedbacks(Vec<TransformFeedbackId>),
    DeleteTransformFeedbacks(Vec<TransformFeedbackId>),
    FenceSync(SyncId),
    DeleteSync(SyncId),

    // --- misc state ----------------------------------------------------------
    Enable(u32),
    Disable(u32),
    BlendFunc { src: u32, dst: u32 },
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    Scissor { x: i32, y: i32, width: u32, height: u32 },
    Clear(u32),
    ActiveTexture(u32),
    PixelStorei { pname: u32, value: i32 },
    PolygonMode { mode: u32 },

    /// Any call the pipeline has no special handling for. It still mutates
    /// nothing and forwards unchanged; kept so the catalog doesn't need to
    /// be exhaustive for the pipeline to be total.
    Other { name: &'static str },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BufferTarget {
    Array,
    ElementArray,
    Uniform,
    PixelUnpack,
    PixelPack,
    CopyRead,
    CopyWrite,
    TransformFeedback,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    TessControl,
    TessEvaluation,
    Compute,
}

pub fn default_flags(kind: &GlCommand) -> CmdFlags {
    let mut flags = CmdFlags::empty();
    match kind {
        GlCommand::DrawArrays { .. }
        | GlCommand::DrawElements { .. }
        | GlCommand::DrawRangeElements { .. }
        | GlCommand::DrawArraysInstanced { .. }
        | GlCommand::DrawElementsInstanced { .. }
        | GlCommand::DrawArraysIndirect { .. }
        | GlCommand::DrawElementsIndirect { .. } => flags |= CmdFlags::DRAW,
        GlCommand::CreateContext { .. } => flags |= CmdFlags::CONTEXT_CREATE,
        GlCommand::MakeCurrent { .. } => flags |= CmdFlags::MAKE_CURRENT,
        GlCommand::LinkProgram(_) | GlCommand::ProgramBinary { .. } => flags |= CmdFlags::PROGRAM_LINK,
        GlCommand::SwapBuffersWithDamage { .. } => flags |= CmdFlags::PARTIAL_SWAP | CmdFlags::START_OF_FRAME,
        GlCommand::SwapBuffers { .. } => flags |= CmdFlags::START_OF_FRAME,
        _ => {}
    }
    flags
}

impl GlCommand {
    pub fn name(&self) -> &'static str {
        use GlCommand::*;
        match self {
            CreateContext { ws, .. } => match ws {
                WindowSystem::Egl => "eglCreateContext",
                WindowSystem::Wgl => "wglCreateContext",
                WindowSystem::Glx => "glXCreateContext",
                WindowSystem::Cgl => "CGLCreateContext",
            },
            MakeCurrent { ws, .. } => match ws {
                WindowSystem::Egl => "eglMakeCurrent",
                WindowSystem::Wgl => "wglMakeCurrent",
                WindowSystem::Glx => "glXMakeCurrent",
                WindowSystem::Cgl => "CGLSetCurrentContext",
            },
            SwapBuffers { .. } => "eglSwapBuffers",
            SwapBuffersWithDamage { .. } => "eglSwapBuffersWithDamageKHR",
            GenBuffers(_) => "glGenBuffers",
            DeleteBuffers(_) => "glDeleteBuffers",
            BindBuffer { .. } => "glBindBuffer",
            BufferData { .. } => "glBufferData",
            BufferSubData { .. } => "glBufferSubData",
            CopyBufferSubData { .. } => "glCopyBufferSubData",
            BindBufferRange { .. } => "glBindBufferRange",
            BindBufferBase { .. } => "glBindBufferBase",
            GenVertexArrays(_) => "glGenVertexArrays",
            DeleteVertexArrays(_) => "glDeleteVertexArrays",
            BindVertexArray(_) => "glBindVertexArray",
            EnableVertexAttribArray(_) => "glEnableVertexAttribArray",
            DisableVertexAttribArray(_) => "glDisableVertexAttribArray",
            VertexAttribPointerCmd(_) => "glVertexAttribPointer",
            VertexAttribDivisor { .. } => "glVertexAttribDivisor",
            DrawArrays { .. } => "glDrawArrays",
            DrawElements { .. } => "glDrawElements",
            DrawRangeElements { .. } => "glDrawRangeElements",
            DrawArraysInstanced { .. } => "glDrawArraysInstanced",
            DrawElementsInstanced { .. } => "glDrawElementsInstanced",
            DrawArraysIndirect { .. } => "glDrawArraysIndirect",
            DrawElementsIndirect { .. } => "glDrawElementsIndirect",
            GenTextures(_) => "glGenTextures",
            DeleteTextures(_) => "glDeleteTextures",
            BindTexture { .. } => "glBindTexture",
            TexImage2D(_) => "glTexImage2D",
            TexStorage2D { .. } => "glTexStorage2D",
            TexSubImage2D { .. } => "glTexSubImage2D",
            CompressedTexImage2D { .. } => "glCompressedTexImage2D",
            CompressedTexSubImage2D { .. } => "glCompressedTexSubImage2D",
            TexParameterSwizzle { .. } => "glTexParameteri",
            TexParameteri { .. } => "glTexParameteri",
            GenRenderbuffers(_) => "glGenRenderbuffers",
            DeleteRenderbuffers(_) => "glDeleteRenderbuffers",
            BindRenderbuffer(_) => "glBindRenderbuffer",
            RenderbufferStorage { .. } => "glRenderbufferStorage",
            GenFramebuffers(_) => "glGenFramebuffers",
            DeleteFramebuffers(_) => "glDeleteFramebuffers",
            BindFramebuffer { .. } => "glBindFramebuffer",
            FramebufferTexture2D { .. } => "glFramebufferTexture2D",
            FramebufferRenderbuffer { .. } => "glFramebufferRenderbuffer",
            BlitFramebuffer { .. } => "glBlitFramebuffer",
            ReadBuffer(_) => "glReadBuffer",
            ReadPixels { .. } => "glReadPixels",
            InvalidateFramebuffer { .. } => "glInvalidateFramebuffer",
            CreateShader { .. } => "glCreateShader",
            ShaderSource { .. } => "glShaderSource",
            CompileShader(_) => "glCompileShader",
            DeleteShader(_) => "glDeleteShader",
            CreateProgram(_) => "glCreateProgram",
            AttachShader { .. } => "glAttachShader",
            LinkProgram(_) => "glLinkProgram",
            ProgramBinary { .. } => "glProgramBinary",
            DeleteProgram(_) => "glDeleteProgram",
            UseProgram(_) => "glUseProgram",
            BindAttribLocation { .. } => "glBindAttribLocation",
            GetActiveUniform { .. } => "glGetActiveUniform",
            GetUniformLocation { .. } => "glGetUniformLocation",
            GetActiveUniformBlockName { .. } => "glGetActiveUniformBlockName",
            GetActiveUniformBlockiv { .. } => "glGetActiveUniformBlockiv",
            GetUniformBlockIndex { .. } => "glGetUniformBlockIndex",
            UniformBlockBinding { .. } => "glUniformBlockBinding",
            GenSamplers(_) => "glGenSamplers",
            DeleteSamplers(_) => "glDeleteSamplers",
            GenQueries(_) => "glGenQueries",
            DeleteQueries(_) => "glDeleteQueries",
            GenTransformFeedbacks(_) => "glGenTransformFeedbacks",
            DeleteTransformFeedbacks(_) => "glDeleteTransformFeedbacks",
            FenceSync(_) => "glFenceSync",
            DeleteSync(_) => "glDeleteSync",
            Enable(_) => "glEnable",
            Disable(_) => "glDisable",
            BlendFunc { .. } => "glBlendFunc",
            Viewport { .. } => "glViewport",
            Scissor { .. } => "glScissor",
            Clear(_) => "glClear",
            ActiveTexture(_) => "glActiveTexture",
            PixelStorei { .. } => "glPixelStorei",
            PolygonMode { .. } => "glPolygonMode",
            Other { name } => name,
        }
    }
}
