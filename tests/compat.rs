//! End-to-end compatibility-pass scenarios driven through a real
//! `TransformChain`, mirroring the documented client-vertex-array,
//! uniform-buffer-alignment and luminance-texture walkthroughs.

use gles_replay::arena::GlobalState;
use gles_replay::builder::RecordingBuilder;
use gles_replay::command::catalog::{
    BufferTarget, GlCommand, SwizzleChannel, SwizzleParam, TexImageDesc, TextureTarget,
    VertexAttribPointer, VertexAttribType, WindowSystem,
};
use gles_replay::command::Cmd;
use gles_replay::ids::{BufferId, CmdId, ContextId, ThreadId, VertexArrayId};
use gles_replay::memory::{MemoryModel, Pointer};
use gles_replay::state::objects::VertexArray;
use gles_replay::transform::compat::texture_format::TextureFormatCompat;
use gles_replay::transform::compat::ubo_align::UboAlignCompat;
use gles_replay::transform::compat::vertex_arrays::VertexArrayCompat;
use gles_replay::transform::TransformChain;

fn context(global: &mut GlobalState) -> ContextId {
    global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
    global.gles.make_current(ThreadId(0), Some(ContextId(1)));
    ContextId(1)
}

#[test]
fn client_vertex_array_is_materialized_into_a_buffer_before_the_draw() {
    let mut global = GlobalState::new(MemoryModel::new(8, true));
    let ctx = context(&mut global);

    let vao_id = VertexArrayId(1);
    let mut vao = VertexArray::new(vao_id);
    vao.attribs[0].enabled = true;
    let app_pool = global.memory.application_pool();
    global.memory.put(app_pool, 0x1000, vec![0u8; 64]);
    let client_pointer = VertexAttribPointer {
        index: 0,
        size: 3,
        attrib_type: VertexAttribType::Float,
        normalized: false,
        stride: 0,
        pointer: Pointer { addr: 0x1000, pool: app_pool },
    };
    vao.client_vertex_attribs.insert(0, client_pointer);

    {
        let c = global.gles.context_mut(ctx).unwrap();
        c.objects.vertex_arrays.add(vao_id, vao);
        c.bound.vertex_array = vao_id;
    }

    let mut chain = TransformChain::new(vec![Box::new(VertexArrayCompat::new(
        gles_replay::externs::LoopIndexLimits,
    ))]);
    let mut builder = RecordingBuilder::new();
    let mut seen = Vec::new();
    let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

    let draw = Cmd::new(
        ThreadId(0),
        GlCommand::DrawArrays { mode: gles_replay::command::catalog::DrawMode::Triangles, first: 0, count: 3 },
    );
    chain.transform_one(&mut global, &mut builder, CmdId::real(10), draw, &mut sink).unwrap();

    assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::GenBuffers(_))));
    assert!(seen.iter().any(|(_, c)| matches!(
        c.kind,
        GlCommand::BindBuffer { target: BufferTarget::Array, .. }
    )));
    assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::BufferData { .. })));
    assert!(seen
        .iter()
        .any(|(_, c)| matches!(c.kind, GlCommand::VertexAttribPointerCmd(p) if p.index == 0)));
    // the original draw itself still reaches the sink, at its original id.
    assert!(seen
        .iter()
        .any(|(id, c)| *id == CmdId::real(10) && matches!(c.kind, GlCommand::DrawArrays { .. })));
}

#[test]
fn unaligned_uniform_buffer_range_is_realigned_through_a_scratch_copy() {
    let mut global = GlobalState::new(MemoryModel::new(8, true));
    let ctx = context(&mut global);
    global.gles.context_mut(ctx).unwrap().info.constants.uniform_buffer_offset_alignment = 256;

    let mut chain = TransformChain::new(vec![Box::new(UboAlignCompat::new())]);
    let mut builder = RecordingBuilder::new();
    let mut seen = Vec::new();
    let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

    let bind_range = Cmd::new(
        ThreadId(0),
        GlCommand::BindBufferRange {
            target: BufferTarget::Uniform,
            index: 3,
            buffer: BufferId(7),
            offset: 100, // not a multiple of 256
            size: 64,
        },
    );
    chain.transform_one(&mut global, &mut builder, CmdId::real(1), bind_range, &mut sink).unwrap();

    assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::GenBuffers(_))));
    assert!(seen.iter().any(|(_, c)| matches!(c.kind, GlCommand::CopyBufferSubData { .. })));
    // the realigned scratch copy is bound at the *original* index, not 0.
    assert!(seen.iter().any(|(_, c)| matches!(
        c.kind,
        GlCommand::BindBufferRange { target: BufferTarget::Uniform, index: 3, offset: 0, .. }
    )));
    assert!(!seen.iter().any(|(_, c)| matches!(
        c.kind,
        GlCommand::BindBufferRange { index: 0, .. }
    )));
    // the original (unaligned) offset never reaches the sink as a BindBufferRange.
    assert!(!seen.iter().any(|(_, c)| matches!(
        c.kind,
        GlCommand::BindBufferRange { offset: 100, .. }
    )));
}

#[test]
fn aligned_uniform_buffer_range_passes_through_unchanged() {
    let mut global = GlobalState::new(MemoryModel::new(8, true));
    context(&mut global);

    let mut chain = TransformChain::new(vec![Box::new(UboAlignCompat::new())]);
    let mut builder = RecordingBuilder::new();
    let mut seen = Vec::new();
    let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

    let bind_range = Cmd::new(
        ThreadId(0),
        GlCommand::BindBufferRange { target: BufferTarget::Uniform, index: 0, buffer: BufferId(7), offset: 256, size: 64 },
    );
    chain.transform_one(&mut global, &mut builder, CmdId::real(1), bind_range, &mut sink).unwrap();

    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0].1.kind, GlCommand::BindBufferRange { offset: 256, .. }));
}

#[test]
fn luminance_texture_upload_is_rewritten_to_r8_with_a_swizzle() {
    let mut global = GlobalState::new(MemoryModel::new(8, true));
    context(&mut global);

    let mut chain = TransformChain::new(vec![Box::new(TextureFormatCompat::new())]);
    let mut builder = RecordingBuilder::new();
    let mut seen = Vec::new();
    let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

    const GL_LUMINANCE: u32 = 0x1909;
    const GL_UNSIGNED_BYTE: u32 = 0x1401;
    let desc = TexImageDesc {
        target: TextureTarget::Texture2D,
        level: 0,
        internal_format: GL_LUMINANCE,
        width: 4,
        height: 4,
        format: GL_LUMINANCE,
        component_type: GL_UNSIGNED_BYTE,
        data: Pointer::NULL,
    };
    let upload = Cmd::new(ThreadId(0), GlCommand::TexImage2D(desc));
    chain.transform_one(&mut global, &mut builder, CmdId::real(1), upload, &mut sink).unwrap();

    assert_eq!(seen.len(), 5);
    match seen[0].1.kind {
        GlCommand::TexImage2D(d) => {
            assert_eq!(d.internal_format, 0x8229); // GL_R8
            assert_eq!(d.format, 0x1903); // GL_RED
        }
        _ => panic!("expected TexImage2D"),
    }
    // luminance emulation needs (R,R,R,1): swizzle R/G/B to the stored red
    // channel and A to the constant one, or sampling returns (R,0,0,1).
    let expect = [
        (SwizzleParam::SwizzleR, SwizzleChannel::Red),
        (SwizzleParam::SwizzleG, SwizzleChannel::Red),
        (SwizzleParam::SwizzleB, SwizzleChannel::Red),
        (SwizzleParam::SwizzleA, SwizzleChannel::One),
    ];
    for (param, channel) in expect {
        assert!(seen.iter().any(|(_, c)| matches!(
            c.kind,
            GlCommand::TexParameterSwizzle { param: p, value: v, .. } if p == param && v == channel
        )));
    }
}
