//! Program link/bind interposition (spec §4.2 "Program linking", §4.5.5):
//! wraps `glLinkProgram`/`glProgramBinary` with derived `glBindAttribLocation`
//! and `glGetUniformBlockIndex` calls so replay-time locations and block
//! indices match what was observed at capture time.

use crate::command::catalog::GlCommand;
use crate::command::Cmd;
use crate::error::Result;
use crate::ids::CmdId;
use crate::transform::{Transformer, Writer};

#[derive(Default)]
pub struct ProgramLinkCompat;

impl ProgramLinkCompat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for ProgramLinkCompat {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        let program = match &cmd.kind {
            GlCommand::LinkProgram(p) => Some(*p),
            GlCommand::ProgramBinary { program, .. } => Some(*program),
            _ => None,
        };
        let program = match program {
            Some(p) => p,
            None => return out.mutate_and_write(id, cmd),
        };

        let info = cmd.program_info().cloned();
        let thread = cmd.thread;
        let mut seq = 0u32;

        if let Some(info) = &info {
            for attr in &info.active_attributes {
                if attr.location != -1 && !attr.name.starts_with("gl_") {
                    seq += 1;
                    out.mutate_and_write(
                        id.derive(seq),
                        Cmd::new(thread, GlCommand::BindAttribLocation {
                            program,
                            index: attr.location as u32,
                            name: attr.name.clone(),
                        }),
                    )?;
                }
            }
        }

        out.mutate_and_write(id, cmd)?;

        if let Some(info) = &info {
            for name in &info.active_uniform_blocks {
                seq += 1;
                out.mutate_and_write(
                    id.derive(seq),
                    Cmd::new(thread, GlCommand::GetUniformBlockIndex { program, name: name.clone() }),
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::WindowSystem;
    use crate::command::{ActiveAttribute, Extra, ProgramInfo};
    use crate::ids::{ContextId, ProgramId, ThreadId};
    use crate::memory::MemoryModel;
    use crate::transform::TransformChain;

    #[test]
    fn link_program_emits_bind_attrib_location_before_and_uniform_block_index_after() {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));
        global
            .gles
            .context_mut(ContextId(1))
            .unwrap()
            .shared
            .borrow_mut()
            .programs
            .add(ProgramId(9), crate::state::objects::Program { id: ProgramId(9), ..Default::default() });

        let mut chain = TransformChain::new(vec![Box::new(ProgramLinkCompat::new())]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let info = ProgramInfo {
            active_attributes: vec![ActiveAttribute { name: "aPos".into(), location: 0 }],
            active_uniform_blocks: vec!["Block0".into()],
        };
        let cmd = Cmd::new(ThreadId(0), GlCommand::LinkProgram(ProgramId(9))).with_extra(Extra::ProgramInfo(info));
        chain.transform_one(&mut global, &mut builder, CmdId::real(5), cmd, &mut sink).unwrap();

        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0].1.kind, GlCommand::BindAttribLocation { .. }));
        assert!(matches!(seen[1].1.kind, GlCommand::LinkProgram(_)));
        assert!(matches!(seen[2].1.kind, GlCommand::GetUniformBlockIndex { .. }));
        assert!(seen[0].0 < seen[1].0);
        assert!(seen[1].0 < seen[2].0);
    }
}
