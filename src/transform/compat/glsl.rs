//! GLSL source translation (spec §4.5.4): hands captured shader source to
//! the [`GlslTranslator`] extern and emits the translated source.

use crate::command::catalog::{GlCommand, ShaderStage};
use crate::command::Cmd;
use crate::error::Result;
use crate::externs::{GlslTranslator, TargetProfile};
use crate::ids::{CmdId, ShaderId};
use crate::state::objects::SharedObjects;
use crate::auxil::FastHashMap;
use crate::transform::{Transformer, Writer};

pub struct GlslCompat<T: GlslTranslator> {
    translator: T,
    target: TargetProfile,
    stages: FastHashMap<ShaderId, ShaderStage>,
}

impl<T: GlslTranslator> GlslCompat<T> {
    pub fn new(translator: T, target: TargetProfile) -> Self {
        GlslCompat { translator, target, stages: FastHashMap::default() }
    }
}

fn shader_stage(shared: &SharedObjects, shader: ShaderId) -> Option<ShaderStage> {
    shared.shaders.get(shader).map(|(stage, _)| *stage)
}

impl<T: GlslTranslator> Transformer for GlslCompat<T> {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        match &cmd.kind {
            GlCommand::CreateShader { shader, stage } => {
                self.stages.insert(*shader, *stage);
                out.mutate_and_write(id, cmd)
            }
            GlCommand::ShaderSource { shader, source } => {
                let stage = self
                    .stages
                    .get(shader)
                    .copied()
                    .or_else(|| out.state().gles.current().and_then(|c| shader_stage(&c.shared.borrow(), *shader)))
                    .unwrap_or(ShaderStage::Fragment);
                let translated = self.translator.translate(source, stage, self.target);
                let rewritten = Cmd {
                    kind: GlCommand::ShaderSource { shader: *shader, source: translated },
                    ..cmd
                };
                out.mutate_and_write(id, rewritten)
            }
            GlCommand::DeleteShader(shader) => {
                self.stages.remove(shader);
                out.mutate_and_write(id, cmd)
            }
            _ => out.mutate_and_write(id, cmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::WindowSystem;
    use crate::ids::{ContextId, ThreadId};
    use crate::memory::MemoryModel;
    use crate::transform::TransformChain;

    #[test]
    fn shader_source_is_rewritten_through_passthrough_translator() {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        global.gles.create_context(WindowSystem::Egl, ContextId(1), None);
        global.gles.make_current(ThreadId(0), Some(ContextId(1)));

        let mut chain = TransformChain::new(vec![Box::new(GlslCompat::new(
            crate::externs::PassthroughTranslator,
            TargetProfile::Passthrough,
        ))]);
        let mut builder = RecordingBuilder::new();
        let mut seen = Vec::new();
        let mut sink = |id: CmdId, cmd: Cmd| seen.push((id, cmd));

        let create = Cmd::new(ThreadId(0), GlCommand::CreateShader { shader: ShaderId(1), stage: ShaderStage::Fragment });
        chain.transform_one(&mut global, &mut builder, CmdId::real(0), create, &mut sink).unwrap();

        let source = Cmd::new(ThreadId(0), GlCommand::ShaderSource { shader: ShaderId(1), source: "void main() {}".into() });
        chain.transform_one(&mut global, &mut builder, CmdId::real(1), source, &mut sink).unwrap();

        match &seen[1].1.kind {
            GlCommand::ShaderSource { source, .. } => assert_eq!(source, "void main() {}"),
            _ => panic!("expected ShaderSource"),
        }
    }
}
