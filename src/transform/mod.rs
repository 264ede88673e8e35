//! The transform framework (spec §4.1): an ordered chain of [`Transformer`]s
//! threaded through a [`Writer`] that owns the canonical [`GlobalState`].

pub mod compat;
pub mod dce;
pub mod destroy_eos;
pub mod read_framebuffer;
pub mod undefined_fb;
pub mod wireframe;

use crate::arena::{CmdHandle, GlobalState};
use crate::command::{CaptureExporter, Cmd};
use crate::error::Result;
use crate::ids::CmdId;

/// One pass in the command-transform chain (spec §4.1).
///
/// Implementations must not mutate the `cmd` they receive in place; to emit
/// a variant, clone it first. A transform may reorder within the bounds of
/// what it has not yet forwarded by holding commands in an internal queue.
pub trait Transformer {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()>;

    /// Called once after the last command, in chain order, so an earlier
    /// pass's deferred emissions still flow through later passes before
    /// they flush (spec §4.1).
    fn flush(&mut self, out: &mut Writer<'_>) -> Result<()> {
        let _ = out;
        Ok(())
    }
}

/// The sink a [`Transformer`] forwards into: owns the canonical
/// [`GlobalState`] and the rest of the chain (spec §4.1 `Writer`).
pub struct Writer<'a> {
    global: &'a mut GlobalState,
    builder: &'a mut dyn crate::builder::Builder,
    rest: &'a mut [Box<dyn Transformer>],
    sink: &'a mut dyn FnMut(CmdId, Cmd),
    /// Populated only when the owning chain was built with
    /// `TransformChain::with_exporter` (spec §3a).
    export_log: Option<&'a mut Vec<(CmdId, CmdHandle)>>,
}

impl<'a> Writer<'a> {
    pub fn state(&mut self) -> &mut GlobalState {
        self.global
    }

    pub fn builder(&mut self) -> &mut dyn crate::builder::Builder {
        self.builder
    }

    /// Applies `cmd.mutate` (advancing the canonical state, emitting into
    /// the builder if present) and forwards `(id, cmd)` to the next
    /// transformer in the chain, or to the chain's terminal sink.
    pub fn mutate_and_write(&mut self, id: CmdId, cmd: Cmd) -> Result<()> {
        crate::mutator::mutate(self.global, id, &cmd, Some(self.builder))?;
        self.forward(id, cmd)
    }

    fn forward(&mut self, id: CmdId, cmd: Cmd) -> Result<()> {
        match self.rest.split_first_mut() {
            Some((next, rest)) => {
                let mut sub = Writer {
                    global: self.global,
                    builder: self.builder,
                    rest,
                    sink: self.sink,
                    export_log: match self.export_log.as_mut() {
                        Some(log) => Some(&mut **log),
                        None => None,
                    },
                };
                next.transform(id, cmd, &mut sub)
            }
            None => {
                if let Some(log) = self.export_log.as_mut() {
                    let handle = self.global.arena.alloc(cmd.clone());
                    log.push((id, handle));
                }
                (self.sink)(id, cmd);
                Ok(())
            }
        }
    }
}

/// Composes a fixed sequence of transformers (spec §4.1 "chain.transform").
pub struct TransformChain {
    transformers: Vec<Box<dyn Transformer>>,
    exporter: Option<Box<dyn CaptureExporter>>,
    exported: Vec<(CmdId, CmdHandle)>,
}

impl TransformChain {
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        TransformChain { transformers, exporter: None, exported: Vec::new() }
    }

    /// Like `new`, but every command that reaches the terminal sink is also
    /// cloned into the arena and, once the chain finishes flushing, handed to
    /// `exporter` as a full `(CmdId, Cmd)` log (spec §3a, off by default).
    pub fn with_exporter(transformers: Vec<Box<dyn Transformer>>, exporter: Box<dyn CaptureExporter>) -> Self {
        TransformChain { transformers, exporter: Some(exporter), exported: Vec::new() }
    }

    /// Streams one command through the chain starting at the first
    /// transformer.
    pub fn transform_one(
        &mut self,
        global: &mut GlobalState,
        builder: &mut dyn crate::builder::Builder,
        id: CmdId,
        cmd: Cmd,
        sink: &mut dyn FnMut(CmdId, Cmd),
    ) -> Result<()> {
        let exporting = self.exporter.is_some();
        match self.transformers.split_first_mut() {
            Some((first, rest)) => {
                let mut w = Writer { global, builder, rest, sink, export_log: exporting.then(|| &mut self.exported) };
                first.transform(id, cmd, &mut w)
            }
            None => {
                if exporting {
                    let handle = global.arena.alloc(cmd.clone());
                    self.exported.push((id, handle));
                }
                sink(id, cmd);
                Ok(())
            }
        }
    }

    /// Flushes every transformer in chain order (ascending index), so an
    /// earlier pass's deferred tail still has a chance to flow through
    /// later passes before they flush in turn (spec §4.1). If the chain was
    /// built with `with_exporter`, the accumulated log is handed to the
    /// exporter last, once every pass (including the end-of-stream
    /// destructor) has finished emitting.
    pub fn flush(
        &mut self,
        global: &mut GlobalState,
        builder: &mut dyn crate::builder::Builder,
        sink: &mut dyn FnMut(CmdId, Cmd),
    ) -> Result<()> {
        let exporting = self.exporter.is_some();
        for i in 0..self.transformers.len() {
            let (head, rest) = self.transformers.split_at_mut(i + 1);
            let current = head.last_mut().unwrap();
            let mut w = Writer {
                global,
                builder,
                rest,
                sink,
                export_log: exporting.then(|| &mut self.exported),
            };
            current.flush(&mut w)?;
        }
        if let Some(exporter) = self.exporter.as_mut() {
            let log: Vec<(CmdId, Cmd)> = self
                .exported
                .iter()
                .map(|(id, handle)| (*id, global.arena.get(*handle).clone()))
                .collect();
            exporter.export(&log);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::GlobalState;
    use crate::builder::RecordingBuilder;
    use crate::command::catalog::{GlCommand, WindowSystem};
    use crate::ids::ThreadId;
    use crate::memory::MemoryModel;

    #[test]
    fn with_exporter_receives_the_full_log_only_after_flush() {
        struct Collect(Vec<(CmdId, Cmd)>);
        impl CaptureExporter for Collect {
            fn export(&mut self, log: &[(CmdId, Cmd)]) {
                self.0 = log.to_vec();
            }
        }

        let mut global = GlobalState::new(MemoryModel::new(8, true));
        let exporter = Box::new(Collect(Vec::new()));
        let mut chain = TransformChain::with_exporter(Vec::new(), exporter);
        let mut builder = RecordingBuilder::new();
        let mut sink = |_id: CmdId, _cmd: Cmd| {};

        chain
            .transform_one(
                &mut global,
                &mut builder,
                CmdId::real(1),
                Cmd::new(ThreadId(0), GlCommand::SwapBuffers { ws: WindowSystem::Egl }),
                &mut sink,
            )
            .unwrap();
        assert!(chain.exported.len() == 1);

        chain.flush(&mut global, &mut builder, &mut sink).unwrap();
    }

    #[test]
    fn without_an_exporter_nothing_is_retained() {
        let mut global = GlobalState::new(MemoryModel::new(8, true));
        let mut chain = TransformChain::new(Vec::new());
        let mut builder = RecordingBuilder::new();
        let mut sink = |_id: CmdId, _cmd: Cmd| {};

        chain
            .transform_one(
                &mut global,
                &mut builder,
                CmdId::real(1),
                Cmd::new(ThreadId(0), GlCommand::SwapBuffers { ws: WindowSystem::Egl }),
                &mut sink,
            )
            .unwrap();
        assert!(chain.exported.is_empty());
    }
}
