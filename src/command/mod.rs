//! The command model (spec §3 `Cmd`).

pub mod catalog;
pub mod export;

pub use catalog::GlCommand;
pub use export::CaptureExporter;
pub use crate::ids::CmdId;

use crate::ids::ThreadId;
use crate::memory::Observations;

bitflags! {
    /// Flags a command carries about itself (spec §3: "is-draw,
    /// is-start-of-frame").
    #[derive(Default)]
    pub struct CmdFlags: u32 {
        const DRAW             = 0b0000_0001;
        const START_OF_FRAME    = 0b0000_0010;
        const ABORTED           = 0b0000_0100;
        const CONTEXT_CREATE    = 0b0000_1000;
        const MAKE_CURRENT      = 0b0001_0000;
        const PROGRAM_LINK      = 0b0010_0000;
        /// `eglSwapBuffersWithDamageKHR`: a no-op for undefined-framebuffer
        /// purposes (spec §4.7 "Exceptions").
        const PARTIAL_SWAP      = 0b0100_0000;
    }
}

/// Out-of-band data attached to a command (spec §3 `Extras`, §4.2).
#[derive(Clone, Debug)]
pub enum Extra {
    /// Program-link info observed at capture time: active attributes (name,
    /// location) and active uniform blocks (name), used to re-derive
    /// replay-time locations/indices (spec §4.2 program linking phases).
    ProgramInfo(ProgramInfo),
    StaticContextState(StaticContextState),
    DynamicContextState(DynamicContextState),
    AndroidNativeBufferInfo { width: u32, height: u32, format: u32 },
    ObservedErrorState { gl_error: u32 },
}

#[derive(Clone, Debug, Default)]
pub struct ProgramInfo {
    pub active_attributes: Vec<ActiveAttribute>,
    pub active_uniform_blocks: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlesVersion {
    pub major: u8,
    pub minor: u8,
}

#[derive(Clone, Debug)]
pub struct StaticContextState {
    pub version: GlesVersion,
}

#[derive(Copy, Clone, Debug)]
pub struct DynamicContextState {
    pub backbuffer_width: u32,
    pub backbuffer_height: u32,
    pub preserve_buffers_on_swap: bool,
}

/// A single recorded API call plus its observations and thread (spec §3
/// `Cmd`).
#[derive(Clone, Debug)]
pub struct Cmd {
    pub thread: ThreadId,
    pub kind: GlCommand,
    pub extras: Vec<Extra>,
    pub observations: Observations,
    pub flags: CmdFlags,
}

impl Cmd {
    pub fn new(thread: ThreadId, kind: GlCommand) -> Self {
        let flags = catalog::default_flags(&kind);
        Cmd {
            thread,
            kind,
            extras: Vec::new(),
            observations: Observations::default(),
            flags,
        }
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extras.push(extra);
        self
    }

    pub fn with_flags(mut self, flags: CmdFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// The command's GL name, e.g. `"glBufferData"`.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn program_info(&self) -> Option<&ProgramInfo> {
        self.extras.iter().find_map(|e| match e {
            Extra::ProgramInfo(p) => Some(p),
            _ => None,
        })
    }

    pub fn static_context_state(&self) -> Option<&StaticContextState> {
        self.extras.iter().find_map(|e| match e {
            Extra::StaticContextState(s) => Some(s),
            _ => None,
        })
    }

    pub fn dynamic_context_state(&self) -> Option<&DynamicContextState> {
        self.extras.iter().find_map(|e| match e {
            Extra::DynamicContextState(s) => Some(s),
            _ => None,
        })
    }
}
