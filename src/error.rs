//! Error kinds, matching `spec.md` §7.

use crate::command::CmdId;
use thiserror::Error;

/// Data-extraction failures delivered to request futures (spec §7,
/// `ErrDataUnavailable`).
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataUnavailable {
    #[error("framebuffer unavailable")]
    FramebufferUnavailable,
    #[error("mesh has no vertices")]
    MeshHasNoVertices,
    #[error("no program bound")]
    NoProgramBound,
    /// Stencil-attachment reads are a recognized gap, not a guess (spec §9
    /// Open Questions: "not currently supported").
    #[error("stencil attachment readback is not supported")]
    StencilReadUnsupported,
}

/// Observed mismatch between trace-time and driver-reported GL error codes.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[error("unexpected driver trace error: driver reported {driver_err:#x}, expected {expected_err:#x}")]
pub struct UnexpectedDriverTraceError {
    pub driver_err: u32,
    pub expected_err: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `gl*` command executed with no context current on its thread.
    #[error("no context bound for command {0:?}")]
    NoContextBound(CmdId),

    /// Generic mutate-abort: the command is skipped, the stream continues.
    #[error("command {0:?} aborted: {1}")]
    CmdAborted(CmdId, String),

    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error(transparent)]
    UnexpectedDriverTrace(#[from] UnexpectedDriverTraceError),

    /// Non-fatal compatibility failure; callers are expected to route this
    /// through `on_compat_error` rather than propagate it (spec §4.1, §7).
    #[error("compat error for command {0:?}: {1}")]
    Compat(CmdId, String),

    /// Infrastructure failure: missing dependency graph, builder failure,
    /// or similar. Aborts the whole replay (spec §7 propagation policy).
    #[error("replay infrastructure error: {0}")]
    Infrastructure(String),

    /// A draw variant whose index bounds the core refuses to guess (spec §9:
    /// `GlDrawArraysIndirect` / instanced variants are stubbed).
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// An EGL-image redirect whose target context could not be found
    /// (spec §4.3).
    #[error("cannot find EGL replacement context {0}")]
    CannotFindEglReplacementContext(u32),

    /// An EGL-image redirect whose target texture could not be found
    /// (spec §4.3).
    #[error("cannot find EGL replacement texture {0}")]
    CannotFindEglReplacementTexture(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
