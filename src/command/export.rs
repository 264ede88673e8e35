//! Optional command-log export (spec §3a): the one "optional diagnostic"
//! callers can enable on a [`crate::transform::TransformChain`] to receive
//! every command as it was actually forwarded to the terminal sink. Off by
//! default.

use crate::command::Cmd;
use crate::ids::CmdId;

/// Receives the full replayed command log once a chain built with
/// [`crate::transform::TransformChain::with_exporter`] finishes flushing.
pub trait CaptureExporter {
    fn export(&mut self, log: &[(CmdId, Cmd)]);
}
