//! External collaborators the core calls into but does not implement (spec
//! §6): the GLSL translator (out of scope, a pure function over source
//! text) and the index-bounds scan (hot path, but semantically trivial).

use crate::command::catalog::ShaderStage;

/// `(indices: slice, sizeof_index) -> (first, count)` where `first =
/// min(indices)`, `count = max(indices) - first` (spec §6). Named for the
/// `IndicesPointer` scans the client-vertex-array compat pass needs for
/// `glDrawElements` when no explicit range is given.
pub trait IndexLimits {
    fn index_limits(&self, indices: &[u8], sizeof_index: u8, little_endian: bool) -> (u64, u64);
}

/// The reference loop implementation: "a straightforward loop suffices
/// semantically" per spec §6. Real deployments may swap in a SIMD-backed
/// implementation without changing the compat pass that calls it.
#[derive(Default)]
pub struct LoopIndexLimits;

impl IndexLimits for LoopIndexLimits {
    fn index_limits(&self, indices: &[u8], sizeof_index: u8, little_endian: bool) -> (u64, u64) {
        let decode = |chunk: &[u8]| -> u64 {
            let mut bytes = [0u8; 8];
            bytes[..chunk.len()].copy_from_slice(chunk);
            if little_endian {
                u64::from_le_bytes(bytes)
            } else {
                bytes[..chunk.len()].reverse();
                let mut be = [0u8; 8];
                be[8 - chunk.len()..].copy_from_slice(&bytes[..chunk.len()]);
                u64::from_be_bytes(be)
            }
        };

        let step = sizeof_index as usize;
        if step == 0 || indices.len() < step {
            return (0, 0);
        }
        let mut min = u64::MAX;
        let mut max = 0u64;
        for chunk in indices.chunks_exact(step) {
            let v = decode(chunk);
            min = min.min(v);
            max = max.max(v);
        }
        (min, max - min)
    }
}

/// The target language profile a shader is translated for. `Passthrough`
/// models a replay backend that understands ES GLSL natively (e.g.
/// replaying against another ES driver).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TargetProfile {
    Passthrough,
    DesktopGl { major: u8, minor: u8 },
}

/// `translate(source, stage, target) -> source` (spec §6). The GLSL
/// lexer/parser/semantic-analyzer behind a real implementation is out of
/// scope (spec §1).
pub trait GlslTranslator {
    fn translate(&self, source: &str, stage: ShaderStage, target: TargetProfile) -> String;
}

/// Forwards the captured source unchanged; suitable when the target profile
/// is ES-compatible or when translation is handled upstream.
#[derive(Default)]
pub struct PassthroughTranslator;

impl GlslTranslator for PassthroughTranslator {
    fn translate(&self, source: &str, _stage: ShaderStage, _target: TargetProfile) -> String {
        source.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_limits_u16_le() {
        let indices: Vec<u8> = vec![0, 0, 1, 0, 2, 0, 1, 0, 2, 0, 3, 0];
        let (first, count) = LoopIndexLimits.index_limits(&indices, 2, true);
        assert_eq!(first, 0);
        assert_eq!(count, 3);
    }

    #[test]
    fn passthrough_translator_is_identity() {
        let t = PassthroughTranslator;
        let out = t.translate("void main() {}", ShaderStage::Fragment, TargetProfile::Passthrough);
        assert_eq!(out, "void main() {}");
    }
}
