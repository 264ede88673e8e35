//! Texture format compatibility (spec §4.5.3): luminance/alpha emulation via
//! swizzles, cube-face target normalization, and format substitutions for
//! formats core desktop GL profiles don't accept.

use crate::auxil::FastHashMap;
use crate::command::catalog::{GlCommand, SwizzleChannel, SwizzleParam, TexImageDesc, TextureTarget};
use crate::command::Cmd;
use crate::error::Result;
use crate::ids::{CmdId, TextureId};
use crate::state::objects::Swizzle;
use crate::transform::{Transformer, Writer};

const GL_LUMINANCE: u32 = 0x1909;
const GL_ALPHA: u32 = 0x1906;
const GL_LUMINANCE_ALPHA: u32 = 0x190A;
const GL_RED: u32 = 0x1903;
const GL_RG: u32 = 0x8227;
const GL_R8: u32 = 0x8229;
const GL_RG8: u32 = 0x822B;
const GL_BGRA_EXT: u32 = 0x80E1;
const GL_RGBA8: u32 = 0x8058;
const GL_RGB565: u32 = 0x8D62;
const GL_RGB8: u32 = 0x8051;
const GL_RGB10_A2UI: u32 = 0x906F;
const GL_RGBA16UI: u32 = 0x8D76;
const GL_HALF_FLOAT_OES: u32 = 0x8D61;
const GL_HALF_FLOAT: u32 = 0x140B;

fn is_la_family(format: u32) -> bool {
    matches!(format, GL_LUMINANCE | GL_ALPHA | GL_LUMINANCE_ALPHA)
}

/// The compat swizzle installed for an LA-family internal format (spec
/// §4.5.3, scenario 3 for `LUMINANCE`).
fn la_compat_swizzle(format: u32) -> Swizzle {
    match format {
        GL_LUMINANCE => Swizzle {
            r: SwizzleChannel::Red,
            g: SwizzleChannel::Red,
            b: SwizzleChannel::Red,
            a: SwizzleChannel::One,
        },
        GL_ALPHA => Swizzle {
            r: SwizzleChannel::Zero,
            g: SwizzleChannel::Zero,
            b: SwizzleChannel::Zero,
            a: SwizzleChannel::Red,
        },
        // LUMINANCE_ALPHA: luminance went to R, alpha to G of the RG8 copy.
        _ => Swizzle {
            r: SwizzleChannel::Red,
            g: SwizzleChannel::Red,
            b: SwizzleChannel::Red,
            a: SwizzleChannel::Green,
        },
    }
}

fn substitute_internal_format(format: u32) -> u32 {
    match format {
        GL_BGRA_EXT => GL_RGBA8,
        GL_RGB565 => GL_RGB8,
        GL_RGB10_A2UI => GL_RGBA16UI,
        other => other,
    }
}

fn rewrite_format(format: u32) -> u32 {
    match format {
        GL_LUMINANCE | GL_ALPHA => GL_RED,
        GL_LUMINANCE_ALPHA => GL_RG,
        other => other,
    }
}

fn rewrite_component_type(ty: u32) -> u32 {
    if ty == GL_HALF_FLOAT_OES {
        GL_HALF_FLOAT
    } else {
        ty
    }
}

fn compose(compat: SwizzleChannel, user: SwizzleChannel) -> SwizzleChannel {
    // `user` selects a channel of the *apparent* (pre-compat) texture; follow
    // it through the compat remap to the real stored channel.
    match user {
        SwizzleChannel::Red => compat,
        SwizzleChannel::Green => compat,
        SwizzleChannel::Blue => compat,
        SwizzleChannel::Alpha => compat,
        SwizzleChannel::One | SwizzleChannel::Zero => user,
    }
}

fn swizzle_field(s: &Swizzle, channel: SwizzleChannel) -> SwizzleChannel {
    match channel {
        SwizzleChannel::Red => s.r,
        SwizzleChannel::Green => s.g,
        SwizzleChannel::Blue => s.b,
        SwizzleChannel::Alpha => s.a,
        other => other,
    }
}

#[derive(Default)]
pub struct TextureFormatCompat {
    orig_swizzle: FastHashMap<(TextureId, SwizzleParam), SwizzleChannel>,
}

impl TextureFormatCompat {
    pub fn new() -> Self {
        Self::default()
    }

    fn rewrite_desc(&self, desc: &TexImageDesc) -> (TexImageDesc, Option<Swizzle>) {
        let mut out = *desc;
        out.target = out.target.normalized();

        let mut installed_swizzle = None;
        if is_la_family(out.internal_format) {
            installed_swizzle = Some(la_compat_swizzle(out.internal_format));
            out.internal_format = match out.internal_format {
                GL_LUMINANCE_ALPHA => GL_RG8,
                _ => GL_R8,
            };
        } else {
            out.internal_format = substitute_internal_format(out.internal_format);
        }
        out.format = rewrite_format(out.format);
        out.component_type = rewrite_component_type(out.component_type);
        (out, installed_swizzle)
    }

    /// Emits the four `glTexParameteri(SWIZZLE_{R,G,B,A}, ...)` calls needed
    /// to make a freshly-rewritten LA-family texture sample as if it still
    /// held its original format (spec §8 scenario 3), composing the newly
    /// installed compat swizzle with whatever swizzle the app had already
    /// requested on this texture.
    fn emit_swizzle_commands(
        &self,
        out: &mut Writer<'_>,
        id: CmdId,
        thread: crate::ids::ThreadId,
        target: TextureTarget,
        texture: TextureId,
        compat: Swizzle,
    ) -> Result<()> {
        let mut seq = 0u32;
        for param in [
            SwizzleParam::SwizzleR,
            SwizzleParam::SwizzleG,
            SwizzleParam::SwizzleB,
            SwizzleParam::SwizzleA,
        ] {
            let user = self
                .orig_swizzle
                .get(&(texture, param))
                .copied()
                .unwrap_or_else(|| channel_for(param));
            let composed = compose(swizzle_field(&compat, channel_for(param)), user);
            out.mutate_and_write(
                id.derive(next(&mut seq)),
                Cmd::new(thread, GlCommand::TexParameterSwizzle { target, param, value: composed }),
            )?;
        }
        Ok(())
    }
}

fn next(seq: &mut u32) -> u32 {
    *seq += 1;
    *seq
}

impl Transformer for TextureFormatCompat {
    fn transform(&mut self, id: CmdId, cmd: Cmd, out: &mut Writer<'_>) -> Result<()> {
        match &cmd.kind {
            GlCommand::TexImage2D(desc) => {
                let (new_desc, swizzle) = self.rewrite_desc(desc);
                let target = new_desc.target;
                let thread = cmd.thread;
                let texture = out
                    .state()
                    .gles
                    .current()
                    .map(|c| c.bound.texture_2d[c.bound.texture_unit as usize])
                    .unwrap_or_default();
                let rewritten = Cmd { kind: GlCommand::TexImage2D(new_desc), ..cmd };
                out.mutate_and_write(id, rewritten)?;
                if let Some(sw) = swizzle {
                    if let Some(ctx) = out.state().gles.current() {
                        if let Some(tex) = ctx.shared.borrow_mut().textures.get_mut(texture) {
                            tex.swizzle = sw;
                        }
                    }
                    self.emit_swizzle_commands(out, id, thread, target, texture, sw)?;
                }
                Ok(())
            }
            GlCommand::TexStorage2D { target, levels, internal_format, width, height } => {
                let normalized_target = target.normalized();
                let (rewritten_format, swizzle) = if is_la_family(*internal_format) {
                    let sw = la_compat_swizzle(*internal_format);
                    let fmt = if *internal_format == GL_LUMINANCE_ALPHA { GL_RG8 } else { GL_R8 };
                    (fmt, Some(sw))
                } else {
                    (substitute_internal_format(*internal_format), None)
                };
                let thread = cmd.thread;
                let texture = out
                    .state()
                    .gles
                    .current()
                    .map(|c| c.bound.texture_2d[c.bound.texture_unit as usize])
                    .unwrap_or_default();
                let rewritten = Cmd {
                    kind: GlCommand::TexStorage2D {
                        target: normalized_target,
                        levels: *levels,
                        internal_format: rewritten_format,
                        width: *width,
                        height: *height,
                    },
                    ..cmd
                };
                out.mutate_and_write(id, rewritten)?;
                if let Some(sw) = swizzle {
                    if let Some(ctx) = out.state().gles.current() {
                        if let Some(tex) = ctx.shared.borrow_mut().textures.get_mut(texture) {
                            tex.swizzle = sw;
                        }
                    }
                    self.emit_swizzle_commands(out, id, thread, normalized_target, texture, sw)?;
                }
                Ok(())
            }
            GlCommand::TexParameterSwizzle { target, param, value } => {
                let texture = out
                    .state()
                    .gles
                    .current()
                    .map(|c| c.bound.texture_2d[c.bound.texture_unit as usize])
                    .unwrap_or_default();
                self.orig_swizzle.insert((texture, *param), *value);

                let compat = out
                    .state()
                    .gles
                    .current()
                    .and_then(|c| c.shared.borrow().textures.get(texture).map(|t| t.swizzle))
                    .unwrap_or_default();
                let composed_channel = compose(swizzle_field(&compat, channel_for(*param)), *value);
                let rewritten = Cmd {
                    kind: GlCommand::TexParameterSwizzle { target: *target, param: *param, value: composed_channel },
                    ..cmd
                };
                out.mutate_and_write(id, rewritten)
            }
            _ => out.mutate_and_write(id, cmd),
        }
    }
}

fn channel_for(param: SwizzleParam) -> SwizzleChannel {
    match param {
        SwizzleParam::SwizzleR => SwizzleChannel::Red,
        SwizzleParam::SwizzleG => SwizzleChannel::Green,
        SwizzleParam::SwizzleB => SwizzleChannel::Blue,
        SwizzleParam::SwizzleA => SwizzleChannel::Alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_rewrites_to_r8_red() {
        let desc = TexImageDesc {
            target: TextureTarget::Texture2D,
            level: 0,
            internal_format: GL_LUMINANCE,
            width: 4,
            height: 4,
            format: GL_LUMINANCE,
            component_type: 0x1401,
            data: crate::memory::Pointer::NULL,
        };
        let compat = TextureFormatCompat::new();
        let (rewritten, swizzle) = compat.rewrite_desc(&desc);
        assert_eq!(rewritten.internal_format, GL_R8);
        assert_eq!(rewritten.format, GL_RED);
        let sw = swizzle.unwrap();
        assert_eq!(sw.r, SwizzleChannel::Red);
        assert_eq!(sw.a, SwizzleChannel::One);
    }

    #[test]
    fn bgra_substitutes_to_rgba8() {
        assert_eq!(substitute_internal_format(GL_BGRA_EXT), GL_RGBA8);
    }
}
