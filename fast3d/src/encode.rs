//! Fast3D command encoding, the inverse of [crate::decode].
//!
//! Pointer operands are written directly into w1, so commands are encoded from
//! `F3DCommand<u32>`. Use [F3DCommand::map_ptr] to convert pointers first.

use crate::cmd::*;

/// Encodes a command into its two 32 bit words.
pub fn encode_f3d_command(cmd: F3DCommand<u32>) -> [u32; 2] {
    use F3DCommand::*;

    match cmd {
        NoOp => [0, 0],
        Unknown(raw) => [raw.w0, raw.w1],

        SPMatrix {
            matrix,
            mode,
            op,
            push,
        } => {
            let p = u8::from(mode) as u32 | u8::from(op) as u32 | if push { 0x04 } else { 0 };
            [0x0100_0040 | p << 16, matrix]
        }
        SPViewport(vp) => [0x0380_0010, vp],
        SPLight { light, n } => {
            let p = 0x86 + 2 * n.saturating_sub(1);
            [0x0300_0010 | (p & 0xFF) << 16, light]
        }
        SPVertex { v, n, v0 } => {
            let w0 = 0x04 << 24
                | (n.saturating_sub(1) & 0xF) << 20
                | (v0 & 0xF) << 16
                | (n * 16) & 0xFFFF;
            [w0, v]
        }
        SPDisplayList(dl) => [0x0600_0000, dl],
        SPBranchList(dl) => [0x0601_0000, dl],
        SPOneTriangle { v0, v1, v2, flag } => {
            let index = |v: u32| (v * 10) & 0xFF;
            [
                0xBF00_0000,
                flag << 24 | index(v0) << 16 | index(v1) << 8 | index(v2),
            ]
        }
        SPPopMatrix(mode) => [0xBD00_0000, u8::from(mode) as u32],
        SPNumLights(n) => [0xBC00_0002, 0x8000_0000 + (n + 1) * 0x20],
        SPEndDisplayList => [0xB800_0000, 0],
        SPSetGeometryMode(mode) => [0xB700_0000, mode.bits()],
        SPClearGeometryMode(mode) => [0xB600_0000, mode.bits()],

        DPSetCycleType(cycle_type) => [0xBA00_1402, (u8::from(cycle_type) as u32) << 20],
        DPSetColorImage(image) => {
            let w0 = 0xFF << 24
                | (u8::from(image.fmt) as u32 & 0x7) << 21
                | (u8::from(image.size) as u32 & 0x3) << 19
                | (image.width.saturating_sub(1) & 0xFFF);
            [w0, image.img]
        }
        DPSetDepthImage(img) => [0xFE00_0000, img],
        DPSetCombineMode(mode) => encode_combine_mode(mode),
        DPSetEnvColor(color) => [0xFB00_0000, color.to_u32()],
        DPSetPrimColor(color) => [0xFA00_0000, color.to_u32()],
        DPSetFillColor([hi, lo]) => [0xF700_0000, (hi.0 as u32) << 16 | lo.0 as u32],
        DPFillRectangle(rect) => [
            0xF6 << 24 | (rect.lrx & 0x3FF) << 14 | (rect.lry & 0x3FF) << 2,
            (rect.ulx & 0x3FF) << 14 | (rect.uly & 0x3FF) << 2,
        ],
        DPSetScissor(mode, rect) => [
            0xED << 24 | (rect.ulx as u32 & 0xFFF) << 12 | (rect.uly as u32 & 0xFFF),
            (u8::from(mode) as u32) << 24
                | (rect.lrx as u32 & 0xFFF) << 12
                | (rect.lry as u32 & 0xFFF),
        ],
        DPFullSync => [0xE900_0000, 0],
        DPPipeSync => [0xE700_0000, 0],
    }
}

/// Combiner slots have different widths, and each width has its own encoding of zero.
fn slot(c: ColorCombineComponent, bits: u32) -> u32 {
    let mask = (1 << bits) - 1;
    if c == ColorCombineComponent::Zero {
        mask
    } else {
        u8::from(c) as u32 & mask
    }
}

fn encode_combine_mode(mode: CombineMode) -> [u32; 2] {
    let [a_c1, b_c1, c_c1, d_c1] = mode.color1.args;
    let [a_a1, b_a1, c_a1, d_a1] = mode.alpha1.args;
    let [a_c2, b_c2, c_c2, d_c2] = mode.color2.args;
    let [a_a2, b_a2, c_a2, d_a2] = mode.alpha2.args;

    let w0 = 0xFC << 24
        | slot(a_c1, 4) << 20
        | slot(c_c1, 5) << 15
        | slot(a_a1, 3) << 12
        | slot(c_a1, 3) << 9
        | slot(a_c2, 4) << 5
        | slot(c_c2, 5);
    let w1 = slot(b_c1, 4) << 28
        | slot(b_c2, 4) << 24
        | slot(a_a2, 3) << 21
        | slot(c_a2, 3) << 18
        | slot(d_c1, 3) << 15
        | slot(b_a1, 3) << 12
        | slot(d_a1, 3) << 9
        | slot(d_c2, 3) << 6
        | slot(b_a2, 3) << 3
        | slot(d_a2, 3);
    [w0, w1]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::{decode_f3d_command, RawF3DCommand};

    fn reencode(cmd: F3DCommand<u32>) -> F3DCommand<u32> {
        let [w0, w1] = encode_f3d_command(cmd);
        decode_f3d_command(RawF3DCommand::from_words(w0, w1))
    }

    #[test]
    fn test_geometry_commands() {
        let cmds = [
            F3DCommand::SPMatrix {
                matrix: 0x8000,
                mode: MatrixMode::ModelView,
                op: MatrixOp::Mul,
                push: true,
            },
            F3DCommand::SPVertex {
                v: 0x1230,
                n: 12,
                v0: 0,
            },
            F3DCommand::SPOneTriangle {
                v0: 15,
                v1: 0,
                v2: 7,
                flag: 0,
            },
            F3DCommand::SPLight { light: 0x40, n: 3 },
            F3DCommand::SPNumLights(2),
            F3DCommand::SPPopMatrix(MatrixMode::ModelView),
        ];
        for cmd in cmds {
            assert_eq!(reencode(cmd), cmd);
        }
    }

    #[test]
    fn test_fill_commands() {
        let rect = F3DCommand::DPFillRectangle(Rectangle {
            ulx: 0,
            uly: 0,
            lrx: 319,
            lry: 239,
        });
        assert_eq!(reencode(rect), rect);

        let fill = F3DCommand::DPSetFillColor([FillColor(0xFFFC), FillColor(0xFFFC)]);
        assert_eq!(encode_f3d_command(fill), [0xF700_0000, 0xFFFC_FFFC]);
    }

    #[test]
    fn test_combine_mode_prim_shade() {
        use ColorCombineComponent::*;

        let color = ColorCombineMode {
            args: [Prim, Zero, Shade, Zero],
        };
        let alpha = ColorCombineMode::from(Prim);
        let cmd = F3DCommand::DPSetCombineMode(CombineMode::one_cycle(color, alpha));

        match reencode(cmd) {
            F3DCommand::DPSetCombineMode(mode) => {
                assert_eq!(mode.color1.args[0], Prim);
                assert_eq!(mode.color1.args[2], Shade);
                assert_eq!(mode.color1.args[1], K5);
                assert_eq!(mode.color1.args[3], CombinedAlphaOrNoiseOrK4OrZero);
                assert_eq!(mode.alpha1.args[3], Prim);
                assert_eq!(mode.color2, mode.color1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
