//! Fast3D command decoding.
//!
//! This module provides two methods for decoding commands:
//! - [decode_f3d_command]
//! - [decode_f3d_display_list]
//!
//! Both of these transform [RawF3DCommand]s into [F3DCommand]s. Commands with operands
//! that are out of range decode to [F3DCommand::Unknown].

#![allow(missing_docs)]

use std::fmt;

use crate::cmd::*;

/// A raw Fast3D command for decoding.
///
/// Normally this consists of two 32 bit words, with the latter sometimes representing a
/// memory address. To support pointers that don't fit in 32 bits, a third `w1_ptr` field is
/// included.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawF3DCommand<Ptr> {
    pub w0: u32,
    pub w1: u32,
    pub w1_ptr: Ptr,
}

impl<Ptr> fmt::Debug for RawF3DCommand<Ptr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawF3DCommand {{ w0: {:#010X}, w1: {:#010X} }}",
            self.w0, self.w1
        )
    }
}

impl RawF3DCommand<u32> {
    /// A raw command whose pointer is the w1 word itself.
    pub fn from_words(w0: u32, w1: u32) -> Self {
        Self { w0, w1, w1_ptr: w1 }
    }
}

fn enum_field<T: TryFrom<u8>>(v: u32) -> Option<T> {
    T::try_from(v as u8).ok()
}

/// Decodes a raw Fast3D command.
pub fn decode_f3d_command<Ptr: Copy>(raw_command: RawF3DCommand<Ptr>) -> F3DCommand<Ptr> {
    decode_known(raw_command).unwrap_or(F3DCommand::Unknown(raw_command))
}

fn decode_known<Ptr: Copy>(raw_command: RawF3DCommand<Ptr>) -> Option<F3DCommand<Ptr>> {
    use F3DCommand::*;

    let w0 = raw_command.w0;
    let w1 = raw_command.w1;
    let w1p = raw_command.w1_ptr;
    let cmd = w0 >> 24;

    Some(match cmd {
        0x00 => NoOp,

        // DMA commands
        0x01 => {
            let p = (w0 >> 16) & 0xFF;
            SPMatrix {
                matrix: w1p,
                mode: enum_field(p & 0x01)?,
                op: enum_field(p & 0x02)?,
                push: p & 0x04 != 0,
            }
        }
        0x03 => {
            let p = (w0 >> 16) & 0xFF;
            match p {
                0x80 => SPViewport(w1p),
                0x86..=0x94 if p % 2 == 0 => SPLight {
                    light: w1p,
                    n: (p - 0x86) / 2 + 1,
                },
                _ => return None,
            }
        }
        0x04 => SPVertex {
            v: w1p,
            n: ((w0 >> 20) & 0xF) + 1,
            v0: (w0 >> 16) & 0xF,
        },
        0x06 => {
            let p = (w0 >> 16) & 0xFF;
            match p {
                0 => SPDisplayList(w1p),
                1 => SPBranchList(w1p),
                _ => return None,
            }
        }

        // IMMEDIATE commands
        0xBF => SPOneTriangle {
            v0: ((w1 >> 16) & 0xFF) / 10,
            v1: ((w1 >> 8) & 0xFF) / 10,
            v2: (w1 & 0xFF) / 10,
            flag: w1 >> 24,
        },
        0xBD => SPPopMatrix(enum_field(w1 & 0x01)?),
        0xBC => match w0 & 0xFF {
            2 => SPNumLights((w1.checked_sub(0x8000_0000)? / 0x20).checked_sub(1)?),
            _ => return None,
        },
        0xBA => {
            let shift = (w0 >> 8) & 0xFF;
            match shift {
                20 => DPSetCycleType(enum_field((w1 >> shift) & 0x3)?),
                _ => return None,
            }
        }
        0xB8 => SPEndDisplayList,
        0xB7 => SPSetGeometryMode(GeometryModes::from_bits_truncate(w1)),
        0xB6 => SPClearGeometryMode(GeometryModes::from_bits_truncate(w1)),

        // RDP commands
        0xFF => DPSetColorImage(Image {
            fmt: enum_field((w0 >> 21) & 0x7)?,
            size: enum_field((w0 >> 19) & 0x3)?,
            width: (w0 & 0xFFF) + 1,
            img: w1p,
        }),
        0xFE => DPSetDepthImage(w1p),
        0xFC => {
            let cc1 = [
                ((w0 >> 20) & 0xF) as u8,
                ((w1 >> 28) & 0xF) as u8,
                ((w0 >> 15) & 0x1F) as u8,
                ((w1 >> 15) & 0x7) as u8,
            ];
            let ac1 = [
                ((w0 >> 12) & 0x7) as u8,
                ((w1 >> 12) & 0x7) as u8,
                ((w0 >> 9) & 0x7) as u8,
                ((w1 >> 9) & 0x7) as u8,
            ];
            let cc2 = [
                ((w0 >> 5) & 0xF) as u8,
                ((w1 >> 24) & 0xF) as u8,
                (w0 & 0x1F) as u8,
                ((w1 >> 6) & 0x7) as u8,
            ];
            let ac2 = [
                ((w1 >> 21) & 0x7) as u8,
                ((w1 >> 3) & 0x7) as u8,
                ((w1 >> 18) & 0x7) as u8,
                (w1 & 0x7) as u8,
            ];
            DPSetCombineMode(CombineMode {
                color1: cc1.into(),
                alpha1: ac1.into(),
                color2: cc2.into(),
                alpha2: ac2.into(),
            })
        }
        0xFB => DPSetEnvColor(Rgba32::from_u32(w1)),
        0xFA => DPSetPrimColor(Rgba32::from_u32(w1)),
        0xF7 => DPSetFillColor([
            FillColor((w1 >> 16) as u16),
            FillColor((w1 & 0xFFFF) as u16),
        ]),
        0xF6 => DPFillRectangle(Rectangle {
            ulx: (w1 >> 14) & 0x3FF,
            uly: (w1 >> 2) & 0x3FF,
            lrx: (w0 >> 14) & 0x3FF,
            lry: (w0 >> 2) & 0x3FF,
        }),
        0xED => DPSetScissor(
            enum_field((w1 >> 24) & 0xFF)?,
            Rectangle {
                ulx: ((w0 >> 12) & 0xFFF) as u16,
                uly: (w0 & 0xFFF) as u16,
                lrx: ((w1 >> 12) & 0xFFF) as u16,
                lry: (w1 & 0xFFF) as u16,
            },
        ),
        0xE9 => DPFullSync,
        0xE7 => DPPipeSync,
        _ => return None,
    })
}

/// Decodes a stream of [RawF3DCommand]s into a stream of [F3DCommand]s.
///
/// The stream ends after [F3DCommand::SPEndDisplayList] or [F3DCommand::SPBranchList].
pub fn decode_f3d_display_list<Ptr, E, I: Iterator<Item = Result<RawF3DCommand<Ptr>, E>>>(
    raw_dl: I,
) -> F3DCommandIter<I> {
    F3DCommandIter {
        raw_dl,
        ended: false,
    }
}

#[derive(Debug)]
pub struct F3DCommandIter<I> {
    raw_dl: I,
    ended: bool,
}

impl<Ptr, E, I> Iterator for F3DCommandIter<I>
where
    Ptr: Copy,
    I: Iterator<Item = Result<RawF3DCommand<Ptr>, E>>,
{
    type Item = Result<F3DCommand<Ptr>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ended {
            return None;
        }

        let cmd = self.raw_dl.next()?.map(decode_f3d_command);

        if matches!(
            cmd,
            Ok(F3DCommand::SPEndDisplayList | F3DCommand::SPBranchList(..)) | Err(_)
        ) {
            self.ended = true;
        }

        Some(cmd)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode(w0: u32, w1: u32) -> F3DCommand<u32> {
        decode_f3d_command(RawF3DCommand::from_words(w0, w1))
    }

    #[test]
    fn test_decode_matrix() {
        assert_eq!(
            decode(0x0105_0040, 0x1000),
            F3DCommand::SPMatrix {
                matrix: 0x1000,
                mode: MatrixMode::Proj,
                op: MatrixOp::Mul,
                push: true,
            }
        );
        assert_eq!(
            decode(0x0102_0040, 0x2000),
            F3DCommand::SPMatrix {
                matrix: 0x2000,
                mode: MatrixMode::ModelView,
                op: MatrixOp::Load,
                push: false,
            }
        );
    }

    #[test]
    fn test_decode_vertex_and_triangle() {
        assert_eq!(
            decode(0x04F2_0100, 0x40),
            F3DCommand::SPVertex {
                v: 0x40,
                n: 16,
                v0: 2,
            }
        );
        assert_eq!(
            decode(0xBF00_0000, 0x000A_141E),
            F3DCommand::SPOneTriangle {
                v0: 1,
                v1: 2,
                v2: 3,
                flag: 0,
            }
        );
    }

    #[test]
    fn test_decode_lights() {
        assert_eq!(decode(0xBC00_0002, 0x8000_0040), F3DCommand::SPNumLights(1));
        assert_eq!(
            decode(0x0388_0010, 0x300),
            F3DCommand::SPLight { light: 0x300, n: 2 }
        );
        assert!(matches!(
            decode(0xBC00_0002, 0x10),
            F3DCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_decode_invalid_fields_are_unknown() {
        // 0x7 is not a valid image format.
        assert!(matches!(
            decode(0xFFE8_013F, 0x1000),
            F3DCommand::Unknown(_)
        ));
        assert!(matches!(decode(0x0680_0000, 0), F3DCommand::Unknown(_)));
    }

    #[test]
    fn test_display_list_ends() {
        let raw = vec![
            Ok::<_, ()>(RawF3DCommand::from_words(0xE700_0000, 0)),
            Ok(RawF3DCommand::from_words(0xB800_0000, 0)),
            Ok(RawF3DCommand::from_words(0xE900_0000, 0)),
        ];
        let cmds: Vec<_> = decode_f3d_display_list(raw.into_iter())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            cmds,
            vec![F3DCommand::DPPipeSync, F3DCommand::SPEndDisplayList]
        );
    }
}
