//! The T3DM model format.
//!
//! ```text
//! magic          "T3DM"
//! version        u16 (1)
//! reserved       u16
//! vertex_count   u32
//! command_count  u32
//! vertices       vertex_count * 16 bytes (N64 vertex layout, normals in cn)
//! commands       command_count * { w0 u32, w1 u32 }
//! ```
//!
//! All integers are big endian. In vertex load commands, w1 is a byte offset into the
//! vertex array; loading relocates it to the vertex array's RDRAM address.

use fast3d::{
    cmd::{F3DCommand, Rgba32},
    decode::{decode_f3d_command, RawF3DCommand},
    encode::encode_f3d_command,
    util::Vertex,
};
use indexmap::IndexMap;
use n64_sys::{AssetStore, Pointer, RspQueue};
use tracing::{debug, info};

use crate::{combine_prim_shade, ModelError};

pub const MAGIC: &[u8; 4] = b"T3DM";
pub const VERSION: u16 = 1;

const HEADER_SIZE: usize = 16;
const COMMAND_SIZE: usize = 8;
const VERTEX_CACHE_SIZE: usize = 16;

/// A model loaded into RDRAM, drawn by calling its display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    vertex_addr: u32,
    dl_addr: u32,
    vertex_count: u32,
    command_count: u32,
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

fn validate(cmd: F3DCommand<u32>, raw: [u32; 2], vertex_count: u32) -> Result<(), ModelError> {
    use F3DCommand::*;

    match cmd {
        SPVertex { v, n, v0 } => {
            let in_range = v % Vertex::SIZE as u32 == 0
                && v / Vertex::SIZE as u32 + n <= vertex_count
                && (v0 + n) as usize <= VERTEX_CACHE_SIZE;
            if in_range {
                Ok(())
            } else {
                Err(ModelError::VertexOutOfRange {
                    offset: v,
                    count: n,
                })
            }
        }
        NoOp
        | SPOneTriangle { .. }
        | SPSetGeometryMode(_)
        | SPClearGeometryMode(_)
        | DPSetCombineMode(_)
        | DPSetPrimColor(_)
        | DPSetEnvColor(_)
        | DPPipeSync
        | SPEndDisplayList => Ok(()),
        _ => Err(ModelError::UnsupportedCommand(raw)),
    }
}

impl Model {
    /// Loads a model file from the asset store into RDRAM.
    pub fn load(rspq: &mut RspQueue, assets: &AssetStore, path: &str) -> Result<Self, ModelError> {
        let bytes = assets.load(path)?;
        let model = Self::from_bytes(rspq, &bytes)?;
        info!(
            "t3d: loaded {} ({} vertices, {} commands)",
            path, model.vertex_count, model.command_count
        );
        Ok(model)
    }

    pub fn from_bytes(rspq: &mut RspQueue, bytes: &[u8]) -> Result<Self, ModelError> {
        if bytes.get(0..4) != Some(&MAGIC[..]) {
            return Err(ModelError::BadMagic);
        }
        if bytes.len() < HEADER_SIZE {
            return Err(ModelError::Truncated);
        }
        let version = be_u16(&bytes[4..6]);
        if version != VERSION {
            return Err(ModelError::UnsupportedVersion(version));
        }
        let vertex_count = be_u32(&bytes[8..12]);
        let command_count = be_u32(&bytes[12..16]);

        let vertex_len = vertex_count as u64 * Vertex::SIZE as u64;
        let command_len = command_count as u64 * COMMAND_SIZE as u64;
        if HEADER_SIZE as u64 + vertex_len + command_len > bytes.len() as u64 {
            return Err(ModelError::Truncated);
        }
        let (vertex_len, command_len) = (vertex_len as usize, command_len as usize);
        let vertex_data = &bytes[HEADER_SIZE..HEADER_SIZE + vertex_len];
        let command_data = &bytes[HEADER_SIZE + vertex_len..HEADER_SIZE + vertex_len + command_len];

        let mut cmds = Vec::new();
        for words in command_data.chunks_exact(COMMAND_SIZE) {
            let raw = [be_u32(&words[0..4]), be_u32(&words[4..8])];
            let cmd = decode_f3d_command(RawF3DCommand::from_words(raw[0], raw[1]));
            validate(cmd, raw, vertex_count)?;
            cmds.push(cmd);
            if cmd == F3DCommand::SPEndDisplayList {
                break;
            }
        }
        if cmds.last() != Some(&F3DCommand::SPEndDisplayList) {
            cmds.push(F3DCommand::SPEndDisplayList);
        }

        let rdram = rspq.rdram_mut();
        let vertex_addr = rdram.alloc_uncached(vertex_len.max(Vertex::SIZE))?;
        rdram.write_u8s(vertex_addr, vertex_data)?;

        let dl_addr = rdram.alloc(cmds.len() * COMMAND_SIZE, 8)?;
        let words: Vec<u32> = cmds
            .iter()
            .flat_map(|cmd| encode_f3d_command(cmd.map_ptr(|offset| vertex_addr + offset)))
            .collect();
        rdram.write_u32s(dl_addr, &words)?;
        debug!(
            "t3d: model vertices at {:#010X}, display list at {:#010X}",
            vertex_addr, dl_addr
        );

        Ok(Self {
            vertex_addr,
            dl_addr,
            vertex_count,
            command_count: cmds.len() as u32,
        })
    }

    pub fn display_list(&self) -> Pointer {
        Pointer::Rdram(self.dl_addr)
    }

    pub fn vertex_addr(&self) -> u32 {
        self.vertex_addr
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// The number of commands in the display list, including the final end command.
    pub fn command_count(&self) -> u32 {
        self.command_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelVertex {
    pub pos: [i16; 3],
    pub normal: [i8; 3],
}

impl ModelVertex {
    fn to_vertex(self) -> Vertex {
        let [nx, ny, nz] = self.normal;
        Vertex {
            pos: self.pos,
            cn: [nx as u8, ny as u8, nz as u8, 0xFF],
            ..Default::default()
        }
    }
}

/// Vertices loaded together, and triangles indexing them.
#[derive(Debug, Default)]
struct Batch {
    vertices: Vec<ModelVertex>,
    tris: Vec<[u32; 3]>,
}

impl Batch {
    fn fits(&self, tri: &[ModelVertex; 3]) -> bool {
        let mut new: Vec<&ModelVertex> = Vec::new();
        for v in tri {
            if !self.vertices.contains(v) && !new.contains(&v) {
                new.push(v);
            }
        }
        self.vertices.len() + new.len() <= VERTEX_CACHE_SIZE
    }

    fn add(&mut self, tri: &[ModelVertex; 3]) {
        let indices = tri.map(|v| match self.vertices.iter().position(|&u| u == v) {
            Some(i) => i as u32,
            None => {
                self.vertices.push(v);
                self.vertices.len() as u32 - 1
            }
        });
        self.tris.push(indices);
    }

    fn flush(&mut self, vertices: &mut Vec<Vertex>, cmds: &mut Vec<F3DCommand<u32>>) {
        if self.tris.is_empty() {
            return;
        }
        cmds.push(F3DCommand::SPVertex {
            v: (vertices.len() * Vertex::SIZE) as u32,
            n: self.vertices.len() as u32,
            v0: 0,
        });
        vertices.extend(self.vertices.drain(..).map(ModelVertex::to_vertex));
        for [v0, v1, v2] in self.tris.drain(..) {
            cmds.push(F3DCommand::SPOneTriangle {
                v0,
                v1,
                v2,
                flag: 0,
            });
        }
    }
}

/// Builds T3DM model files from triangles.
///
/// Triangles are grouped by color, and each color is drawn as the primitive color with
/// the lit shade color applied on top.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    materials: IndexMap<[u8; 4], Vec<[ModelVertex; 3]>>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triangle with counterclockwise winding when seen from the front.
    pub fn add_triangle(&mut self, color: [u8; 4], tri: [ModelVertex; 3]) -> &mut Self {
        self.materials.entry(color).or_default().push(tri);
        self
    }

    /// Adds a quad as the triangles (0, 1, 2) and (0, 2, 3).
    pub fn add_quad(&mut self, color: [u8; 4], quad: [ModelVertex; 4]) -> &mut Self {
        let [a, b, c, d] = quad;
        self.add_triangle(color, [a, b, c]);
        self.add_triangle(color, [a, c, d])
    }

    pub fn build(&self) -> Vec<u8> {
        let mut vertices = Vec::new();
        let mut cmds = vec![
            F3DCommand::DPPipeSync,
            F3DCommand::DPSetCombineMode(combine_prim_shade()),
        ];

        for (&[r, g, b, a], tris) in &self.materials {
            cmds.push(F3DCommand::DPSetPrimColor(Rgba32::new(r, g, b, a)));
            let mut batch = Batch::default();
            for tri in tris {
                if !batch.fits(tri) {
                    batch.flush(&mut vertices, &mut cmds);
                }
                batch.add(tri);
            }
            batch.flush(&mut vertices, &mut cmds);
        }

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(vertices.len() as u32).to_be_bytes());
        out.extend_from_slice(&(cmds.len() as u32).to_be_bytes());
        for v in &vertices {
            out.extend_from_slice(&v.to_bytes());
        }
        for cmd in cmds {
            for w in encode_f3d_command(cmd) {
                out.extend_from_slice(&w.to_be_bytes());
            }
        }
        out
    }
}
