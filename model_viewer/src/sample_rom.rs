//! The filesystem image used when no ROM file is configured.

use n64_sys::dfs::{RomBuilder, RomImage};
use t3d::{ModelBuilder, ModelVertex};

use crate::ViewerError;

/// File name of the model inside the image.
pub const MODEL_FILE: &str = "n64.t3dm";
/// Compression level the model is stored with.
pub const MODEL_LEVEL: u8 = 2;

const HALF_SIZE: i16 = 150;

/// Face normal, corner signs (counterclockwise seen from outside) and color.
type Face = ([i8; 3], [[i16; 3]; 4], [u8; 4]);

const FACES: [Face; 6] = [
    (
        [0, 0, 127],
        [[-1, -1, 1], [1, -1, 1], [1, 1, 1], [-1, 1, 1]],
        [0xE0, 0x20, 0x20, 0xFF],
    ),
    (
        [0, 0, -127],
        [[1, -1, -1], [-1, -1, -1], [-1, 1, -1], [1, 1, -1]],
        [0x20, 0xA0, 0x40, 0xFF],
    ),
    (
        [127, 0, 0],
        [[1, -1, 1], [1, -1, -1], [1, 1, -1], [1, 1, 1]],
        [0x20, 0x40, 0xE0, 0xFF],
    ),
    (
        [-127, 0, 0],
        [[-1, -1, -1], [-1, -1, 1], [-1, 1, 1], [-1, 1, -1]],
        [0xF0, 0xC0, 0x20, 0xFF],
    ),
    (
        [0, 127, 0],
        [[-1, 1, 1], [1, 1, 1], [1, 1, -1], [-1, 1, -1]],
        [0x20, 0xC0, 0xC0, 0xFF],
    ),
    (
        [0, -127, 0],
        [[-1, -1, -1], [1, -1, -1], [1, -1, 1], [-1, -1, 1]],
        [0xC0, 0x40, 0xC0, 0xFF],
    ),
];

/// A colored cube centered on the origin.
pub fn cube_model() -> Vec<u8> {
    let mut builder = ModelBuilder::new();
    for (normal, corners, color) in FACES {
        let quad = corners.map(|signs| ModelVertex {
            pos: signs.map(|s| s * HALF_SIZE),
            normal,
        });
        builder.add_quad(color, quad);
    }
    builder.build()
}

pub fn sample_rom() -> Result<RomImage, ViewerError> {
    let bytes = RomBuilder::new()
        .add_file(MODEL_FILE, cube_model(), MODEL_LEVEL)
        .build()?;
    Ok(RomImage::parse(bytes)?)
}

#[cfg(test)]
mod test {
    use n64_sys::{asset::AssetStore, Rdram, RspQueue};
    use t3d::Model;

    use super::*;

    #[test]
    fn test_sample_rom_holds_cube() {
        let rom = sample_rom().unwrap();
        assert_eq!(rom.file_names().collect::<Vec<_>>(), vec![MODEL_FILE]);
        assert_eq!(rom.entry(MODEL_FILE).unwrap().level, MODEL_LEVEL);

        let mut assets = AssetStore::new();
        assets.init_compression(MODEL_LEVEL).unwrap();
        assets.mount("rom:/", rom).unwrap();

        let mut rspq = RspQueue::init(Rdram::new(0x10000));
        let model = Model::load(&mut rspq, &assets, "rom:/n64.t3dm").unwrap();
        assert_eq!(model.vertex_count(), 24);
    }

    #[test]
    fn test_faces_wind_outward() {
        for (normal, corners, _) in FACES {
            let [a, b, c, _] = corners.map(|v| v.map(|s| s as i32));
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let cross = [
                u[1] * v[2] - u[2] * v[1],
                u[2] * v[0] - u[0] * v[2],
                u[0] * v[1] - u[1] * v[0],
            ];
            for i in 0..3 {
                assert_eq!(cross[i].signum(), (normal[i] as i32).signum());
            }
        }
    }
}
