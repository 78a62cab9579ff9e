//! The viewer's Init, Update, Draw and End phases.

use fast3d::util::Matrixf;
use n64_sys::{
    asset::AssetStore,
    dfs::{RomImage, DEFAULT_MOUNT_POINT},
    display::{BitDepth, DisplayConfig, Filter, Gamma, RESOLUTION_320X240},
    joypad::ControllerSource,
    Block, Display, Joypad, JoypadPort, Rdram, RspQueue,
};
use t3d::{deg_to_rad, FixedMatrix, Model, Vec3, Viewport, T3d};
use tracing::{debug, info};

use crate::{animation::AnimationState, ViewerError};

pub const MODEL_PATH: &str = "rom:/n64.t3dm";
/// Compression level enabled before the filesystem is mounted.
pub const COMPRESSION_LEVEL: u8 = 2;

pub const FOV_DEGREES: f32 = 85.0;
pub const NEAR_PLANE: f32 = 10.0;
pub const FAR_PLANE: f32 = 150.0;

pub const CAM_POSITION: Vec3 = Vec3::new(0.0, 20.0, 40.0);
pub const TARGET_POSITION: Vec3 = Vec3::new(0.0, 0.0, 0.0);
pub const CAM_UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

pub const CLEAR_COLOR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const COLOR_AMBIENT: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
pub const COLOR_DIR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
/// Points towards the light. Normalized during init.
pub const LIGHT_DIR: Vec3 = Vec3::new(-1.0, 1.0, 1.0);

pub fn display_config() -> DisplayConfig {
    DisplayConfig {
        resolution: RESOLUTION_320X240,
        depth: BitDepth::Bpp16,
        num_buffers: 3,
        gamma: Gamma::None,
        filter: Filter::ResampleAntialias,
    }
}

/// The recorded command block for drawing the model.
///
/// The block multiplies by the model matrix through its RDRAM address, so it only needs
/// recording once.
#[derive(Debug, Default)]
pub struct DrawCache {
    block: Option<Block>,
}

impl DrawCache {
    pub fn is_recorded(&self) -> bool {
        self.block.is_some()
    }

    /// Returns the cached block, recording it first if needed.
    pub fn get_or_record(&mut self, record: impl FnOnce() -> Block) -> &Block {
        self.block.get_or_insert_with(record)
    }

    pub fn take(&mut self) -> Option<Block> {
        self.block.take()
    }
}

#[derive(Debug)]
pub struct ViewerApp {
    joypad: Joypad,
    assets: AssetStore,
    rspq: RspQueue,
    t3d: T3d,
    display: Display,
    viewport: Viewport,
    model: Model,
    model_matrix: Matrixf,
    model_matrix_fp: FixedMatrix,
    light_dir: Vec3,
    animation: AnimationState,
    draw_cache: DrawCache,
}

impl ViewerApp {
    /// Brings up every subsystem and loads the model from `rom`, mounted at `rom:/`.
    pub fn init(controller: Box<dyn ControllerSource>, rom: RomImage) -> Result<Self, ViewerError> {
        let joypad = Joypad::init(controller);

        let mut assets = AssetStore::new();
        assets.init_compression(COMPRESSION_LEVEL)?;
        assets.mount(DEFAULT_MOUNT_POINT, rom)?;

        let mut rspq = RspQueue::init(Rdram::default());
        let t3d = T3d::init(&mut rspq)?;
        let display = Display::init(rspq.rdram_mut(), display_config())?;

        let resolution = display.config().resolution;
        let viewport = Viewport::create(&mut rspq, [resolution.width, resolution.height])?;

        let model_matrix = Matrixf::identity();
        let model_matrix_fp = FixedMatrix::alloc(&mut rspq)?;

        let mut light_dir = LIGHT_DIR;
        light_dir.norm();

        let model = Model::load(&mut rspq, &assets, MODEL_PATH)?;
        info!(
            "viewer: loaded {} ({} vertices)",
            MODEL_PATH,
            model.vertex_count()
        );

        Ok(Self {
            joypad,
            assets,
            rspq,
            t3d,
            display,
            viewport,
            model,
            model_matrix,
            model_matrix_fp,
            light_dir,
            animation: AnimationState::new(),
            draw_cache: DrawCache::default(),
        })
    }

    /// Advances the animation by `delta` seconds and rewrites the model matrix.
    pub fn update(&mut self, delta: f32) -> Result<(), ViewerError> {
        self.joypad.poll();
        let inputs = self.joypad.get_inputs(JoypadPort::Port1);
        let pressed = self.joypad.get_buttons_pressed(JoypadPort::Port1);

        let was_paused = self.animation.paused;
        self.animation.advance(delta, inputs.btn, pressed);
        if self.animation.paused != was_paused {
            debug!("viewer: paused = {}", self.animation.paused);
        }

        self.viewport
            .set_projection(deg_to_rad(FOV_DEGREES), NEAR_PLANE, FAR_PLANE);
        self.viewport
            .look_at(&CAM_POSITION, &TARGET_POSITION, &CAM_UP);

        let scale = self.animation.scale;
        let matrix = Matrixf::from_srt_euler(
            [scale, scale, scale],
            self.animation.rotation,
            [0.0, 0.0, 0.0],
        );
        self.write_model_matrix(matrix)
    }

    /// Replaces the model matrix, writing its fixed point form in place.
    pub fn write_model_matrix(&mut self, matrix: Matrixf) -> Result<(), ViewerError> {
        self.model_matrix = matrix;
        self.model_matrix_fp
            .write(&mut self.rspq, &self.model_matrix)?;
        Ok(())
    }

    /// Renders a frame and queues it for display.
    pub fn draw(&mut self) -> Result<(), ViewerError> {
        let surface = self.display.get()?;
        let zbuf = self.display.get_zbuf();
        self.rspq.attach(&surface, Some(&zbuf));

        self.t3d.frame_start(&mut self.rspq);
        self.t3d.viewport_attach(&mut self.rspq, &self.viewport)?;

        self.t3d.screen_clear_color(&mut self.rspq, CLEAR_COLOR);
        self.t3d.screen_clear_depth(&mut self.rspq);

        self.t3d.light_set_ambient(COLOR_AMBIENT);
        self.t3d
            .light_set_directional(&mut self.rspq, 0, COLOR_DIR, &self.light_dir)?;
        self.t3d.light_set_count(&mut self.rspq, 1)?;

        let Self {
            rspq,
            t3d,
            display,
            model,
            model_matrix_fp,
            draw_cache,
            ..
        } = self;
        let block = draw_cache.get_or_record(|| {
            rspq.block_begin();
            t3d.matrix_push(rspq, model_matrix_fp.pointer());
            t3d.model_draw(rspq, model);
            t3d.matrix_pop(rspq, 1);
            rspq.block_end()
        });
        rspq.block_run(block);

        rspq.detach_show(display)?;
        Ok(())
    }

    /// Waits for the next vertical blank and returns the displayed image as rgba8.
    pub fn scanout(&mut self) -> Result<Option<Vec<u8>>, ViewerError> {
        self.display.vblank();
        Ok(self.display.scanout_rgba8(self.rspq.rdram())?)
    }

    /// Tears everything down in reverse order of init.
    pub fn end(mut self) -> Result<(), ViewerError> {
        if let Some(block) = self.draw_cache.take() {
            self.rspq.block_free(block);
        }
        self.t3d.destroy();
        self.display.close();
        self.assets.unmount(DEFAULT_MOUNT_POINT)?;
        self.joypad.close();
        info!("viewer: end");
        Ok(())
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn model_matrix(&self) -> &Matrixf {
        &self.model_matrix
    }

    pub fn draw_cache(&self) -> &DrawCache {
        &self.draw_cache
    }

    pub fn rspq(&self) -> &RspQueue {
        &self.rspq
    }

    pub fn display(&self) -> &Display {
        &self.display
    }
}

#[cfg(test)]
mod test {
    use n64_sys::{joypad::SharedController, JoypadButtons, JoypadInputs};

    use super::*;
    use crate::sample_rom::sample_rom;

    const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

    fn app() -> (ViewerApp, SharedController) {
        let controller = SharedController::new();
        let app = ViewerApp::init(Box::new(controller.clone()), sample_rom().unwrap()).unwrap();
        (app, controller)
    }

    fn center_pixel(app: &mut ViewerApp) -> [u8; 4] {
        let pixels = app.scanout().unwrap().unwrap();
        let resolution = display_config().resolution;
        let i = (((resolution.height / 2) * resolution.width + resolution.width / 2) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    #[test]
    fn test_block_is_recorded_once() {
        let (mut app, _) = app();
        assert!(!app.draw_cache().is_recorded());

        for _ in 0..5 {
            app.update(0.016).unwrap();
            app.draw().unwrap();
        }

        let stats = app.rspq().stats();
        assert!(app.draw_cache().is_recorded());
        assert_eq!(stats.blocks_recorded, 1);
        assert_eq!(stats.blocks_run, 5);
        assert_eq!(app.display().frames_shown(), 5);
    }

    #[test]
    fn test_replay_uses_current_matrix() {
        let (mut app, _) = app();

        app.update(0.0).unwrap();
        app.draw().unwrap();
        assert_ne!(center_pixel(&mut app), WHITE);

        // Move the model behind the camera without re-recording.
        app.write_model_matrix(Matrixf::from_srt_euler(
            [0.1, 0.1, 0.1],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1000.0],
        ))
        .unwrap();
        app.draw().unwrap();
        assert_eq!(center_pixel(&mut app), WHITE);
        assert_eq!(app.rspq().stats().blocks_recorded, 1);
    }

    #[test]
    fn test_start_press_pauses() {
        let (mut app, controller) = app();

        controller.set(JoypadInputs {
            btn: JoypadButtons::START,
            ..Default::default()
        });
        app.update(0.016).unwrap();
        assert!(app.animation().paused);

        // Still held, not a new press.
        app.update(0.016).unwrap();
        assert!(app.animation().paused);

        controller.set(JoypadInputs {
            btn: JoypadButtons::C_LEFT,
            ..Default::default()
        });
        app.update(0.5).unwrap();
        assert!(app.animation().paused);
        // Pausing happens before the advance, so only the held C-left moved Y.
        assert!((app.animation().rotation[1] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_writes_fixed_matrix() {
        let (mut app, _) = app();
        app.update(1.0).unwrap();

        let stored = app.model_matrix_fp.read(&app.rspq).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert!((stored.0[i][j] - app.model_matrix().0[i][j]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_end_releases_everything() {
        let (mut app, _) = app();
        app.update(0.016).unwrap();
        app.draw().unwrap();
        app.end().unwrap();
    }
}
