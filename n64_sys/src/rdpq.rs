//! RDP surface attachment and frame submission.

use fast3d::{
    cmd::{F3DCommand, Image, ImageFormat, Rectangle, ScissorMode},
    interpret::interpret_f3d_display_list,
};
use tracing::trace;

use crate::{display::Surface, raster, Display, Pointer, RspQueue, SysError};

impl RspQueue {
    /// Directs subsequent rendering to `color`, with an optional depth buffer.
    pub fn attach(&mut self, color: &Surface, depth: Option<&Surface>) {
        assert!(
            self.attached.is_none(),
            "rdpq_attach: a surface is already attached"
        );
        assert!(
            !self.is_recording(),
            "rdpq_attach: cannot attach while recording a block"
        );

        self.submit(F3DCommand::DPSetColorImage(Image {
            fmt: ImageFormat::Rgba,
            size: color.format.component_size(),
            width: color.width,
            img: Pointer::Rdram(color.addr),
        }));
        if let Some(depth) = depth {
            self.submit(F3DCommand::DPSetDepthImage(Pointer::Rdram(depth.addr)));
        }
        self.submit(F3DCommand::DPSetScissor(
            ScissorMode::NonInterlace,
            Rectangle {
                ulx: 0,
                uly: 0,
                lrx: (color.width * 4) as u16,
                lry: (color.height * 4) as u16,
            },
        ));
        self.attached = Some(*color);
        self.attached_depth = depth.copied();
    }

    /// Renders the frame's queued commands into the attached surface, then hands it to
    /// the display.
    pub fn detach_show(&mut self, display: &mut Display) -> Result<(), SysError> {
        let surface = self
            .attached
            .take()
            .expect("rdpq_detach_show: no surface is attached");
        self.attached_depth = None;
        self.submit(F3DCommand::DPFullSync);

        let render_data = interpret_f3d_display_list(&*self, [surface.width, surface.height]);
        let cmds = self.take_frame();
        let render_data = render_data?;
        trace!(
            "rdpq: {} queued commands, {} render commands",
            cmds.len(),
            render_data.commands.len()
        );

        raster::execute(&mut self.rdram, &render_data)?;
        display.show(surface)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use fast3d::cmd::{CycleType, FillColor};

    use super::*;
    use crate::{
        display::{BitDepth, DisplayConfig, Filter, Gamma, Resolution},
        Rdram,
    };

    #[test]
    fn test_fill_frame_and_show() {
        let mut rdram = Rdram::new(0x10000);
        let mut display = Display::init(
            &mut rdram,
            DisplayConfig {
                resolution: Resolution {
                    width: 8,
                    height: 4,
                },
                depth: BitDepth::Bpp16,
                num_buffers: 2,
                gamma: Gamma::None,
                filter: Filter::Resample,
            },
        )
        .unwrap();
        let mut rspq = RspQueue::init(rdram);

        let surface = display.get().unwrap();
        rspq.attach(&surface, None);
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::Fill));
        rspq.submit(F3DCommand::DPSetFillColor([FillColor(0x07C1); 2]));
        rspq.submit(F3DCommand::DPFillRectangle(Rectangle {
            ulx: 0,
            uly: 0,
            lrx: 7,
            lry: 3,
        }));
        rspq.detach_show(&mut display).unwrap();

        assert_eq!(rspq.attached_color(), None);
        assert_eq!(rspq.stats().frames_flushed, 1);
        assert_eq!(display.frames_shown(), 1);

        display.vblank();
        let pixels = display.scanout_rgba8(rspq.rdram()).unwrap().unwrap();
        assert_eq!(&pixels[28..32], &[0, 0xFF, 0, 0xFF]);
    }

    #[test]
    #[should_panic]
    fn test_detach_without_attach() {
        let mut rdram = Rdram::new(0x10000);
        let mut display = Display::init(
            &mut rdram,
            DisplayConfig {
                resolution: Resolution {
                    width: 8,
                    height: 4,
                },
                depth: BitDepth::Bpp16,
                num_buffers: 1,
                gamma: Gamma::None,
                filter: Filter::Disabled,
            },
        )
        .unwrap();
        let mut rspq = RspQueue::init(rdram);
        let _ = rspq.detach_show(&mut display);
    }
}
