//! Sets up the window and runs the frame loop.

use std::sync::Arc;

use n64_sys::{dfs::RomImage, joypad::SharedController};
use tracing::{info, warn};
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use crate::{
    app::{display_config, ViewerApp},
    clock::FrameClock,
    input::KeyboardInput,
    present::Presenter,
    Config, ViewerError,
};

/// Opens the window and runs Update and Draw once per frame until it is closed, then
/// runs End.
pub fn open_window_and_run(config: &Config, rom: RomImage) -> Result<(), ViewerError> {
    pollster::block_on(open_window_and_run_impl(config, rom))
}

async fn open_window_and_run_impl(config: &Config, rom: RomImage) -> Result<(), ViewerError> {
    let resolution = display_config().resolution;
    let screen_size = [resolution.width, resolution.height];

    let event_loop = EventLoop::new().map_err(|error| ViewerError::Window(error.to_string()))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title())
            .with_inner_size(PhysicalSize::new(
                screen_size[0] * config.window_scale(),
                screen_size[1] * config.window_scale(),
            ))
            .with_visible(false)
            .build(&event_loop)
            .map_err(|error| ViewerError::Window(error.to_string()))?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });
    let surface = instance
        .create_surface(window.clone())
        .map_err(|error| ViewerError::Gpu(error.to_string()))?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| ViewerError::Gpu("no compatible device".to_string()))?;
    let adapter_info = adapter.get_info();
    info!(
        "GPU: {}, {:?}, {:?}",
        adapter_info.name, adapter_info.device_type, adapter_info.backend
    );

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
            },
            None,
        )
        .await
        .map_err(|error| ViewerError::Gpu(error.to_string()))?;
    device.on_uncaptured_error(Box::new(|error| {
        panic!("wgpu error: {}", error);
    }));

    let output_format = wgpu::TextureFormat::Bgra8Unorm;
    let mut surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: output_format,
        width: window.inner_size().width,
        height: window.inner_size().height,
        present_mode: wgpu::PresentMode::AutoVsync,
        desired_maximum_frame_latency: 2,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: Vec::new(),
    };
    surface.configure(&device, &surface_config);

    let presenter = Presenter::new(
        &device,
        output_format,
        screen_size,
        display_config().filter.is_resampled(),
    );

    let controller = SharedController::new();
    let mut keyboard = KeyboardInput::new();
    let mut app = Some(ViewerApp::init(Box::new(controller.clone()), rom)?);
    let mut clock = FrameClock::new();

    window.set_visible(true);

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::Resized(size) => {
                        surface_config.width = size.width;
                        surface_config.height = size.height;
                        if surface_config.width > 0 && surface_config.height > 0 {
                            surface.configure(&device, &surface_config);
                        }
                    }
                    WindowEvent::CloseRequested => {
                        elwt.exit();
                    }
                    WindowEvent::RedrawRequested => {
                        let Some(app) = app.as_mut() else {
                            return;
                        };

                        let (delta, measured) = clock.tick();
                        if measured {
                            info!("{:.1} fps, {:.3} mspf", clock.fps(), clock.mspf());
                        }

                        controller.set(keyboard.joypad_inputs());
                        handle_err(app.update(delta));
                        handle_err(app.draw());
                        if let Some(pixels) = handle_err(app.scanout()) {
                            presenter.upload(&queue, &pixels);
                        }

                        if surface_config.width > 0 && surface_config.height > 0 {
                            let frame = match surface.get_current_texture() {
                                Ok(frame) => frame,
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    warn!("surface lost, reconfiguring");
                                    surface.configure(&device, &surface_config);
                                    return;
                                }
                                Err(error) => {
                                    handle_err(Err(ViewerError::Gpu(error.to_string())))
                                }
                            };
                            let output_view = frame
                                .texture
                                .create_view(&wgpu::TextureViewDescriptor::default());

                            presenter.render(
                                &device,
                                &queue,
                                &output_view,
                                [surface_config.width, surface_config.height],
                            );
                            frame.present();
                        }
                    }
                    event => keyboard.handle_event(&event),
                },
                Event::AboutToWait => {
                    window.request_redraw();
                }
                Event::LoopExiting => {
                    if let Some(app) = app.take() {
                        handle_err(app.end());
                    }
                }
                _ => {}
            }
        })
        .map_err(|error| ViewerError::Window(error.to_string()))
}

#[track_caller]
pub(crate) fn handle_err<T>(r: Result<T, ViewerError>) -> T {
    match r {
        Ok(v) => v,
        Err(error) => panic!("Error:\n  {}\n", error),
    }
}
