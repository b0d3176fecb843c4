use std::time::Instant;

use anyhow::{Context, Result};
use winit::event::WindowEvent;

use kiln_engine::coords::Viewport;
use kiln_engine::core::{App, AppControl, FrameCtx};
use kiln_engine::device::Gpu;
use kiln_engine::gfx::Renderer;
use kiln_engine::gfx::api::{Call, GraphicsApi, RecordingApi};
use kiln_engine::gfx::param::ParamError;
use kiln_engine::gfx::wgpu_backend::WgpuApi;
use kiln_engine::input::{InputState, Key};
use kiln_engine::time::FpsCounter;

use crate::camera::Camera;
use crate::config::DemoConfig;
use crate::phase::Phase;
use crate::scene::Scene;
use crate::walker::{Steer, Walker};

const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.12, 1.0];

/// Everything that exists once the arena has loaded.
pub struct World {
    scene: Scene,
    walker: Walker,
    camera: Camera,
}

impl World {
    fn load(api: &mut dyn GraphicsApi, config: &DemoConfig, size: (u32, u32)) -> Result<Self> {
        let scene = Scene::load(api).context("loading arena scene")?;

        let mut camera = Camera::default();
        camera.set_viewport_size(size.0, size.1);

        Ok(Self {
            scene,
            walker: Walker::new(config.movement.clone()),
            camera,
        })
    }

    fn advance(&mut self, steer: Steer, elapsed: f32, dt: f32) -> Result<(), ParamError> {
        self.walker.step(steer, dt);
        self.walker.place_camera(&mut self.camera);
        self.scene.update(elapsed, dt, &self.camera)
    }
}

fn steer_from(input: &InputState) -> Steer {
    Steer {
        strafe: input.axis(Key::Q, Key::E),
        forward: input.axis(Key::S, Key::W),
        turn: input.axis(Key::A, Key::D),
    }
}

/// The windowed demo: walk around the arena with W/A/S/D, strafe with Q/E.
pub struct Arena {
    config: DemoConfig,
    renderer: Option<Renderer<WgpuApi>>,
    phase: Phase<World>,
    fps: FpsCounter,
    size: (u32, u32),
}

impl Arena {
    pub fn new(config: DemoConfig) -> Self {
        let size = (config.window.width, config.window.height);
        Self {
            config,
            renderer: None,
            phase: Phase::default(),
            fps: FpsCounter::default(),
            size,
        }
    }

    fn load(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let started = Instant::now();

        let mut renderer = Renderer::new(gpu.graphics_api());
        renderer.set_clear_color(CLEAR_COLOR);
        renderer.set_viewport(Viewport::from_size(self.size.0, self.size.1));

        let world = World::load(renderer.api_mut(), &self.config, self.size)?;
        log::info!("arena loaded in {:.1} ms", started.elapsed().as_secs_f64() * 1000.0);

        self.renderer = Some(renderer);
        self.phase.load(world);
        Ok(())
    }
}

impl App for Arena {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if matches!(event, WindowEvent::CloseRequested) {
            log::info!("close requested");
        }
        AppControl::Continue
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_viewport(Viewport::from_size(width, height));
        }
        if let Some(world) = self.phase.world_mut() {
            world.camera.set_viewport_size(width, height);
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input_frame.key_pressed(Key::Escape) {
            return AppControl::Exit;
        }

        if self.phase.is_loading() {
            if let Err(err) = self.load(ctx.gpu) {
                log::error!("{err:#}");
                return AppControl::Exit;
            }
        }

        match ctx.input_frame.focus_changed {
            Some(true) => self.phase.activate(),
            Some(false) => self.phase.deactivate(),
            None => {}
        }

        let active = self.phase.is_active();
        let (Some(renderer), Some(world)) = (self.renderer.as_mut(), self.phase.world_mut()) else {
            return AppControl::Continue;
        };

        // Inactive keeps drawing the last simulated frame.
        if active {
            if let Err(err) = world.advance(steer_from(ctx.input), ctx.time.elapsed, ctx.time.dt) {
                log::error!("frame update failed: {err}");
                return AppControl::Exit;
            }
        }
        world.scene.render(renderer);

        let control = ctx.render(|target| {
            renderer.api_mut().flush(target.encoder, target.view, target.size);
        });

        if let Some(fps) = self.fps.frame(ctx.time.now) {
            log::debug!("{fps:.1} fps");
            ctx.window.set_title(&format!("{} - {fps:.0} fps", self.config.window.title));
        }

        control
    }
}

/// Native call counts for one headless frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
    pub uploads: usize,
    pub state_changes: usize,
    pub program_switches: usize,
}

impl FrameStats {
    fn from_calls(calls: &[Call]) -> Self {
        let mut stats = Self::default();
        for call in calls {
            match call {
                Call::DrawElements { .. } => stats.draws += 1,
                Call::UploadBuffer { .. } => stats.uploads += 1,
                Call::UseProgram(_) => stats.program_switches += 1,
                c if c.is_state_change() => stats.state_changes += 1,
                _ => {}
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessReport {
    pub frames: Vec<FrameStats>,
    /// Objects deleted when the scene was released.
    pub released: usize,
}

/// Runs the scene against [`RecordingApi`] for `frames` frames at a fixed 60 Hz step,
/// walking forward the whole time.
pub fn run_headless(config: &DemoConfig, frames: u32) -> Result<HeadlessReport> {
    const DT: f32 = 1.0 / 60.0;

    let size = (config.window.width, config.window.height);
    let mut renderer = Renderer::new(RecordingApi::new());
    renderer.set_clear_color(CLEAR_COLOR);
    renderer.set_viewport(Viewport::from_size(size.0, size.1));

    let mut world = World::load(renderer.api_mut(), config, size)?;
    log::info!("headless: scene loaded with {} calls", renderer.api().calls().len());
    renderer.api_mut().clear_calls();

    let steer = Steer {
        forward: 1.0,
        ..Steer::default()
    };

    let mut report = HeadlessReport::default();
    for frame in 0..frames {
        world.advance(steer, (frame + 1) as f32 * DT, DT)?;
        world.scene.render(&mut renderer);

        let stats = FrameStats::from_calls(&renderer.api_mut().take_calls());
        log::debug!("headless frame {frame}: {stats:?}");
        report.frames.push(stats);
    }

    world.scene.release(renderer.api_mut());
    report.released = renderer
        .api()
        .calls()
        .iter()
        .filter(|c| {
            matches!(
                c,
                Call::DeleteBuffer(_) | Call::DeleteProgram(_) | Call::DeleteVertexArray(_)
            )
        })
        .count();

    log::info!(
        "headless: {} frames, walker at {:?}",
        report.frames.len(),
        world.walker.position
    );
    Ok(report)
}
