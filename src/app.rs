//! The interactive viewer: a window, a fixed demo scene and a fly camera.
//!
//! Each redraw moves the camera according to the pressed keys, renders the
//! scene through [`Renderer::render_scene`], encodes the recorded draws into
//! the surface texture and presents it.

use std::{path::PathBuf, rc::Rc, sync::Arc};

use anyhow::Context as _;
use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Vector3};
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::{
    camera::{Camera, CameraController, Projection},
    context::Context,
    data_structures::{
        light::PointLight,
        mesh::{Mesh, Vertex},
        model::Model,
        scene::Scene,
        texture::{Texture, TextureKind},
    },
    device::{GraphicsDevice, gpu::{WgpuDevice, request_device}},
    logging::{LoggingConfig, init_logging},
    render::Renderer,
    resources::{asset_path, load_string},
    shader::ShaderProgram,
};

/// Settings of the viewer window and its demo scene. Paths are relative to `./assets`.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub clear_colour: wgpu::Color,
    /// World units per second.
    pub movement_speed: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub model: PathBuf,
    /// Texture of the demo triangle; the triangle stays untextured when `None`.
    pub triangle_texture: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "scene-ngin".to_string(),
            width: 640,
            height: 480,
            fov_y: 45.0,
            z_near: 0.1,
            z_far: 1000.0,
            clear_colour: wgpu::Color::BLACK,
            movement_speed: 1.0,
            rotation_speed: 40.0,
            vertex_shader: "shaders/vertex.wgsl".into(),
            fragment_shader: "shaders/fragment_texture.wgsl".into(),
            model: "models/cube/cube.obj".into(),
            triangle_texture: Some("textures/checker.png".into()),
            logging: LoggingConfig::default(),
        }
    }
}

const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
    Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
    Vertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0], [0.5, 1.0]),
];
const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

/// A textured triangle on the left, the model on the right and one white light.
fn build_scene(ctx: &Context, config: &ViewerConfig) -> anyhow::Result<Scene> {
    let triangle = Mesh::create(ctx, &TRIANGLE_VERTICES, &TRIANGLE_INDICES)?;
    triangle.material_mut().ambient_color = Vector3::new(0.0, 1.0, 0.0);
    if let Some(path) = &config.triangle_texture {
        match Texture::load(ctx, asset_path(path), TextureKind::Diffuse) {
            Ok(texture) => triangle.add_texture(Rc::new(texture)),
            Err(e) => log::warn!("triangle stays untextured: {}", e),
        }
    }
    let model = Model::create(ctx, asset_path(&config.model))?;

    let mut scene = Scene::new();
    scene.add(
        Rc::new(triangle),
        Matrix4::from_translation(Vector3::new(-1.0, 0.0, 0.0)),
    );
    scene.add(
        Rc::new(model),
        Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)),
    );
    scene.add_light(PointLight::white(Vector3::new(0.0, 0.0, -1.0)));
    Ok(scene)
}

/// Everything that exists once the window does.
struct Viewer {
    // Dropped in declaration order: the wrappers go before the device.
    scene: Scene,
    program: ShaderProgram,
    renderer: Renderer,
    device: Rc<WgpuDevice>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    window: Arc<Window>,
    camera: Camera,
    projection: Projection,
    controller: CameraController,
    clear_colour: wgpu::Color,
}

impl Viewer {
    fn new(
        window: Arc<Window>,
        config: &ViewerConfig,
        runtime: &tokio::runtime::Runtime,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;
        let (adapter, device, queue) = runtime.block_on(request_device(&instance, Some(&surface)))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB target for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no formats on this adapter")?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let device = Rc::new(WgpuDevice::new(device, queue, surface_format));
        let shared: Rc<dyn GraphicsDevice> = device.clone();
        let ctx = Context::from_shared(shared);

        let program = ShaderProgram::create(
            &ctx,
            &load_string(&config.vertex_shader)?,
            &load_string(&config.fragment_shader)?,
        )?;
        let renderer = Renderer::create(&ctx)?;
        let scene = build_scene(&ctx, config)?;

        let camera = Camera::new(
            Point3::new(0.0, 0.0, 3.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let projection = Projection::new(
            size.width,
            size.height,
            Deg(config.fov_y),
            config.z_near,
            config.z_far,
        );
        let controller = CameraController::new(config.movement_speed, config.rotation_speed);

        let mut viewer = Self {
            scene,
            program,
            renderer,
            device,
            surface,
            surface_config,
            is_surface_configured: false,
            window,
            camera,
            projection,
            controller,
            clear_colour: config.clear_colour,
        };
        viewer.resize(size);
        Ok(viewer)
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.surface_config.width = size.width;
            self.surface_config.height = size.height;
            self.surface.configure(self.device.device(), &self.surface_config);
            self.projection.resize(size.width, size.height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, dt: instant::Duration) -> anyhow::Result<()> {
        self.window.request_redraw();
        if !self.is_surface_configured {
            return Ok(());
        }

        self.controller.update_camera(&mut self.camera, dt);
        if let Err(e) = self
            .program
            .set_vec3("viewPos", self.camera.position().to_vec())
        {
            self.program.report_unresolved(&e);
        }

        let output = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                self.resize(self.window.inner_size());
                return Ok(());
            }
            e => return Err(anyhow::anyhow!("could not acquire the surface texture: {e:?}")),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let stats = self.renderer.render_scene(
            &self.scene,
            &mut self.program,
            &self.projection.wgpu_matrix(),
            &self.camera.view_matrix(),
        )?;
        log::trace!("{:?}", stats);

        self.device.submit_frame(
            &view,
            (self.surface_config.width, self.surface_config.height),
            self.clear_colour,
        );
        output.present();
        Ok(())
    }
}

struct App {
    async_runtime: tokio::runtime::Runtime,
    config: ViewerConfig,
    viewer: Option<Viewer>,
    last_time: Instant,
}

impl App {
    fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            viewer: None,
            last_time: Instant::now(),
        })
    }
}

impl ApplicationHandler<()> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create the window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Viewer::new(window, &self.config, &self.async_runtime) {
            Ok(viewer) => {
                viewer.window.request_redraw();
                self.viewer = Some(viewer);
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("viewer initialization failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let viewer = match &mut self.viewer {
            Some(viewer) => viewer,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => viewer.resize(size),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                viewer.controller.handle_key(code, state);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now - self.last_time;
                self.last_time = now;
                if let Err(e) = viewer.render(dt) {
                    log::error!("rendering failed: {:#}", e);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Release scene resources while the device is still alive.
        self.viewer = None;
    }
}

/// Opens the viewer window and blocks until it is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    init_logging(config.logging.clone());

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
