use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

/// How finished frames reach the display.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum SwapMode {
    /// Wait for vertical blank. Supported everywhere.
    #[default]
    Vsync,
    /// Replace the queued frame instead of waiting; no tearing.
    Mailbox,
    /// Present immediately; may tear.
    Immediate,
}

impl SwapMode {
    pub const ALL: [SwapMode; 3] = [SwapMode::Vsync, SwapMode::Mailbox, SwapMode::Immediate];

    fn present_mode(self) -> wgpu::PresentMode {
        match self {
            SwapMode::Vsync => wgpu::PresentMode::Fifo,
            SwapMode::Mailbox => wgpu::PresentMode::Mailbox,
            SwapMode::Immediate => wgpu::PresentMode::Immediate,
        }
    }
}

impl fmt::Display for SwapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SwapMode::Vsync => "vsync",
            SwapMode::Mailbox => "mailbox",
            SwapMode::Immediate => "immediate",
        })
    }
}

impl FromStr for SwapMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SwapMode::ALL
            .into_iter()
            .find(|mode| mode.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown swap mode `{s}`; use vsync, mailbox or immediate"))
    }
}

/// Surface settings chosen by the host before the GPU comes up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInit {
    /// Prefer an sRGB surface format; the composite pass writes linear color.
    pub prefer_srgb: bool,
    /// Falls back to [`SwapMode::Vsync`] when the surface cannot honor it.
    pub swap_mode: SwapMode,
    /// Frames the presentation engine may queue. Clamped to at least 1.
    pub frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            swap_mode: SwapMode::Vsync,
            frame_latency: 2,
        }
    }
}

/// Device, queue and the window surface they present to.
///
/// Device and queue are cloned into the graphics backend; presentation happens
/// when the backend flushes a frame.
pub struct Gpu<'w> {
    /// Borrows the window; the window must outlive this value.
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Last size reported by the host. May be 0x0 while minimized.
    size: PhysicalSize<u32>,
}

/// One acquired swapchain image plus the encoder that renders into it.
///
/// Holding the surface texture blocks acquisition of the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What the host should do after failing to acquire a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Unrecoverable; stop the run.
    Fatal,
}

impl<'w> Gpu<'w> {
    /// Creates the device and configures a surface on `window`.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        // Default limits cover the largest pool target (MAX_TARGET_DIMENSION).
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("afterglow device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let config = surface_config(&caps, &init, size)?;
        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!(
            "gpu ready: {} ({:?}), surface {:?} {}x{}, {:?} latency {}",
            info.name,
            info.backend,
            config.format,
            config.width,
            config.height,
            config.present_mode,
            config.desired_maximum_frame_latency
        );

        Ok(Gpu {
            surface,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current drawable size in physical pixels.
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface for `new_size`.
    ///
    /// A 0x0 size is only recorded; wgpu rejects configuring an empty surface.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !is_drawable(new_size) {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next surface texture and opens an encoder for it.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("afterglow frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Recovers from a failed acquire where possible.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let action = surface_error_action(&err);
        match action {
            SurfaceErrorAction::Reconfigured if is_drawable(self.size) => {
                self.surface.configure(&self.device, &self.config);
            }
            SurfaceErrorAction::Fatal => log::error!("surface acquire failed: {err}"),
            _ => log::debug!("skipping frame: {err}"),
        }
        action
    }
}

fn is_drawable(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

fn surface_error_action(err: &SurfaceError) -> SurfaceErrorAction {
    match err {
        SurfaceError::Lost | SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

fn surface_config(
    caps: &wgpu::SurfaceCapabilities,
    init: &GpuInit,
    size: PhysicalSize<u32>,
) -> Result<wgpu::SurfaceConfiguration> {
    let format = choose_surface_format(&caps.formats, init.prefer_srgb)
        .context("no supported surface formats")?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: choose_present_mode(&caps.present_modes, init.swap_mode),
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: init.frame_latency.max(1),
    })
}

fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let srgb = formats.iter().copied().find(|f| f.is_srgb());
    match srgb {
        Some(format) if prefer_srgb => Some(format),
        _ => formats.first().copied(),
    }
}

fn choose_present_mode(supported: &[wgpu::PresentMode], swap: SwapMode) -> wgpu::PresentMode {
    let wanted = swap.present_mode();
    if supported.contains(&wanted) {
        wanted
    } else {
        log::warn!("{swap} presentation unsupported on this surface, using vsync");
        wgpu::PresentMode::Fifo
    }
}
