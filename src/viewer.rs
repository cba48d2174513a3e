//! The window and frame loop shared by all three viewers.
//!
//! One thread owns the window, polls input, mutates the [`ViewState`] and
//! drives the frame: acquire a swapchain image, hand it to the variant's
//! [`Scene`], present, then block on the frame fence. The swapchain is
//! rebuilt whenever the window is resized or an acquire reports it out of
//! date.

use vulkano::format::Format;
use vulkano::image::swapchain::SwapchainImage;
use vulkano::image::ImageUsage;
use vulkano::swapchain::{
    self, AcquireError, CapabilitiesError, CompositeAlpha, PresentMode, Surface, Swapchain,
    SwapchainCreationError,
};
use vulkano::sync::{FlushError, GpuFuture, SharingMode};

use vulkano_win::VkSurfaceBuild;

use winit::dpi::LogicalSize;
use winit::{Event, EventsLoop, VirtualKeyCode, Window, WindowBuilder, WindowEvent};

use crate::compute::ComputeError;
use crate::render::RenderError;
use crate::view::{KeyTracker, ViewState};
use crate::MandelbrotContext;

use std::sync::Arc;

pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

/// One viewer variant's per-frame rendering: given the acquired swapchain
/// image and the current view, return a future that completes the frame.
pub trait Scene {
    fn draw(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, ViewerError>;
}

pub struct Viewer {
    events_loop: EventsLoop,
    surface: Arc<Surface<Window>>,
    swapchain: Arc<Swapchain<Window>>,
    swapchain_images: Vec<Arc<SwapchainImage<Window>>>,
    view: ViewState,
    keys: KeyTracker,
    close_on_escape: bool,
    recreate_swapchain: bool,
}

impl Viewer {
    pub fn new(
        context: &MandelbrotContext,
        title: &str,
        view: ViewState,
        close_on_escape: bool,
    ) -> Result<Viewer, ViewerError> {
        let events_loop = EventsLoop::new();
        let surface = WindowBuilder::new()
            .with_dimensions(LogicalSize::new(
                f64::from(WINDOW_WIDTH),
                f64::from(WINDOW_HEIGHT),
            ))
            .with_title(title)
            .build_vk_surface(&events_loop, context.instance().clone())?;

        let (swapchain, swapchain_images) = create_swapchain(context, &surface)?;

        Ok(Viewer {
            events_loop,
            surface,
            swapchain,
            swapchain_images,
            view,
            keys: KeyTracker::new(),
            close_on_escape,
            recreate_swapchain: false,
        })
    }

    /// The swapchain's color format; scenes build their pipelines for it.
    pub fn format(&self) -> Format {
        self.swapchain.format()
    }

    pub fn run<S: Scene>(
        &mut self,
        scene: &mut S,
        context: &MandelbrotContext,
    ) -> Result<(), ViewerError> {
        loop {
            let mut close_requested = false;
            let mut resized = false;
            {
                let keys = &mut self.keys;
                self.events_loop.poll_events(|event| {
                    if let Event::WindowEvent { event, .. } = event {
                        match event {
                            WindowEvent::CloseRequested => close_requested = true,
                            WindowEvent::Resized(_) => resized = true,
                            WindowEvent::KeyboardInput { input, .. } => keys.record(input),
                            _ => (),
                        }
                    }
                });
            }

            if close_requested {
                return Ok(());
            }
            if self.close_on_escape && self.keys.held(VirtualKeyCode::Escape) {
                return Ok(());
            }

            self.keys.apply(&mut self.view);

            if resized {
                self.recreate_swapchain = true;
            }
            if self.recreate_swapchain {
                if !self.rebuild_swapchain()? {
                    // Unusable dimensions (e.g. minimized); try again on
                    // the next iteration.
                    continue;
                }
                self.recreate_swapchain = false;
            }

            let (idx, acquire_future) =
                match swapchain::acquire_next_image(self.swapchain.clone(), None) {
                    Ok(r) => r,
                    Err(AcquireError::OutOfDate) => {
                        self.recreate_swapchain = true;
                        continue;
                    }
                    Err(e) => return Err(ViewerError::Acquire(e)),
                };
            let target = self.swapchain_images[idx].clone();

            let frame = scene.draw(Box::new(acquire_future), &self.view, target, context)?;

            let finished = frame
                .then_swapchain_present(context.queue().clone(), self.swapchain.clone(), idx)
                .then_signal_fence_and_flush();

            match finished {
                Ok(mut finished) => {
                    finished.wait(None)?;
                    finished.cleanup_finished();
                }
                Err(FlushError::OutOfDate) => self.recreate_swapchain = true,
                Err(e) => return Err(ViewerError::Flush(e)),
            }
        }
    }

    /// Rebuilds the swapchain at the window's current size. Returns false
    /// when the surface currently has no usable extent.
    fn rebuild_swapchain(&mut self) -> Result<bool, ViewerError> {
        let window = self.surface.window();
        let dimensions = match window.get_inner_size() {
            Some(size) => {
                let physical: (u32, u32) = size.to_physical(window.get_hidpi_factor()).into();
                [physical.0, physical.1]
            }
            None => return Ok(false),
        };
        if dimensions[0] == 0 || dimensions[1] == 0 {
            return Ok(false);
        }

        match self.swapchain.recreate_with_dimension(dimensions) {
            Ok((swapchain, images)) => {
                self.swapchain = swapchain;
                self.swapchain_images = images;
                Ok(true)
            }
            Err(SwapchainCreationError::UnsupportedDimensions) => Ok(false),
            Err(e) => Err(ViewerError::SwapchainCreation(e)),
        }
    }
}

fn create_swapchain(
    context: &MandelbrotContext,
    surface: &Arc<Surface<Window>>,
) -> Result<(Arc<Swapchain<Window>>, Vec<Arc<SwapchainImage<Window>>>), ViewerError> {
    let caps = surface.capabilities(context.device().physical_device())?;

    let image_count = match caps.max_image_count {
        None => u32::max(2, caps.min_image_count),
        Some(limit) => u32::min(u32::max(2, caps.min_image_count), limit),
    };
    let (format, _) = caps.supported_formats[0];
    let dimensions = caps.current_extent.unwrap_or([WINDOW_WIDTH, WINDOW_HEIGHT]);
    let usage = ImageUsage {
        color_attachment: true,
        ..ImageUsage::none()
    };
    let sharing = SharingMode::Exclusive(context.queue().family().id());

    let (swapchain, images) = Swapchain::new(
        context.device().clone(),
        surface.clone(),
        image_count,
        format,
        dimensions,
        1,
        usage,
        sharing,
        caps.current_transform,
        CompositeAlpha::Opaque,
        PresentMode::Fifo,
        true,
        None,
    )?;

    Ok((swapchain, images))
}

impl_error! {
    pub enum ViewerError {
        Render(RenderError),
        Compute(ComputeError),
        WindowCreation(vulkano_win::CreationError),
        Capabilities(CapabilitiesError),
        SwapchainCreation(SwapchainCreationError),
        Acquire(AcquireError),
        Flush(FlushError),
    }
}
