//! The OpenCL viewer variant: the escape-time iteration runs in a compute
//! kernel, the iteration counts are read back synchronously every frame,
//! colored on the CPU and copied into a texture for presentation.
//!
//! The kernel source is read from [`KERNEL_PATH`] once at startup; a
//! missing file or a kernel that fails to compile is a fatal, typed error.

use ocl::{Buffer, ProQue};

use rayon::prelude::*;

use vulkano::buffer::{BufferUsage, CpuAccessibleBuffer};
use vulkano::command_buffer::{
    AutoCommandBufferBuilder, BuildError, CommandBufferExecError, CopyBufferImageError,
};
use vulkano::format::Format;
use vulkano::image::swapchain::SwapchainImage;
use vulkano::image::{Dimensions, ImageCreationError, ImageUsage, StorageImage};
use vulkano::memory::DeviceMemoryAllocError;
use vulkano::sync::GpuFuture;
use vulkano::OomError;

use winit::Window;

use crate::render::{image_dimensions, BlitRenderer};
use crate::view::ViewState;
use crate::viewer::{Scene, ViewerError, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::MandelbrotContext;

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::iter;
use std::path::Path;
use std::sync::Arc;

/// Kernel source consumed at startup, relative to the working directory.
pub const KERNEL_PATH: &str = "kernels/mandelbrot.cl";

/// Fractal evaluated by an OpenCL kernel, presented via [`BlitRenderer`].
pub struct ComputeScene {
    pro_que: ProQue,
    blit: BlitRenderer,
    texture: Option<FractalTexture>,
}

struct FractalTexture {
    dimensions: [u32; 2],
    image: Arc<StorageImage<Format>>,
}

impl ComputeScene {
    pub fn new(
        context: &MandelbrotContext,
        format: Format,
        kernel_path: &Path,
    ) -> Result<ComputeScene, ViewerError> {
        let source = fs::read_to_string(kernel_path).map_err(ComputeError::KernelSource)?;
        let pro_que = ProQue::builder()
            .src(source)
            .dims((WINDOW_WIDTH as usize, WINDOW_HEIGHT as usize))
            .build()
            .map_err(ComputeError::Build)?;
        if let Ok(name) = pro_que.device().name() {
            log::info!("computing with {}", name);
        }

        let blit = BlitRenderer::new(context, format)?;

        Ok(ComputeScene {
            pro_que,
            blit,
            texture: None,
        })
    }

    /// Runs the kernel over the whole frame and blocks on the readback.
    fn iterate(
        &mut self,
        view: &ViewState,
        dimensions: [u32; 2],
    ) -> Result<Vec<u32>, ComputeError> {
        let [width, height] = dimensions;
        let len = width as usize * height as usize;

        // One transient output buffer per frame, released at scope end.
        let buffer: Buffer<u32> = Buffer::builder()
            .queue(self.pro_que.queue().clone())
            .len(len)
            .build()?;

        let kernel = self
            .pro_que
            .kernel_builder("mandelbrot")
            .global_work_size((width as usize, height as usize))
            .arg(&buffer)
            .arg(width as i32)
            .arg(height as i32)
            .arg(view.center_x)
            .arg(view.center_y)
            .arg(view.zoom)
            .arg(view.max_iterations)
            .build()?;

        unsafe {
            kernel.enq()?;
        }

        let mut counts = vec![0u32; len];
        buffer.read(&mut counts).enq()?;

        Ok(counts)
    }

    fn texture(
        &mut self,
        context: &MandelbrotContext,
        dimensions: [u32; 2],
    ) -> Result<Arc<StorageImage<Format>>, ComputeError> {
        if let Some(texture) = &self.texture {
            if texture.dimensions == dimensions {
                return Ok(texture.image.clone());
            }
        }

        let [width, height] = dimensions;
        let image = StorageImage::with_usage(
            context.device().clone(),
            Dimensions::Dim2d { width, height },
            Format::R8G8B8A8Unorm,
            ImageUsage {
                transfer_destination: true,
                sampled: true,
                ..ImageUsage::none()
            },
            iter::once(context.queue().family()),
        )?;
        self.texture = Some(FractalTexture {
            dimensions,
            image: image.clone(),
        });

        Ok(image)
    }

    fn upload(
        &self,
        before: Box<dyn GpuFuture>,
        pixels: Vec<u8>,
        image: Arc<StorageImage<Format>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, ComputeError> {
        let staging = CpuAccessibleBuffer::from_iter(
            context.device().clone(),
            BufferUsage {
                transfer_source: true,
                ..BufferUsage::none()
            },
            pixels.into_iter(),
        )?;

        let command_buffer = AutoCommandBufferBuilder::primary_one_time_submit(
            context.device().clone(),
            context.queue().family(),
        )?
        .copy_buffer_to_image(staging, image)?
        .build()?;

        Ok(Box::new(
            before.then_execute(context.queue().clone(), command_buffer)?,
        ))
    }
}

impl Scene for ComputeScene {
    fn draw(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, ViewerError> {
        let dimensions = image_dimensions(&*target);

        let counts = self.iterate(view, dimensions)?;
        let pixels = shade_counts(&counts, view.max_iterations);

        let image = self.texture(context, dimensions)?;
        let uploaded = self.upload(before, pixels, image.clone(), context)?;

        Ok(self.blit.draw_after(uploaded, image, target, context)?)
    }
}

/// Smooth polynomial palette; the interior endpoint (t = 1) is black.
pub fn shade(iterations: u32, max_iterations: u32) -> [u8; 4] {
    if iterations >= max_iterations {
        return [0, 0, 0, 0xff];
    }

    let t = iterations as f32 / max_iterations as f32;
    let r = 9.0 * (1.0 - t) * t * t * t;
    let g = 15.0 * (1.0 - t) * (1.0 - t) * t * t;
    let b = 8.5 * (1.0 - t) * (1.0 - t) * (1.0 - t) * t;

    [channel(r), channel(g), channel(b), 0xff]
}

fn channel(v: f32) -> u8 {
    (v.max(0.0).min(1.0) * 255.0) as u8
}

fn shade_counts(counts: &[u32], max_iterations: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; counts.len() * 4];
    pixels
        .par_chunks_mut(4)
        .zip(counts.par_iter())
        .for_each(|(px, &n)| px.copy_from_slice(&shade(n, max_iterations)));

    pixels
}

#[derive(Debug)]
pub enum ComputeError {
    KernelSource(io::Error),
    Build(ocl::Error),
    Cl(ocl::Error),
    Alloc(DeviceMemoryAllocError),
    Image(ImageCreationError),
    Oom(OomError),
    Upload(CopyBufferImageError),
    CommandBufferBuild(BuildError),
    Exec(CommandBufferExecError),
}

use ComputeError::*;

impl Display for ComputeError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            KernelSource(e) => write!(f, "failed to read kernel source: {}", e),
            Build(e) => write!(f, "kernel compilation failed: {}", e),
            Cl(e) => write!(f, "{}", e),
            Alloc(e) => write!(f, "{}", e),
            Image(e) => write!(f, "{}", e),
            Oom(e) => write!(f, "{}", e),
            Upload(e) => write!(f, "{}", e),
            CommandBufferBuild(e) => write!(f, "{}", e),
            Exec(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ComputeError {}

impl From<ocl::Error> for ComputeError {
    fn from(err: ocl::Error) -> ComputeError {
        Cl(err)
    }
}

impl From<DeviceMemoryAllocError> for ComputeError {
    fn from(err: DeviceMemoryAllocError) -> ComputeError {
        Alloc(err)
    }
}

impl From<ImageCreationError> for ComputeError {
    fn from(err: ImageCreationError) -> ComputeError {
        Image(err)
    }
}

impl From<OomError> for ComputeError {
    fn from(err: OomError) -> ComputeError {
        Oom(err)
    }
}

impl From<CopyBufferImageError> for ComputeError {
    fn from(err: CopyBufferImageError) -> ComputeError {
        Upload(err)
    }
}

impl From<BuildError> for ComputeError {
    fn from(err: BuildError) -> ComputeError {
        CommandBufferBuild(err)
    }
}

impl From<CommandBufferExecError> for ComputeError {
    fn from(err: CommandBufferExecError) -> ComputeError {
        Exec(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_points_are_black() {
        assert_eq!(shade(500, 500), [0, 0, 0, 0xff]);
        assert_eq!(shade(501, 500), [0, 0, 0, 0xff]);
    }

    #[test]
    fn escaped_points_are_colored() {
        let px = shade(250, 500);
        assert_eq!(px[3], 0xff);
        assert!(px[0] > 0 || px[1] > 0 || px[2] > 0);
    }

    #[test]
    fn immediate_escape_is_near_black() {
        // t = 0 zeroes every polynomial term.
        assert_eq!(shade(0, 500), [0, 0, 0, 0xff]);
    }

    #[test]
    fn shading_preserves_pixel_count() {
        let counts = vec![0, 10, 250, 499, 500];
        let pixels = shade_counts(&counts, 500);
        assert_eq!(pixels.len(), counts.len() * 4);
        assert_eq!(&pixels[16..20], &[0, 0, 0, 0xff]);
    }
}
