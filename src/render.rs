//! Fullscreen-quad rendering for the three viewers.
//!
//! The two fragment-shader scenes draw the fractal directly into the
//! swapchain image; the blit renderer presents a texture produced
//! elsewhere (the OpenCL variant's readback path in [`crate::compute`]).

use vulkano::buffer::{BufferUsage, CpuBufferPool, ImmutableBuffer};
use vulkano::command_buffer::{
    AutoCommandBufferBuilder, AutoCommandBufferBuilderContextError, BeginRenderPassError,
    BuildError, CommandBufferExecError, DrawError, DynamicState,
};
use vulkano::descriptor::descriptor_set::{
    FixedSizeDescriptorSetsPool, PersistentDescriptorSetBuildError,
};
use vulkano::descriptor::PipelineLayoutAbstract;
use vulkano::format::Format;
use vulkano::framebuffer::{
    Framebuffer, FramebufferCreationError, RenderPass, RenderPassCreationError, Subpass,
};
use vulkano::image::swapchain::SwapchainImage;
use vulkano::image::ImageViewAccess;
use vulkano::memory::DeviceMemoryAllocError;
use vulkano::pipeline::vertex::SingleBufferDefinition;
use vulkano::pipeline::viewport::Viewport;
use vulkano::pipeline::{GraphicsPipeline, GraphicsPipelineCreationError};
use vulkano::sampler::{Filter, MipmapMode, Sampler, SamplerAddressMode, SamplerCreationError};
use vulkano::sync::{FlushError, GpuFuture};
use vulkano::OomError;

use winit::Window;

use crate::shaders::{blit_frag, mandelbrot_dd_frag, mandelbrot_frag, quad_vert};
use crate::split::split;
use crate::view::ViewState;
use crate::viewer::{Scene, ViewerError};
use crate::MandelbrotContext;

use std::cell::RefCell;
use std::sync::Arc;

type QuadPipeline = GraphicsPipeline<
    SingleBufferDefinition<quad_vert::Vertex>,
    Box<dyn PipelineLayoutAbstract + Send + Sync>,
    Arc<RenderPass<pass::Desc>>,
>;

impl_error! {
    pub enum RenderError {
        Pass(RenderPassCreationError),
        Oom(OomError),
        Alloc(DeviceMemoryAllocError),
        Flush(FlushError),
        Pipeline(GraphicsPipelineCreationError),
        DescriptorSet(PersistentDescriptorSetBuildError),
        Framebuffer(FramebufferCreationError),
        BeginRenderPass(BeginRenderPassError),
        Draw(DrawError),
        CommandBufferContext(AutoCommandBufferBuilderContextError),
        CommandBufferBuild(BuildError),
        Exec(CommandBufferExecError),
        Sampler(SamplerCreationError),
    }
}

pub(crate) fn image_dimensions<I: ImageViewAccess>(image: &I) -> [u32; 2] {
    image.dimensions().width_height()
}

fn fullscreen_viewport(dimensions: [u32; 2]) -> DynamicState {
    DynamicState {
        viewports: Some(vec![Viewport {
            origin: [0.0, 0.0],
            dimensions: [dimensions[0] as f32, dimensions[1] as f32],
            depth_range: 0.0..1.0,
        }]),
        ..DynamicState::none()
    }
}

fn upload_quad(
    context: &MandelbrotContext,
) -> Result<Arc<ImmutableBuffer<[quad_vert::Vertex]>>, RenderError> {
    let (buffer, future) = ImmutableBuffer::from_iter(
        quad_vert::Vertex::fullscreen_quad().to_vec().into_iter(),
        BufferUsage::vertex_buffer(),
        context.queue().clone(),
    )?;
    future.then_signal_fence_and_flush()?.wait(None)?;

    Ok(buffer)
}

/// Fractal evaluated in a single-precision fragment shader.
pub struct ShaderScene {
    render_pass: Arc<RenderPass<pass::Desc>>,
    pipeline: Arc<QuadPipeline>,
    quad: Arc<ImmutableBuffer<[quad_vert::Vertex]>>,
    uniforms: CpuBufferPool<mandelbrot_frag::ty::Data>,
    desc_pool: RefCell<FixedSizeDescriptorSetsPool<Arc<QuadPipeline>>>,
}

impl ShaderScene {
    pub fn new(context: &MandelbrotContext, format: Format) -> Result<ShaderScene, RenderError> {
        let render_pass = Arc::new(RenderPass::new(
            context.device().clone(),
            pass::Desc::new(format, 1),
        )?);

        let vs = quad_vert::Shader::load(context.device().clone())?;
        let fs = mandelbrot_frag::Shader::load(context.device().clone())?;

        let pipeline = Arc::new(
            GraphicsPipeline::start()
                .vertex_input_single_buffer::<quad_vert::Vertex>()
                .vertex_shader(vs.main_entry_point(), ())
                .fragment_shader(fs.main_entry_point(), ())
                .viewports_dynamic_scissors_irrelevant(1)
                .render_pass(Subpass::from(render_pass.clone(), 0).unwrap())
                .build(context.device().clone())?,
        );

        let quad = upload_quad(context)?;
        let uniforms = CpuBufferPool::new(
            context.device().clone(),
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::none()
            },
        );
        let desc_pool = RefCell::new(FixedSizeDescriptorSetsPool::new(pipeline.clone(), 0));

        Ok(ShaderScene {
            render_pass,
            pipeline,
            quad,
            uniforms,
            desc_pool,
        })
    }

    fn frame(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, RenderError> {
        let [width, height] = image_dimensions(&*target);

        let uniform = self.uniforms.next(mandelbrot_frag::ty::Data {
            center: [view.center_x as f32, view.center_y as f32],
            resolution: [width as f32, height as f32],
            zoom: view.zoom as f32,
            max_iter: view.max_iterations,
        })?;
        let desc_set = self
            .desc_pool
            .borrow_mut()
            .next()
            .add_buffer(uniform)
            .unwrap()
            .build()?;

        let framebuffer = Arc::new(
            Framebuffer::start(self.render_pass.clone())
                .add(target)?
                .build()?,
        );

        let command_buffer = AutoCommandBufferBuilder::primary_one_time_submit(
            context.device().clone(),
            context.queue().family(),
        )?
        .begin_render_pass(framebuffer, false, vec![[0.0, 0.0, 0.0, 1.0].into()])?
        .draw(
            self.pipeline.clone(),
            &fullscreen_viewport([width, height]),
            self.quad.clone(),
            desc_set,
            (),
        )?
        .end_render_pass()?
        .build()?;

        Ok(Box::new(
            before.then_execute(context.queue().clone(), command_buffer)?,
        ))
    }
}

impl Scene for ShaderScene {
    fn draw(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, ViewerError> {
        Ok(self.frame(before, view, target, context)?)
    }
}

/// Fractal evaluated with double-single emulated precision: every `f64`
/// view parameter is uploaded as a `(hi, lo)` pair and the shader carries
/// both components through the iteration.
pub struct EmulatedScene {
    render_pass: Arc<RenderPass<pass::Desc>>,
    pipeline: Arc<QuadPipeline>,
    quad: Arc<ImmutableBuffer<[quad_vert::Vertex]>>,
    uniforms: CpuBufferPool<mandelbrot_dd_frag::ty::Data>,
    desc_pool: RefCell<FixedSizeDescriptorSetsPool<Arc<QuadPipeline>>>,
}

impl EmulatedScene {
    pub fn new(context: &MandelbrotContext, format: Format) -> Result<EmulatedScene, RenderError> {
        let render_pass = Arc::new(RenderPass::new(
            context.device().clone(),
            pass::Desc::new(format, 1),
        )?);

        let vs = quad_vert::Shader::load(context.device().clone())?;
        let fs = mandelbrot_dd_frag::Shader::load(context.device().clone())?;

        let pipeline = Arc::new(
            GraphicsPipeline::start()
                .vertex_input_single_buffer::<quad_vert::Vertex>()
                .vertex_shader(vs.main_entry_point(), ())
                .fragment_shader(fs.main_entry_point(), ())
                .viewports_dynamic_scissors_irrelevant(1)
                .render_pass(Subpass::from(render_pass.clone(), 0).unwrap())
                .build(context.device().clone())?,
        );

        let quad = upload_quad(context)?;
        let uniforms = CpuBufferPool::new(
            context.device().clone(),
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::none()
            },
        );
        let desc_pool = RefCell::new(FixedSizeDescriptorSetsPool::new(pipeline.clone(), 0));

        Ok(EmulatedScene {
            render_pass,
            pipeline,
            quad,
            uniforms,
            desc_pool,
        })
    }

    fn frame(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, RenderError> {
        let [width, height] = image_dimensions(&*target);

        // Split fresh from the current view each frame; each logical value
        // becomes two scalar shader parameters.
        let uniform = self.uniforms.next(mandelbrot_dd_frag::ty::Data {
            center_x: split(view.center_x).parts(),
            center_y: split(view.center_y).parts(),
            zoom: split(view.zoom).parts(),
            resolution: [width as f32, height as f32],
            max_iter: view.max_iterations,
        })?;
        let desc_set = self
            .desc_pool
            .borrow_mut()
            .next()
            .add_buffer(uniform)
            .unwrap()
            .build()?;

        let framebuffer = Arc::new(
            Framebuffer::start(self.render_pass.clone())
                .add(target)?
                .build()?,
        );

        let command_buffer = AutoCommandBufferBuilder::primary_one_time_submit(
            context.device().clone(),
            context.queue().family(),
        )?
        .begin_render_pass(framebuffer, false, vec![[0.0, 0.0, 0.0, 1.0].into()])?
        .draw(
            self.pipeline.clone(),
            &fullscreen_viewport([width, height]),
            self.quad.clone(),
            desc_set,
            (),
        )?
        .end_render_pass()?
        .build()?;

        Ok(Box::new(
            before.then_execute(context.queue().clone(), command_buffer)?,
        ))
    }
}

impl Scene for EmulatedScene {
    fn draw(
        &mut self,
        before: Box<dyn GpuFuture>,
        view: &ViewState,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, ViewerError> {
        Ok(self.frame(before, view, target, context)?)
    }
}

/// Draws an already-filled texture over the whole swapchain image.
pub struct BlitRenderer {
    render_pass: Arc<RenderPass<pass::Desc>>,
    pipeline: Arc<QuadPipeline>,
    quad: Arc<ImmutableBuffer<[quad_vert::Vertex]>>,
    sampler: Arc<Sampler>,
    desc_pool: RefCell<FixedSizeDescriptorSetsPool<Arc<QuadPipeline>>>,
}

impl BlitRenderer {
    pub fn new(context: &MandelbrotContext, format: Format) -> Result<BlitRenderer, RenderError> {
        let render_pass = Arc::new(RenderPass::new(
            context.device().clone(),
            pass::Desc::new(format, 1),
        )?);

        let vs = quad_vert::Shader::load(context.device().clone())?;
        let fs = blit_frag::Shader::load(context.device().clone())?;

        let pipeline = Arc::new(
            GraphicsPipeline::start()
                .vertex_input_single_buffer::<quad_vert::Vertex>()
                .vertex_shader(vs.main_entry_point(), ())
                .fragment_shader(fs.main_entry_point(), ())
                .viewports_dynamic_scissors_irrelevant(1)
                .render_pass(Subpass::from(render_pass.clone(), 0).unwrap())
                .build(context.device().clone())?,
        );

        let quad = upload_quad(context)?;
        let sampler = Sampler::new(
            context.device().clone(),
            Filter::Nearest,
            Filter::Nearest,
            MipmapMode::Nearest,
            SamplerAddressMode::ClampToEdge,
            SamplerAddressMode::ClampToEdge,
            SamplerAddressMode::ClampToEdge,
            0.0,
            1.0,
            0.0,
            1.0,
        )?;
        let desc_pool = RefCell::new(FixedSizeDescriptorSetsPool::new(pipeline.clone(), 0));

        Ok(BlitRenderer {
            render_pass,
            pipeline,
            quad,
            sampler,
            desc_pool,
        })
    }

    /// Draws `sampled_image` over `target` once `before` has completed.
    pub fn draw_after<S, F>(
        &self,
        before: F,
        sampled_image: S,
        target: Arc<SwapchainImage<Window>>,
        context: &MandelbrotContext,
    ) -> Result<Box<dyn GpuFuture>, RenderError>
    where
        S: ImageViewAccess + Send + Sync + 'static,
        F: GpuFuture + 'static,
    {
        let dimensions = image_dimensions(&*target);

        let desc_set = self
            .desc_pool
            .borrow_mut()
            .next()
            .add_sampled_image(sampled_image, self.sampler.clone())
            .unwrap()
            .build()?;

        let framebuffer = Arc::new(
            Framebuffer::start(self.render_pass.clone())
                .add(target)?
                .build()?,
        );

        let command_buffer = AutoCommandBufferBuilder::primary_one_time_submit(
            context.device().clone(),
            context.queue().family(),
        )?
        .begin_render_pass(framebuffer, false, vec![[0.0, 0.0, 0.0, 1.0].into()])?
        .draw(
            self.pipeline.clone(),
            &fullscreen_viewport(dimensions),
            self.quad.clone(),
            desc_set,
            (),
        )?
        .end_render_pass()?
        .build()?;

        Ok(Box::new(
            before.then_execute(context.queue().clone(), command_buffer)?,
        ))
    }
}

mod pass {
    use vulkano::format::{ClearValue, Format};
    use vulkano::framebuffer::{
        AttachmentDescription, LoadOp, PassDependencyDescription, PassDescription, RenderPassDesc,
        RenderPassDescClearValues, StoreOp,
    };
    use vulkano::image::ImageLayout;

    /// Single cleared color attachment, no depth, no dependencies.
    #[derive(Debug, Clone, Copy, PartialEq, Hash)]
    pub struct Desc {
        format: Format,
        samples: u32,
    }

    impl Desc {
        pub fn new(format: Format, samples: u32) -> Desc {
            Desc { format, samples }
        }
    }

    unsafe impl RenderPassDesc for Desc {
        #[inline]
        fn num_attachments(&self) -> usize {
            1
        }

        #[inline]
        fn attachment_desc(&self, id: usize) -> Option<AttachmentDescription> {
            if id == 0 {
                Some(AttachmentDescription {
                    format: self.format,
                    samples: self.samples,
                    load: LoadOp::Clear,
                    store: StoreOp::Store,
                    stencil_load: LoadOp::DontCare,
                    stencil_store: StoreOp::DontCare,
                    initial_layout: ImageLayout::ColorAttachmentOptimal,
                    final_layout: ImageLayout::ColorAttachmentOptimal,
                })
            } else {
                None
            }
        }

        #[inline]
        fn num_subpasses(&self) -> usize {
            1
        }

        #[inline]
        fn subpass_desc(&self, id: usize) -> Option<PassDescription> {
            if id == 0 {
                Some(PassDescription {
                    color_attachments: vec![(0, ImageLayout::ColorAttachmentOptimal)],
                    depth_stencil: None,
                    input_attachments: vec![],
                    resolve_attachments: vec![],
                    preserve_attachments: vec![],
                })
            } else {
                None
            }
        }

        #[inline]
        fn num_dependencies(&self) -> usize {
            0
        }

        #[inline]
        fn dependency_desc(&self, _: usize) -> Option<PassDependencyDescription> {
            None
        }
    }

    unsafe impl RenderPassDescClearValues<Vec<ClearValue>> for Desc {
        fn convert_clear_values(&self, v: Vec<ClearValue>) -> Box<dyn Iterator<Item = ClearValue>> {
            Box::new(v.into_iter())
        }
    }
}
