//! Real-time, keyboard-driven viewers for the Mandelbrot set.
//!
//! Three standalone binaries share this library, differing only in where the
//! escape-time iteration runs:
//!
//! * `mandelbrot`: single-precision fragment shader.
//! * `mandelbrot_dd`: fragment shader with emulated extended precision.
//!   Every `f64` view parameter is split into a `(hi, lo)` pair of `f32`s
//!   (see [`SplitDouble`]) and the shader iterates in double-single
//!   arithmetic.
//! * `mandelbrot_cl`: OpenCL kernel dispatched once per frame, read back,
//!   colored on the CPU and drawn as a fullscreen texture.
//!
//! Controls: `W`/`A`/`S`/`D` pan, `Q`/`E` zoom, `Up`/`Down` adjust the
//! iteration bound, `R` resets the view.

#[macro_use]
extern crate gramit;

use vulkano::device::{Device, DeviceCreationError, DeviceExtensions, Features, Queue};
use vulkano::instance::{
    Instance, InstanceCreationError, PhysicalDevice, PhysicalDeviceType, QueueFamily,
};

use std::fmt::{self, Display, Formatter};
use std::iter;
use std::sync::Arc;

/// Declares an error enum whose variants each wrap one source error,
/// with `Display`, `Error` and `From` implementations.
macro_rules! impl_error {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $($variant:ident($err:ty)),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug)]
        pub enum $name {
            $($variant($err)),*
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                match self {
                    $($name::$variant(e) => write!(f, "{}", e)),*
                }
            }
        }

        impl ::std::error::Error for $name {}

        $(
            impl From<$err> for $name {
                fn from(err: $err) -> $name {
                    $name::$variant(err)
                }
            }
        )*
    };
}

pub mod compute;
pub mod render;
pub mod shaders;
pub mod split;
pub mod view;
pub mod viewer;

pub use split::{split, SplitDouble};
pub use view::ViewState;
pub use viewer::{Scene, Viewer};

/// Vulkan instance, device and queue shared by every viewer variant.
pub struct MandelbrotContext {
    instance: Arc<Instance>,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl MandelbrotContext {
    pub fn new() -> Result<MandelbrotContext, ContextError> {
        let instance = Instance::new(None, &vulkano_win::required_extensions(), None)
            .map_err(ContextError::InstanceCreation)?;
        let (physical, queue_family) =
            find_best_physical_device(&instance).ok_or(ContextError::DeviceDiscovery)?;
        log::info!("rendering with {}", physical.name());

        let (device, mut queues) = Device::new(
            physical,
            &Features::none(),
            &DeviceExtensions::supported_by_device(physical),
            iter::once((queue_family, 0.5)),
        )
        .map_err(ContextError::DeviceCreation)?;
        let queue = queues.next().ok_or(ContextError::DeviceDiscovery)?;

        Ok(MandelbrotContext {
            instance,
            device,
            queue,
        })
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }
}

#[derive(Debug, Clone)]
pub enum ContextError {
    InstanceCreation(InstanceCreationError),
    DeviceDiscovery,
    DeviceCreation(DeviceCreationError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ContextError::InstanceCreation(e) => write!(f, "{}", e),
            ContextError::DeviceDiscovery => {
                write!(f, "failed to find a graphics-capable device")
            }
            ContextError::DeviceCreation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ContextError {}

fn num_graphics_queues(dev: &PhysicalDevice) -> usize {
    let mut total = 0;
    for fam in dev.queue_families() {
        if fam.supports_graphics() {
            total += fam.queues_count();
        }
    }

    total
}

fn find_best_by_type(
    instance: &Arc<Instance>,
    ty: PhysicalDeviceType,
) -> Option<(PhysicalDevice, QueueFamily)> {
    let dev = PhysicalDevice::enumerate(instance)
        .filter(|d| d.ty() == ty && DeviceExtensions::supported_by_device(*d).khr_swapchain)
        .max_by_key(num_graphics_queues);

    if let Some(d) = dev {
        d.queue_families()
            .find(QueueFamily::supports_graphics)
            .map(|q| (d, q))
    } else {
        None
    }
}

fn find_best_physical_device(instance: &Arc<Instance>) -> Option<(PhysicalDevice, QueueFamily)> {
    find_best_by_type(instance, PhysicalDeviceType::DiscreteGpu)
        .or_else(|| find_best_by_type(instance, PhysicalDeviceType::IntegratedGpu))
        .or_else(|| find_best_by_type(instance, PhysicalDeviceType::VirtualGpu))
        .or_else(|| find_best_by_type(instance, PhysicalDeviceType::Cpu))
        .or_else(|| find_best_by_type(instance, PhysicalDeviceType::Other))
}
