//! Mandelbrot viewer computing the fractal in an OpenCL kernel, read back
//! to the host each frame and presented as a fullscreen texture.

use mandelbrot::compute::{ComputeScene, KERNEL_PATH};
use mandelbrot::view::ViewState;
use mandelbrot::{MandelbrotContext, Viewer};

use std::error::Error;
use std::path::Path;
use std::process;

const DEFAULT_ITERATIONS: u32 = 500;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let context = MandelbrotContext::new()?;
    let mut viewer = Viewer::new(
        &context,
        "Mandelbrot (OpenCL)",
        ViewState::new(DEFAULT_ITERATIONS),
        false,
    )?;
    let mut scene = ComputeScene::new(&context, viewer.format(), Path::new(KERNEL_PATH))?;

    viewer.run(&mut scene, &context)?;
    Ok(())
}
