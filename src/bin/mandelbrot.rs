//! Mandelbrot viewer computing the fractal in a single-precision
//! fragment shader.

use mandelbrot::render::ShaderScene;
use mandelbrot::view::ViewState;
use mandelbrot::{MandelbrotContext, Viewer};

use std::error::Error;
use std::process;

const DEFAULT_ITERATIONS: u32 = 100;

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
        "Mandelbrot",
        ViewState::new(DEFAULT_ITERATIONS),
        true,
    )?;
    let mut scene = ShaderScene::new(&context, viewer.format())?;

    viewer.run(&mut scene, &context)?;
    Ok(())
}
