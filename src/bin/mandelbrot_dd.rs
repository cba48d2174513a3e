//! Mandelbrot viewer with emulated extended precision: view parameters are
//! split into (hi, lo) float pairs and the fragment shader iterates in
//! double-single arithmetic, pushing usable zoom depth well past what a
//! plain `float` shader can resolve.

use mandelbrot::render::EmulatedScene;
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
        "Mandelbrot (emulated double)",
        ViewState::new(DEFAULT_ITERATIONS),
        false,
    )?;
    let mut scene = EmulatedScene::new(&context, viewer.format())?;

    viewer.run(&mut scene, &context)?;
    Ok(())
}
