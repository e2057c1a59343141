#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane for
//! which the orbit `z <- z*z + c`, started at zero, stays bounded.  An
//! escape-time renderer maps every pixel of a raster to such a point,
//! iterates until the orbit's modulus exceeds a bound or an iteration
//! budget runs out, and colours the pixel by how much budget was left.
//!
//! Every pixel is independent, but some cost hundreds of times more
//! than others, so pixels are handed out one at a time through a
//! bounded queue to a pool of worker threads.  The results are painted
//! into a single raster guarded by a single lock, either by the workers
//! themselves or by a second pool of draw workers (see
//! [`pipeline::Architecture`]).  A render returns only after every
//! worker has stopped and every pixel has been painted exactly once.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate serde;
extern crate serde_json;

#[cfg(test)]
extern crate tempfile;

pub mod colour;
pub mod errors;
pub mod escape;
pub mod pipeline;
pub mod planes;
pub mod raster;
pub mod settings;

pub use colour::Palette;
pub use errors::{ConfigError, RenderError, SettingsError};
pub use pipeline::{Architecture, PipelineConfig};
pub use planes::{Pixel, PlaneMapper};
pub use raster::Canvas;
pub use settings::{Movement, Settings};

use image::RgbaImage;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pipeline::EscapeKernel;

/// A finished raster and how long the pipeline took to produce it.
#[derive(Clone, Debug)]
pub struct Render {
    /// The completed image, `width`x`height`.
    pub raster: RgbaImage,
    /// Wall-clock time of the parallel compute and draw phase.
    pub elapsed: Duration,
}

impl Render {
    /// The elapsed time in fractional seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Render with the default pipeline: staged, one compute and one draw
/// worker per hardware thread.
pub fn render(settings: &Settings) -> Result<Render, RenderError> {
    render_with(settings, &PipelineConfig::default())
}

/// Render with an explicit pipeline configuration.  The settings and
/// configuration are checked, and the raster allocated, before any
/// worker is started.
pub fn render_with(settings: &Settings, config: &PipelineConfig) -> Result<Render, RenderError> {
    settings.validate()?;
    config.validate()?;
    let (width, height) = settings.dimensions();
    let raster = raster::allocate(width, height)?;
    let (raster, elapsed) = render_onto(settings, config, raster)?;
    Ok(Render { raster, elapsed })
}

/// Render into any canvas, returning it along with the time the
/// pipeline took.  The canvas must accept every pixel of a
/// `width`x`height` raster.
pub fn render_onto<C: Canvas>(
    settings: &Settings,
    config: &PipelineConfig,
    canvas: C,
) -> Result<(C, Duration), RenderError> {
    config.validate()?;
    let kernel = EscapeKernel::new(settings)?;
    let palette = Palette::from_settings(settings);
    let canvas = Mutex::new(canvas);

    info!(
        "rendering {}x{} around {},{} at scale {} ({:?}, {} compute / {} draw workers)",
        settings.width,
        settings.height,
        settings.centre_x,
        settings.centre_y,
        settings.scale,
        config.architecture,
        config.compute_workers,
        config.draw_workers
    );
    let start = Instant::now();
    match config.architecture {
        Architecture::DirectWrite => pipeline::run_direct(&kernel, palette, config, &canvas)?,
        Architecture::Staged => pipeline::run_staged(&kernel, palette, config, &canvas)?,
    }
    let elapsed = start.elapsed();
    info!("rendered {} pixels in {:?}", kernel.plane().len(), elapsed);

    let canvas = canvas
        .into_inner()
        .map_err(|_| RenderError::WorkerPanicked)?;
    Ok((canvas, elapsed))
}
