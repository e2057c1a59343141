//! The raster the pipeline draws into.
//!
//! The pipeline only needs somewhere to put one coloured pixel at a
//! time, which is the [`Canvas`] trait.  The raster handed back to
//! callers is an [`RgbaImage`]; tests substitute canvases that count
//! writes instead of storing colours.

use image::{ImageBuffer, Rgba, RgbaImage};

use errors::RenderError;
use planes::Pixel;

/// Something the draw stage can paint into.  The pipeline wraps the
/// canvas in a single mutex and holds it for one `paint` at a time.
pub trait Canvas: Send {
    /// Store `colour` at `pixel`.  The pixel is always inside the
    /// raster the pipeline was configured for.
    fn paint(&mut self, pixel: Pixel, colour: Rgba<u8>);
}

impl Canvas for RgbaImage {
    fn paint(&mut self, pixel: Pixel, colour: Rgba<u8>) {
        self.put_pixel(pixel.0 as u32, pixel.1 as u32, colour);
    }
}

/// Allocate a zeroed `width`x`height` raster.  Running out of memory
/// is reported rather than aborting the process.
pub fn allocate(width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    let failed = || RenderError::RasterAllocation { width, height };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(failed)?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| failed())?;
    buffer.resize(len, 0);
    ImageBuffer::from_raw(width, height, buffer).ok_or_else(failed)
}
