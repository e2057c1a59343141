//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a rectangle on the complex plane described by its centre and
//! a scale.  The centre pixel of the raster always lands exactly on
//! the centre of the viewport.
use itertools::iproduct;
use num::Complex;

use errors::ConfigError;
use settings::Settings;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the x, y of a point in a raster.  x runs along a row,
/// y down the columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pixel(pub usize, pub usize);

/// Maps pixels of the integral plane onto points of the complex plane.
#[derive(Clone, Debug)]
pub struct PlaneMapper {
    /// The size of the raster.
    pub integral_plane: IntegralPlane,
    /// The complex number at the centre of the raster.
    pub centre: Complex<f64>,
    /// The distance on the complex plane from the centre to the edge
    /// of the raster.
    pub scale: f64,
    // Integer half-sizes of the raster; the centre pixel of each axis.
    half: (usize, usize),
    // Half-sizes as divisors.  A one-pixel axis divides by one rather
    // than zero.
    divisors: (f64, f64),
}

impl PlaneMapper {
    /// Constructor.  Validates the settings, then derives the mapping
    /// from them.
    pub fn new(settings: &Settings) -> Result<PlaneMapper, ConfigError> {
        settings.validate()?;
        let (width, height) = settings.dimensions();
        let (width, height) = (width as usize, height as usize);
        let half = (width / 2, height / 2);

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            centre: Complex::new(settings.centre_x, settings.centre_y),
            scale: settings.scale,
            half,
            divisors: (half.0.max(1) as f64, half.1.max(1) as f64),
        })
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Given a pixel on the integral cartesian plane, return the
    /// equivalent point on the complex plane.  Pixels left of and above
    /// the centre map to smaller real and imaginary parts.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        let dx = pixel.0 as f64 - self.half.0 as f64;
        let dy = pixel.1 as f64 - self.half.1 as f64;
        Complex::new(
            dx / self.divisors.0 * self.scale + self.centre.re,
            dy / self.divisors.1 * self.scale + self.centre.im,
        )
    }

    /// Every pixel of the raster exactly once, row by row.  Each call
    /// starts a fresh pass.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> {
        let IntegralPlane(width, height) = self.integral_plane;
        iproduct!(0..height, 0..width).map(|(row, column)| Pixel(column, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn settings(width: i64, height: i64, scale: f64, centre: (f64, f64)) -> Settings {
        Settings {
            width,
            height,
            scale,
            centre_x: centre.0,
            centre_y: centre.1,
            ..Settings::default()
        }
    }

    #[test]
    fn planemapper_fails_on_bad_shape() {
        let pm = PlaneMapper::new(&settings(0, 4, 1.0, (0.0, 0.0)));
        assert_eq!(pm.unwrap_err(), ConfigError::NonPositiveWidth(0));
    }

    #[test]
    fn planemapper_passes_on_good_shape() {
        let pm = PlaneMapper::new(&settings(4, 4, 1.0, (0.0, 0.0))).unwrap();
        assert_eq!(pm.len(), 16);
        assert!(!pm.is_empty());
    }

    #[test]
    fn centre_pixel_maps_to_centre_exactly() {
        for &(w, h) in &[(4, 4), (5, 3), (3000, 2000), (1, 1), (7, 1)] {
            let pm = PlaneMapper::new(&settings(w, h, 1.7, (-0.5, 0.3))).unwrap();
            let centre = Pixel(w as usize / 2, h as usize / 2);
            assert_eq!(pm.pixel_to_point(&centre), Complex::new(-0.5, 0.3));
        }
    }

    #[test]
    fn pixel_to_points_on_mixed_planes() {
        let pm = PlaneMapper::new(&settings(4, 4, 2.0, (0.0, 0.0))).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(2, 2)), Complex::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(&Pixel(0, 0)), Complex::new(-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(&Pixel(3, 1)), Complex::new(1.0, -1.0));
    }

    #[test]
    fn pixel_to_points_follow_the_centre() {
        let pm = PlaneMapper::new(&settings(640, 480, 0.5, (-0.75, 0.25))).unwrap();
        assert_eq!(pm.pixel_to_point(&Pixel(0, 240)), Complex::new(-1.25, 0.25));
        assert_eq!(pm.pixel_to_point(&Pixel(320, 0)), Complex::new(-0.75, -0.25));
    }

    #[test]
    fn pixels_cover_the_raster_once_in_row_order() {
        let pm = PlaneMapper::new(&settings(3, 2, 1.0, (0.0, 0.0))).unwrap();
        let pixels: Vec<Pixel> = pm.pixels().collect();
        assert_eq!(
            pixels,
            vec![
                Pixel(0, 0),
                Pixel(1, 0),
                Pixel(2, 0),
                Pixel(0, 1),
                Pixel(1, 1),
                Pixel(2, 1)
            ]
        );
    }

    #[test]
    fn pixels_restart_on_every_call() {
        let pm = PlaneMapper::new(&settings(13, 7, 1.0, (0.0, 0.0))).unwrap();
        let first: HashSet<Pixel> = pm.pixels().collect();
        assert_eq!(first.len(), pm.len());
        assert_eq!(pm.pixels().count(), pm.len());
    }
}
