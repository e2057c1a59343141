extern crate crossbeam;
extern crate image;
extern crate mandelbrot;

use crossbeam::channel::bounded;
use image::{Pixel as ImagePixel, Rgba};
use mandelbrot::escape::remaining_iterations;
use mandelbrot::{
    render_onto, render_with, Canvas, Movement, Palette, Pixel, PipelineConfig, PlaneMapper,
    Settings,
};
use std::thread;
use std::time::Duration;

struct WriteCounter {
    width: usize,
    writes: Vec<u32>,
}

impl Canvas for WriteCounter {
    fn paint(&mut self, pixel: Pixel, _colour: Rgba<u8>) {
        self.writes[pixel.1 * self.width + pixel.0] += 1;
    }
}

fn settings(width: i64, height: i64) -> Settings {
    Settings {
        width,
        height,
        scale: 1.5,
        centre_x: -0.6,
        centre_y: 0.1,
        red_factor: 3,
        green_factor: 7,
        blue_factor: 11,
        ..Settings::default()
    }
}

#[test]
fn every_pixel_is_written_exactly_once() {
    for &(width, height) in &[(1, 1), (1, 9), (9, 1), (16, 16), (61, 37)] {
        for config in &[PipelineConfig::staged(3, 2), PipelineConfig::direct(5)] {
            let counter = WriteCounter {
                width: width as usize,
                writes: vec![0; (width * height) as usize],
            };
            let (counter, _) = render_onto(&settings(width, height), config, counter).unwrap();
            assert!(
                counter.writes.iter().all(|&w| w == 1),
                "{}x{} with {:?}",
                width,
                height,
                config
            );
        }
    }
}

#[test]
fn worker_counts_do_not_change_the_image() {
    let settings = settings(97, 61);
    let reference = render_with(&settings, &PipelineConfig::staged(1, 1))
        .unwrap()
        .raster;
    let configs = vec![
        PipelineConfig::staged(1, 1),
        PipelineConfig::staged(4, 2),
        PipelineConfig::staged(2, 7),
        PipelineConfig::direct(1),
        PipelineConfig::direct(6),
        PipelineConfig {
            queue_depth: 0,
            ..PipelineConfig::staged(3, 3)
        },
    ];
    for config in &configs {
        let raster = render_with(&settings, config).unwrap().raster;
        assert_eq!(raster.into_raw(), reference.clone().into_raw(), "{:?}", config);
    }
}

#[test]
fn pixels_match_a_single_threaded_reference() {
    let settings = settings(23, 19);
    let plane = PlaneMapper::new(&settings).unwrap();
    let palette = Palette::from_settings(&settings);
    let raster = render_with(&settings, &PipelineConfig::staged(4, 4))
        .unwrap()
        .raster;
    for pixel in plane.pixels() {
        let remaining = remaining_iterations(
            plane.pixel_to_point(&pixel),
            settings.max_iterations as u32,
            settings.escape_bound,
        );
        let expected = palette.colour(remaining);
        let actual = raster.get_pixel(pixel.0 as u32, pixel.1 as u32);
        assert_eq!(actual.channels(), expected.channels(), "{:?}", pixel);
    }
}

#[test]
fn small_staged_renders_shut_down_promptly() {
    let (done_tx, done_rx) = bounded(16);
    for &(computers, drawers) in &[(1, 1), (4, 4), (8, 2), (2, 8)] {
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            let config = PipelineConfig::staged(computers, drawers);
            let render = render_with(&settings(4, 4), &config);
            let _ = done_tx.send(render.is_ok());
        });
    }
    for _ in 0..4 {
        let ok = done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("render did not finish");
        assert!(ok);
    }
}

#[test]
fn the_centre_of_the_set_is_black() {
    let mut settings = settings(5, 5);
    settings.centre_x = 0.0;
    settings.centre_y = 0.0;
    let raster = render_with(&settings, &PipelineConfig::staged(2, 2))
        .unwrap()
        .raster;
    assert_eq!(raster.get_pixel(2, 2).channels(), &[0, 0, 0, 0xff]);
}

#[test]
fn moving_the_viewport_changes_the_image() {
    let mut settings = settings(32, 32);
    let before = render_with(&settings, &PipelineConfig::direct(2)).unwrap().raster;
    settings.apply(Movement::Right);
    settings.apply(Movement::ZoomIn);
    let after = render_with(&settings, &PipelineConfig::direct(2)).unwrap().raster;
    assert_ne!(before.into_raw(), after.into_raw());
}
