extern crate clap;
extern crate env_logger;
extern crate image;
#[macro_use]
extern crate log;
extern crate mandelbrot;

use clap::{App, Arg, ArgMatches};
use image::png::PNGEncoder;
use image::{ColorType, RgbaImage};
use mandelbrot::{Architecture, Movement, PipelineConfig, RenderError, Settings};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Splits `s` on `separator` and parses every part, requiring exactly
/// `count` of them.
fn parse_parts<T: FromStr>(s: &str, separator: char, count: usize) -> Option<Vec<T>> {
    let parts = s
        .split(separator)
        .map(|part| T::from_str(part.trim()).ok())
        .collect::<Option<Vec<T>>>()?;
    if parts.len() == count {
        Some(parts)
    } else {
        None
    }
}

fn parse_pair<T: FromStr + Copy>(s: &str, separator: char) -> Option<(T, T)> {
    parse_parts(s, separator, 2).map(|p| (p[0], p[1]))
}

fn parse_triple<T: FromStr + Copy>(s: &str, separator: char) -> Option<(T, T, T)> {
    parse_parts(s, separator, 3).map(|p| (p[0], p[1], p[2]))
}

/// Adapts a parser into a clap validator with a fixed message.
fn parses<T>(parsed: Option<T>, err: &str) -> Result<(), String> {
    parsed.map(|_| ()).ok_or_else(|| err.to_string())
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    range: (T, T),
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    let value = T::from_str(s).map_err(|_| isnotanumber_err.to_string())?;
    if value < range.0 || value > range.1 {
        return Err(isnotinrange_err.to_string());
    }
    Ok(())
}

const OUTPUT: &str = "output";
const SETTINGS: &str = "settings";
const SAVE_SETTINGS: &str = "save-settings";
const SIZE: &str = "size";
const CENTRE: &str = "center";
const SCALE: &str = "scale";
const ITERATIONS: &str = "iterations";
const BOUND: &str = "bound";
const FACTORS: &str = "factors";
const MOVE: &str = "move";
const THREADS: &str = "threads";
const DRAW_THREADS: &str = "draw-threads";
const QUEUE_DEPTH: &str = "queue-depth";
const DIRECT: &str = "direct";

const MAX_THREADS: usize = 1024;

fn threads_validator(s: String) -> Result<(), String> {
    validate_range(
        &s,
        (1, MAX_THREADS),
        "Could not parse thread count",
        &format!("Thread count must be between 1 and {}", MAX_THREADS),
    )
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .about("Multi-threaded Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("image.png")
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(SETTINGS)
                .long(SETTINGS)
                .short("c")
                .takes_value(true)
                .default_value("settings.json")
                .help("Settings file; defaults are used when it does not exist"),
        )
        .arg(
            Arg::with_name(SAVE_SETTINGS)
                .long(SAVE_SETTINGS)
                .help("Write the final settings back to the settings file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .validator(|s| parses(parse_pair::<u32>(&s, 'x'), "Could not parse output image size"))
                .help("Size of output image, e.g. 800x600"),
        )
        .arg(
            Arg::with_name(CENTRE)
                .long(CENTRE)
                .short("p")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| parses(parse_pair::<f64>(&s, ','), "Could not parse centre point"))
                .help("Centre of the viewport on the complex plane, e.g. -0.5,0"),
        )
        .arg(
            Arg::with_name(SCALE)
                .long(SCALE)
                .short("z")
                .takes_value(true)
                .validator(|s| parses(f64::from_str(&s).ok(), "Could not parse scale"))
                .help("Distance from the centre to the edge of the viewport"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        (1, u32::max_value()),
                        "Could not parse iteration count",
                        "Iteration count must be positive",
                    )
                })
                .help("Maximum number of iterations per pixel"),
        )
        .arg(
            Arg::with_name(BOUND)
                .long(BOUND)
                .short("b")
                .takes_value(true)
                .validator(|s| parses(f64::from_str(&s).ok(), "Could not parse escape bound"))
                .help("Modulus beyond which an orbit has escaped"),
        )
        .arg(
            Arg::with_name(FACTORS)
                .long(FACTORS)
                .short("f")
                .takes_value(true)
                .allow_hyphen_values(true)
                .validator(|s| parses(parse_triple::<i64>(&s, ','), "Could not parse colour factors"))
                .help("Red, green and blue multipliers, e.g. 3,5,7"),
        )
        .arg(
            Arg::with_name(MOVE)
                .long(MOVE)
                .short("m")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .validator(|s| Movement::from_str(&s).map(|_| ()))
                .help("Pan or zoom before rendering: left, right, up, down, in, out"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(threads_validator)
                .help("Number of compute threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(DRAW_THREADS)
                .long(DRAW_THREADS)
                .short("d")
                .takes_value(true)
                .validator(threads_validator)
                .help("Number of draw threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(QUEUE_DEPTH)
                .long(QUEUE_DEPTH)
                .short("q")
                .takes_value(true)
                .validator(|s| parses(usize::from_str(&s).ok(), "Could not parse queue depth"))
                .help("Capacity of the work queues"),
        )
        .arg(
            Arg::with_name(DIRECT)
                .long(DIRECT)
                .help("Let compute threads draw their own pixels instead of using draw threads"),
        )
        .get_matches()
}

fn load_settings(path: &str) -> Settings {
    if !Path::new(path).exists() {
        info!("{} not found, using default settings", path);
        return Settings::default();
    }
    match Settings::load(path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Settings failure: {}", e);
            std::process::exit(1);
        }
    }
}

// The validators above have already checked every value parsed here.
fn apply_overrides(settings: &mut Settings, matches: &ArgMatches) {
    if let Some((width, height)) = matches.value_of(SIZE).and_then(|s| parse_pair::<u32>(s, 'x')) {
        settings.width = i64::from(width);
        settings.height = i64::from(height);
    }
    if let Some((re, im)) = matches.value_of(CENTRE).and_then(|s| parse_pair::<f64>(s, ',')) {
        settings.centre_x = re;
        settings.centre_y = im;
    }
    if let Some(scale) = matches.value_of(SCALE).and_then(|s| f64::from_str(s).ok()) {
        settings.scale = scale;
    }
    if let Some(limit) = matches.value_of(ITERATIONS).and_then(|s| u32::from_str(s).ok()) {
        settings.max_iterations = i64::from(limit);
    }
    if let Some(bound) = matches.value_of(BOUND).and_then(|s| f64::from_str(s).ok()) {
        settings.escape_bound = bound;
    }
    if let Some((r, g, b)) = matches.value_of(FACTORS).and_then(|s| parse_triple::<i64>(s, ',')) {
        settings.red_factor = r;
        settings.green_factor = g;
        settings.blue_factor = b;
    }
    if let Some(moves) = matches.values_of(MOVE) {
        for movement in moves.filter_map(|m| Movement::from_str(m).ok()) {
            settings.apply(movement);
        }
    }
}

fn pipeline_config(matches: &ArgMatches) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    if matches.is_present(DIRECT) {
        config.architecture = Architecture::DirectWrite;
    }
    if let Some(threads) = matches.value_of(THREADS).and_then(|s| usize::from_str(s).ok()) {
        config.compute_workers = threads;
    }
    if let Some(threads) = matches.value_of(DRAW_THREADS).and_then(|s| usize::from_str(s).ok()) {
        config.draw_workers = threads;
    }
    if let Some(depth) = matches.value_of(QUEUE_DEPTH).and_then(|s| usize::from_str(s).ok()) {
        config.queue_depth = depth;
    }
    config
}

fn write_image(outfile: &str, raster: &RgbaImage) -> Result<(), std::io::Error> {
    let mut output = BufWriter::new(File::create(outfile)?);
    PNGEncoder::new(&mut output).encode(
        raster,
        raster.width(),
        raster.height(),
        ColorType::RGBA(8),
    )?;
    output.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    let settings_path = matches.value_of(SETTINGS).unwrap_or("settings.json");
    let output = matches.value_of(OUTPUT).unwrap_or("image.png");

    let mut settings = load_settings(settings_path);
    apply_overrides(&mut settings, &matches);
    let config = pipeline_config(&matches);

    if matches.is_present(SAVE_SETTINGS) {
        if let Err(e) = settings.validate() {
            eprintln!("Render failure: {}", RenderError::from(e));
            std::process::exit(1);
        }
        if let Err(e) = settings.save(settings_path) {
            eprintln!("Settings failure: {}", e);
            std::process::exit(1);
        }
    }

    match mandelbrot::render_with(&settings, &config) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(render) => {
            if let Err(e) = write_image(output, &render.raster) {
                eprintln!("Could not write {}: {}", output, e);
                std::process::exit(1);
            }
            println!("Total time: {:.5} seconds", render.elapsed_seconds());
        }
    }
}
