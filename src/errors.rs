// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types for configuration, rendering and settings persistence.

use serde_json;
use std::io;

/// A settings record or pipeline configuration that cannot be
/// rendered.  Always detected before any worker thread is started.
#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
    /// The raster must be at least one pixel wide.
    #[fail(display = "width must be positive, got {}", _0)]
    NonPositiveWidth(i64),

    /// The raster must be at least one pixel tall.
    #[fail(display = "height must be positive, got {}", _0)]
    NonPositiveHeight(i64),

    /// The raster is larger than an image buffer can address.
    #[fail(display = "raster of {}x{} is too large", _0, _1)]
    RasterTooLarge(i64, i64),

    /// The viewport scale must be a positive, finite number.
    #[fail(display = "scale must be positive, got {}", _0)]
    NonPositiveScale(f64),

    /// The centre of the viewport must be a finite complex number.
    #[fail(display = "centre must be finite, got {},{}", _0, _1)]
    NonFiniteCentre(f64, f64),

    /// The kernel needs at least one iteration to work with.
    #[fail(display = "maximum iterations must be positive, got {}", _0)]
    NonPositiveIterations(i64),

    /// The iteration cap does not fit the kernel's counter.
    #[fail(display = "maximum iterations {} is too large", _0)]
    TooManyIterations(i64),

    /// The escape bound must be a positive, finite number.
    #[fail(display = "escape bound must be positive, got {}", _0)]
    NonPositiveBound(f64),

    /// Every stage of the pipeline needs at least one worker.
    #[fail(display = "the {} stage needs at least one worker", _0)]
    NoWorkers(&'static str),
}

/// Everything that can stop a render from producing a raster.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The settings or pipeline configuration were rejected.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(#[cause] ConfigError),

    /// The raster buffer could not be allocated.
    #[fail(display = "could not allocate a {}x{} raster", width, height)]
    RasterAllocation {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A worker thread panicked; the raster is incomplete and discarded.
    #[fail(display = "a pipeline worker exited abnormally")]
    WorkerPanicked,

    /// A queue lost all of its consumers before every message was delivered.
    #[fail(display = "the {} queue closed before shutdown completed", _0)]
    QueueDisconnected(&'static str),
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        RenderError::Config(err)
    }
}

/// Failure to load or store a settings file.
#[derive(Debug, Fail)]
pub enum SettingsError {
    /// The file could not be read or written.
    #[fail(display = "settings file: {}", _0)]
    Io(#[cause] io::Error),

    /// The file did not contain a valid settings record.
    #[fail(display = "settings format: {}", _0)]
    Parse(#[cause] serde_json::Error),
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Parse(err)
    }
}
