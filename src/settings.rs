// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The Settings record: where the viewport sits on the complex plane,
//! how large the raster is, and how iteration counts become colours.
//!
//! A Settings value is read-only for the duration of a render.  Between
//! renders a caller may nudge it around with [`Settings::apply`], and
//! persist it as JSON with [`Settings::save`] and [`Settings::load`].
//! The JSON keys are PascalCase (`Width`, `CenterX`, ...) so that files
//! written by older front ends load without conversion.

use serde::{Deserialize, Serialize};
use serde_json;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use errors::{ConfigError, SettingsError};

/// Everything one render needs to know.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    /// Raster width in pixels.
    pub width: i64,
    /// Raster height in pixels.
    pub height: i64,
    /// Distance on the complex plane from the centre to the edge of
    /// the raster, along each axis.
    pub scale: f64,
    /// Real part of the viewport centre.
    #[serde(rename = "CenterX")]
    pub centre_x: f64,
    /// Imaginary part of the viewport centre.
    #[serde(rename = "CenterY")]
    pub centre_y: f64,
    /// Multiplier for the red channel.
    pub red_factor: i64,
    /// Multiplier for the green channel.
    pub green_factor: i64,
    /// Multiplier for the blue channel.
    pub blue_factor: i64,
    /// Step size used by [`Settings::apply`].
    pub moving_speed: f64,
    /// The iteration cap handed to the escape-time kernel.
    pub max_iterations: i64,
    /// Orbits whose modulus exceeds this bound have diverged.
    pub escape_bound: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            width: 3000,
            height: 2000,
            scale: 2.0,
            centre_x: -0.5,
            centre_y: 0.0,
            red_factor: 1,
            green_factor: 1,
            blue_factor: 1,
            moving_speed: 0.1,
            max_iterations: 200,
            escape_bound: 6.0,
        }
    }
}

impl Settings {
    /// Check every precondition of a render.  Nothing downstream of
    /// this check can fail on account of the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width <= 0 {
            return Err(ConfigError::NonPositiveWidth(self.width));
        }
        if self.height <= 0 {
            return Err(ConfigError::NonPositiveHeight(self.height));
        }
        if self.width > i64::from(u32::max_value()) || self.height > i64::from(u32::max_value())
        {
            return Err(ConfigError::RasterTooLarge(self.width, self.height));
        }
        if !(self.scale > 0.0) || !self.scale.is_finite() {
            return Err(ConfigError::NonPositiveScale(self.scale));
        }
        if !self.centre_x.is_finite() || !self.centre_y.is_finite() {
            return Err(ConfigError::NonFiniteCentre(self.centre_x, self.centre_y));
        }
        if self.max_iterations <= 0 {
            return Err(ConfigError::NonPositiveIterations(self.max_iterations));
        }
        if self.max_iterations > i64::from(u32::max_value()) {
            return Err(ConfigError::TooManyIterations(self.max_iterations));
        }
        if !(self.escape_bound > 0.0) || !self.escape_bound.is_finite() {
            return Err(ConfigError::NonPositiveBound(self.escape_bound));
        }
        Ok(())
    }

    /// Raster dimensions.  Only meaningful after [`Settings::validate`].
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    /// The iteration cap as the kernel's counter type.  Only meaningful
    /// after [`Settings::validate`].
    pub fn limit(&self) -> u32 {
        self.max_iterations as u32
    }

    /// Move or zoom the viewport by one step of `moving_speed`.  Panning
    /// is proportional to the current scale, so a step covers the same
    /// fraction of the raster at every zoom level.  Zooming is linear
    /// and may drive the scale to zero or below, which the next render
    /// will reject.
    pub fn apply(&mut self, movement: Movement) {
        let step = self.scale * self.moving_speed;
        match movement {
            Movement::Right => self.centre_x += step,
            Movement::Left => self.centre_x -= step,
            Movement::Up => self.centre_y -= step,
            Movement::Down => self.centre_y += step,
            Movement::ZoomIn => self.scale -= self.moving_speed,
            Movement::ZoomOut => self.scale += self.moving_speed,
        }
    }

    /// Read a settings record from a JSON file.  Keys missing from the
    /// file take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings, SettingsError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write this settings record to a JSON file, replacing it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// One navigation step across the complex plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Movement {
    /// Pan towards larger real values.
    Right,
    /// Pan towards smaller real values.
    Left,
    /// Pan towards the top of the raster (smaller imaginary values).
    Up,
    /// Pan towards the bottom of the raster.
    Down,
    /// Shrink the visible region.
    ZoomIn,
    /// Grow the visible region.
    ZoomOut,
}

impl FromStr for Movement {
    type Err = String;

    /// Accepts the direction names and the keyboard letters that used
    /// to drive them (`wasd` to pan, `i`/`o` to zoom).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "right" | "d" => Ok(Movement::Right),
            "left" | "a" => Ok(Movement::Left),
            "up" | "w" => Ok(Movement::Up),
            "down" | "s" => Ok(Movement::Down),
            "in" | "i" => Ok(Movement::ZoomIn),
            "out" | "o" => Ok(Movement::ZoomOut),
            _ => Err(format!("Unknown movement '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile;

    #[test]
    fn defaults_are_renderable() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_empty_rasters() {
        let mut s = Settings::default();
        s.width = 0;
        assert_eq!(s.validate(), Err(ConfigError::NonPositiveWidth(0)));
        s.width = 10;
        s.height = -4;
        assert_eq!(s.validate(), Err(ConfigError::NonPositiveHeight(-4)));
    }

    #[test]
    fn validate_rejects_bad_kernel_parameters() {
        let mut s = Settings::default();
        s.max_iterations = 0;
        assert_eq!(s.validate(), Err(ConfigError::NonPositiveIterations(0)));

        let mut s = Settings::default();
        s.max_iterations = i64::from(u32::max_value()) + 1;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.escape_bound = 0.0;
        assert_eq!(s.validate(), Err(ConfigError::NonPositiveBound(0.0)));
    }

    #[test]
    fn validate_rejects_degenerate_viewports() {
        let mut s = Settings::default();
        s.scale = -1.0;
        assert_eq!(s.validate(), Err(ConfigError::NonPositiveScale(-1.0)));

        let mut s = Settings::default();
        s.scale = ::std::f64::NAN;
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.centre_x = ::std::f64::INFINITY;
        assert!(s.validate().is_err());
    }

    #[test]
    fn panning_is_proportional_to_scale() {
        let mut s = Settings::default();
        s.scale = 2.0;
        s.moving_speed = 0.25;
        s.apply(Movement::Right);
        assert_eq!(s.centre_x, 0.0);
        s.apply(Movement::Up);
        assert_eq!(s.centre_y, -0.5);
        s.apply(Movement::Down);
        s.apply(Movement::Down);
        assert_eq!(s.centre_y, 0.5);
        s.apply(Movement::Left);
        assert_eq!(s.centre_x, -0.5);
    }

    #[test]
    fn zooming_changes_scale_linearly() {
        let mut s = Settings::default();
        s.scale = 1.0;
        s.moving_speed = 0.5;
        s.apply(Movement::ZoomIn);
        assert_eq!(s.scale, 0.5);
        s.apply(Movement::ZoomOut);
        s.apply(Movement::ZoomOut);
        assert_eq!(s.scale, 1.5);
    }

    #[test]
    fn zooming_past_zero_is_left_for_validation() {
        let mut s = Settings::default();
        s.scale = 0.1;
        s.moving_speed = 0.1;
        s.apply(Movement::ZoomIn);
        assert!(s.validate().is_err());
    }

    #[test]
    fn movements_parse_from_names_and_keys() {
        assert_eq!("right".parse::<Movement>(), Ok(Movement::Right));
        assert_eq!("W".parse::<Movement>(), Ok(Movement::Up));
        assert_eq!("in".parse::<Movement>(), Ok(Movement::ZoomIn));
        assert_eq!("o".parse::<Movement>(), Ok(Movement::ZoomOut));
        assert!("sideways".parse::<Movement>().is_err());
    }

    #[test]
    fn settings_survive_a_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.width = 640;
        s.red_factor = 7;
        s.centre_y = 0.25;
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(
            r#"{"Width":800,"Height":600,"Scale":1.5,"CenterX":-0.75,"CenterY":0.1,
                "RedFactor":3,"GreenFactor":5,"BlueFactor":7,"MovingSpeed":0.2}"#,
        )
        .unwrap();
        assert_eq!(s.width, 800);
        assert_eq!(s.centre_x, -0.75);
        assert_eq!(s.blue_factor, 7);
        assert_eq!(s.max_iterations, 200);
        assert_eq!(s.escape_bound, 6.0);
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        match Settings::load(dir.path().join("absent.json")) {
            Err(SettingsError::Io(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn failed_writes_are_io_errors() {
        match Settings::default().save("/dev/full") {
            Err(SettingsError::Io(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn garbage_files_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        ::std::fs::write(&path, "{ not json").unwrap();
        match Settings::load(&path) {
            Err(SettingsError::Parse(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }
}
