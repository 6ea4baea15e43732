use log::{debug, error, info, warn};
use map_range::MapRange;
use std::fs;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{Point2D, error::TouchError, output::EmptyListSendMode};

/// Rectangular region of the sensor frame (in pixels) that is considered for
/// touch detection. Bounds are half-open: `[x_min, x_max) x [y_min, y_max)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Roi {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl Roi {
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Roi {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    pub fn validate(&self) -> Result<(), TouchError> {
        if self.x_max <= self.x_min || self.y_max <= self.y_min {
            return Err(TouchError::InvalidConfiguration(format!(
                "degenerate region of interest {:?}",
                self
            )));
        }
        Ok(())
    }

    /// Check the ROI also fits inside a frame of the given size
    pub fn validate_within(&self, frame_width: u32, frame_height: u32) -> Result<(), TouchError> {
        self.validate()?;
        if self.x_max > frame_width || self.y_max > frame_height {
            return Err(TouchError::InvalidConfiguration(format!(
                "region of interest {:?} exceeds frame size {}x{}",
                self, frame_width, frame_height
            )));
        }
        Ok(())
    }

    /// Map a pixel-space position into the unit square, with the vertical
    /// axis flipped (0 at the bottom edge of the ROI, 1 at the top).
    pub fn normalise(&self, pixel: &Point2D) -> Point2D {
        let (px, py) = *pixel;
        let (x0, x1) = (self.x_min as f32, self.x_max as f32);
        let (y0, y1) = (self.y_min as f32, self.y_max as f32);
        (
            px.map_range(x0..x1, 0. ..1.),
            1. - py.map_range(y0..y1, 0. ..1.),
        )
    }
}

/// Foreground distance band (mm above the background surface) that counts as
/// a touch. A pixel qualifies when `min <= foreground < max`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthBand {
    pub min: u16,
    pub max: u16,
}

impl DepthBand {
    pub fn new(min: u16, max: u16) -> Self {
        DepthBand { min, max }
    }

    pub fn validate(&self) -> Result<(), TouchError> {
        if self.max <= self.min {
            return Err(TouchError::InvalidConfiguration(format!(
                "depth band must have max > min, got ({}, {})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, foreground: i32) -> bool {
        foreground >= self.min as i32 && foreground < self.max as i32
    }
}

/// Neighbourhood used when grouping touch pixels into blobs
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Four,
    Eight,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TouchConfig {
    /// Sensor resolution, in pixels
    pub frame_width: u32,
    pub frame_height: u32,

    // -------- DETECTION SETTINGS
    pub region_of_interest: Roi,

    /// Foreground range (mm) between background surface and object that counts as "touching"
    pub depth_band: DepthBand,

    /// Blobs smaller than this (in pixels) are dropped as sensor speckle
    pub min_area: usize,

    pub connectivity: Connectivity,

    // -------- CALIBRATION SETTINGS
    /// How many frames to average into the background model
    pub background_frames: usize,

    // -------- OUTPUT SETTINGS
    /// How to treat frames without any cursor events - either send an empty
    /// batch "once", "never" or "always"
    pub empty_send_mode: EmptyListSendMode,
}

impl Default for TouchConfig {
    fn default() -> Self {
        TouchConfig {
            frame_width: 640,
            frame_height: 480,
            region_of_interest: Roi::new(110, 120, 560, 320),
            depth_band: DepthBand::new(10, 20),
            min_area: 50,
            connectivity: Connectivity::Eight,
            background_frames: 30,
            empty_send_mode: EmptyListSendMode::Once,
        }
    }
}

impl TouchConfig {
    pub fn validate(&self) -> Result<(), TouchError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(TouchError::InvalidConfiguration(format!(
                "frame size must be non-zero, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        self.region_of_interest
            .validate_within(self.frame_width, self.frame_height)?;
        self.depth_band.validate()?;
        if self.min_area == 0 {
            return Err(TouchError::InvalidConfiguration(String::from(
                "min area must be at least 1 pixel",
            )));
        }
        if self.background_frames == 0 {
            return Err(TouchError::InvalidConfiguration(String::from(
                "background model needs at least 1 frame",
            )));
        }
        Ok(())
    }

    pub fn write_config_to_file(&self, config_file_path: &str) -> Result<()> {
        info!("Current state of config: {:?}", self);
        let text = serde_json::to_string_pretty(self)?;
        match fs::write(config_file_path, text) {
            Ok(()) => {
                info!("Wrote config to file: {:?}", config_file_path);
                Ok(())
            }
            Err(e) => {
                error!("Error writing config to file: {:?}", e);
                Err(anyhow!("Failed to write config to {}: {}", config_file_path, e))
            }
        }
    }
}

pub fn load_config_from_file(config_file_path: &str) -> Result<TouchConfig> {
    let config = TouchConfig::default();
    debug!("Created init config object {:?}", config);

    match fs::read_to_string(config_file_path) {
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                warn!(
                    "Touch Config file not found at {}, will use defaults",
                    &config_file_path
                );
                Ok(config)
            } else {
                Err(anyhow!(
                    "Failed to load Touch Config from disk; error: {:?}",
                    e
                ))
            }
        }
        Ok(s) => {
            info!("Loaded Touch config OK from \"{}\"", config_file_path);
            match serde_json::from_str::<TouchConfig>(&s) {
                Ok(loaded_config) => {
                    debug!("Config parsed data from file: {:?}", &loaded_config);
                    Ok(loaded_config)
                }
                Err(e) => Err(anyhow!("Failed to parse config data: {}", e)),
            }
        }
    }
}
