use std::collections::VecDeque;

use log::debug;
use ndarray::{Array2, Zip, s};
use serde::{Deserialize, Serialize};

use crate::{
    Point2D,
    depth_source::DepthFrame,
    error::TouchError,
    systems::background::BackgroundModel,
    touch_config::{Connectivity, DepthBand, Roi, TouchConfig},
};

/// A blob of touch pixels found in a single frame. Centroid is in
/// pixel coordinates, where pixel `(i, j)` covers `[i, i+1) x [j, j+1)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TouchCandidate {
    pub x: f32,
    pub y: f32,
    pub area: usize,
}

impl TouchCandidate {
    pub fn position(&self) -> Point2D {
        (self.x, self.y)
    }
}

const NEIGHBOURS_FOUR: &[(isize, isize)] = &[(0, 1), (0, -1), (1, 0), (-1, 0)];
const NEIGHBOURS_EIGHT: &[(isize, isize)] = &[
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

pub struct TouchDetector {
    roi: Roi,
    depth_band: DepthBand,
    min_area: usize,
    connectivity: Connectivity,
}

impl TouchDetector {
    pub fn new(config: &TouchConfig) -> Self {
        TouchDetector {
            roi: config.region_of_interest,
            depth_band: config.depth_band,
            min_area: config.min_area,
            connectivity: config.connectivity,
        }
    }

    /// Apply (already validated) settings from the config
    pub fn update_settings(&mut self, config: &TouchConfig) {
        *self = TouchDetector::new(config);
    }

    pub fn detect(
        &self,
        frame: &DepthFrame,
        background: &BackgroundModel,
    ) -> Result<Vec<TouchCandidate>, TouchError> {
        detect_with_connectivity(
            frame,
            background,
            &self.roi,
            &self.depth_band,
            self.min_area,
            self.connectivity,
        )
    }

    /// Candidates mapped into the unit square of the ROI
    pub fn detect_normalised(
        &self,
        frame: &DepthFrame,
        background: &BackgroundModel,
    ) -> Result<Vec<Point2D>, TouchError> {
        Ok(self
            .detect(frame, background)?
            .iter()
            .map(|c| self.roi.normalise(&c.position()))
            .collect())
    }
}

/// Find touch blobs (8-connected) inside the ROI whose height above the
/// background lies within the depth band
pub fn detect(
    frame: &DepthFrame,
    background: &BackgroundModel,
    roi: &Roi,
    depth_band: &DepthBand,
    min_area: usize,
) -> Result<Vec<TouchCandidate>, TouchError> {
    detect_with_connectivity(
        frame,
        background,
        roi,
        depth_band,
        min_area,
        Connectivity::Eight,
    )
}

pub fn detect_with_connectivity(
    frame: &DepthFrame,
    background: &BackgroundModel,
    roi: &Roi,
    depth_band: &DepthBand,
    min_area: usize,
    connectivity: Connectivity,
) -> Result<Vec<TouchCandidate>, TouchError> {
    roi.validate_within(frame.width(), frame.height())?;
    depth_band.validate()?;
    if min_area == 0 {
        return Err(TouchError::InvalidConfiguration(String::from(
            "min area must be at least 1 pixel",
        )));
    }
    if frame.width() != background.width() || frame.height() != background.height() {
        return Err(TouchError::InvalidInput(format!(
            "frame is {}x{} but background model is {}x{}",
            frame.width(),
            frame.height(),
            background.width(),
            background.height()
        )));
    }

    let (rows, cols) = (
        roi.y_min as usize..roi.y_max as usize,
        roi.x_min as usize..roi.x_max as usize,
    );
    let depth = frame.view().slice_move(s![rows.clone(), cols.clone()]);
    let reference = background.view().slice_move(s![rows, cols]);

    // Positive foreground: something sits between the sensor and the surface
    let mut mask = Array2::from_elem(depth.raw_dim(), false);
    Zip::from(&mut mask)
        .and(&depth)
        .and(&reference)
        .for_each(|touch, &d, &b| *touch = depth_band.contains(b as i32 - d as i32));

    let neighbours = match connectivity {
        Connectivity::Four => NEIGHBOURS_FOUR,
        Connectivity::Eight => NEIGHBOURS_EIGHT,
    };

    let (rows, cols) = mask.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut candidates = Vec::new();
    let mut queue = VecDeque::new();

    for row in 0..rows {
        for col in 0..cols {
            if !mask[[row, col]] || visited[[row, col]] {
                continue;
            }

            visited[[row, col]] = true;
            queue.push_back((row, col));
            let mut area = 0usize;
            let (mut sum_x, mut sum_y) = (0f64, 0f64);

            while let Some((r, c)) = queue.pop_front() {
                area += 1;
                sum_x += c as f64;
                sum_y += r as f64;

                for (dr, dc) in neighbours {
                    let (Some(nr), Some(nc)) =
                        (r.checked_add_signed(*dr), c.checked_add_signed(*dc))
                    else {
                        continue;
                    };
                    if nr < rows && nc < cols && mask[[nr, nc]] && !visited[[nr, nc]] {
                        visited[[nr, nc]] = true;
                        queue.push_back((nr, nc));
                    }
                }
            }

            if area < min_area {
                debug!("Dropped blob of {} px (< {})", area, min_area);
                continue;
            }

            candidates.push(TouchCandidate {
                x: (roi.x_min as f64 + sum_x / area as f64 + 0.5) as f32,
                y: (roi.y_min as f64 + sum_y / area as f64 + 0.5) as f32,
                area,
            });
        }
    }

    Ok(candidates)
}
