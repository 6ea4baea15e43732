use log::{debug, info};
use ndarray::{Array2, ArrayView2, Zip};

use crate::{depth_source::DepthFrame, error::TouchError};

/// Averaged reference surface representing "no touch"
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundModel {
    depth: Array2<u16>,
    frames_used: usize,
}

impl BackgroundModel {
    /// Per-pixel mean of all given frames. The surface is assumed to be
    /// unobstructed while these were captured.
    pub fn build(frames: &[DepthFrame]) -> Result<BackgroundModel, TouchError> {
        let mut sampler = BackgroundSampler::new(frames.len());
        for frame in frames {
            if let Some(model) = sampler.add_sample(frame)? {
                return Ok(model);
            }
        }
        Err(TouchError::InvalidInput(String::from(
            "background model needs at least one frame",
        )))
    }

    pub fn width(&self) -> u32 {
        self.depth.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.depth.nrows() as u32
    }

    pub fn frames_used(&self) -> usize {
        self.frames_used
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        self.depth.get((y as usize, x as usize)).copied()
    }

    pub fn view(&self) -> ArrayView2<'_, u16> {
        self.depth.view()
    }
}

/// Accumulates frames one at a time until enough have been seen to produce
/// a [`BackgroundModel`]
pub struct BackgroundSampler {
    accumulator: Option<Array2<f64>>,
    samples_required: usize,
    samples_taken: usize,
}

impl BackgroundSampler {
    pub fn new(samples_required: usize) -> BackgroundSampler {
        BackgroundSampler {
            accumulator: None,
            samples_required,
            samples_taken: 0,
        }
    }

    /** Add a frame to the running sum; returns the finished model once
     * the required number of frames has been added, otherwise None
     */
    pub fn add_sample(&mut self, frame: &DepthFrame) -> Result<Option<BackgroundModel>, TouchError> {
        if self.is_complete() {
            return Err(TouchError::InvalidInput(String::from(
                "background sampler already has all the frames it needs",
            )));
        }

        let view = frame.view();
        let accumulator = self
            .accumulator
            .get_or_insert_with(|| Array2::zeros(view.raw_dim()));
        if accumulator.dim() != view.dim() {
            return Err(TouchError::InvalidInput(format!(
                "calibration frame is {}x{}, expected {}x{}",
                view.ncols(),
                view.nrows(),
                accumulator.ncols(),
                accumulator.nrows()
            )));
        }

        Zip::from(&mut *accumulator)
            .and(&view)
            .for_each(|acc, &d| *acc += d as f64);
        self.samples_taken += 1;
        debug!(
            "Background sample {}/{}",
            self.samples_taken, self.samples_required
        );

        if self.samples_taken < self.samples_required {
            return Ok(None);
        }

        let count = self.samples_taken as f64;
        let depth = accumulator.mapv(|sum| (sum / count).round() as u16);
        info!(
            "Built background model {}x{} from {} frames",
            depth.ncols(),
            depth.nrows(),
            self.samples_taken
        );
        Ok(Some(BackgroundModel {
            depth,
            frames_used: self.samples_taken,
        }))
    }

    pub fn is_complete(&self) -> bool {
        self.samples_taken >= self.samples_required
    }

    pub fn samples_remaining(&self) -> usize {
        self.samples_required.saturating_sub(self.samples_taken)
    }
}
