use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, ErrorKind, Read},
};

use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use crate::error::TouchError;

/// One depth image, distances in millimetres, indexed `[row, column]`
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    depth: Array2<u16>,
}

impl DepthFrame {
    pub fn new(depth: Array2<u16>) -> Self {
        DepthFrame { depth }
    }

    /// Build a frame from row-major samples
    pub fn from_vec(width: u32, height: u32, samples: Vec<u16>) -> Result<Self, TouchError> {
        Array2::from_shape_vec((height as usize, width as usize), samples)
            .map(DepthFrame::new)
            .map_err(|e| TouchError::InvalidInput(format!("bad depth frame shape: {}", e)))
    }

    /// A flat surface at the same distance everywhere
    pub fn uniform(width: u32, height: u32, depth: u16) -> Self {
        DepthFrame::new(Array2::from_elem((height as usize, width as usize), depth))
    }

    pub fn width(&self) -> u32 {
        self.depth.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.depth.nrows() as u32
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        self.depth.get((y as usize, x as usize)).copied()
    }

    pub fn view(&self) -> ArrayView2<'_, u16> {
        self.depth.view()
    }

    /// Overwrite a rectangular block; used to stage synthetic touches
    pub fn with_block(mut self, x: u32, y: u32, width: u32, height: u32, depth: u16) -> Self {
        for row in y..(y + height).min(self.height()) {
            for col in x..(x + width).min(self.width()) {
                self.depth[[row as usize, col as usize]] = depth;
            }
        }
        self
    }
}

/// Pull-based supplier of depth frames. `next_frame` may block until the
/// sensor has data; an error ends the frame loop.
pub trait DepthSource {
    fn next_frame(&mut self) -> Result<DepthFrame, TouchError>;
}

/// Plays back raw recordings: consecutive frames of little-endian `u16`
/// samples, row-major, with a fixed resolution.
pub struct RecordedDepthSource<R: Read> {
    reader: R,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl RecordedDepthSource<BufReader<File>> {
    pub fn open(path: &str, width: u32, height: u32) -> Result<Self, TouchError> {
        let file = File::open(path).map_err(|e| {
            TouchError::SensorAcquisitionFailure(format!("cannot open recording {}: {}", path, e))
        })?;
        info!(
            "Playing back depth recording \"{}\" at {}x{}",
            path, width, height
        );
        Ok(RecordedDepthSource::new(BufReader::new(file), width, height))
    }
}

impl<R: Read> RecordedDepthSource<R> {
    pub fn new(reader: R, width: u32, height: u32) -> Self {
        RecordedDepthSource {
            reader,
            width,
            height,
            frames_read: 0,
        }
    }
}

impl<R: Read> DepthSource for RecordedDepthSource<R> {
    fn next_frame(&mut self) -> Result<DepthFrame, TouchError> {
        let mut bytes = vec![0u8; self.width as usize * self.height as usize * 2];
        let mut filled = 0;
        while filled < bytes.len() {
            match self.reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TouchError::SensorAcquisitionFailure(format!(
                        "failed to read frame #{}: {}",
                        self.frames_read + 1,
                        e
                    )));
                }
            }
        }
        if filled == 0 {
            return Err(TouchError::EndOfStream {
                frames: self.frames_read,
            });
        }
        if filled < bytes.len() {
            return Err(TouchError::SensorAcquisitionFailure(format!(
                "truncated frame #{}: got {} of {} bytes",
                self.frames_read + 1,
                filled,
                bytes.len()
            )));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        self.frames_read += 1;
        debug!("Read recorded frame #{}", self.frames_read);
        DepthFrame::from_vec(self.width, self.height, samples)
    }
}

/// Hands out a prepared sequence of frames, then reports the sensor as gone
#[derive(Default)]
pub struct ScriptedDepthSource {
    frames: VecDeque<DepthFrame>,
}

impl ScriptedDepthSource {
    pub fn new(frames: impl IntoIterator<Item = DepthFrame>) -> Self {
        ScriptedDepthSource {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl DepthSource for ScriptedDepthSource {
    fn next_frame(&mut self) -> Result<DepthFrame, TouchError> {
        self.frames.pop_front().ok_or_else(|| {
            TouchError::SensorAcquisitionFailure(String::from("no more frames available"))
        })
    }
}
