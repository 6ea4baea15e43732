use thiserror::Error;

/// Errors raised by calibration, detection and tracking
#[derive(Debug, Error)]
pub enum TouchError {
    /// Input data that cannot be processed, e.g. an empty calibration set
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration rejected at setup (or by a runtime setter)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The depth source could not deliver a frame; fatal to the frame loop
    #[error("Sensor acquisition failure: {0}")]
    SensorAcquisitionFailure(String),

    /// A finite depth stream (e.g. a recording) ended cleanly on a frame boundary
    #[error("Depth stream ended after {frames} frames")]
    EndOfStream { frames: u64 },

    /// Frame indices passed to the tracker must be strictly increasing
    #[error("Frame index {got} is out of sequence; last committed frame was {last}")]
    OutOfSequence { last: u64, got: u64 },
}
