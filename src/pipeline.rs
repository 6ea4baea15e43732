use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    depth_source::{DepthFrame, DepthSource},
    error::TouchError,
    output::{EmptyBatchFilter, EventSink},
    systems::{
        Systems, announcer::PeriodicAnnouncer, background::BackgroundSampler,
        cursor_tracking::CursorTracker,
    },
    touch_config::{Connectivity, DepthBand, Roi, TouchConfig},
    tracking::FrameEvents,
};

/// Depth frames in, cursor lifecycle events out. Synchronous: every call
/// runs to completion before the next frame is pulled.
pub struct TouchPipeline {
    config: TouchConfig,
    systems: Systems,
    empty_filter: EmptyBatchFilter,
    frames_processed: u64,
}

impl TouchPipeline {
    pub fn new(config: TouchConfig) -> Result<Self, TouchError> {
        config.validate()?;
        let systems = Systems::new(&config);
        let empty_filter = EmptyBatchFilter::new(config.empty_send_mode);
        Ok(TouchPipeline {
            config,
            systems,
            empty_filter,
            frames_processed: 0,
        })
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    pub fn tracker(&self) -> &CursorTracker {
        &self.systems.cursor_tracker
    }

    pub fn is_calibrated(&self) -> bool {
        self.systems.background.is_some()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Feed one frame towards a new background model; returns true once the
    /// model has been (re)built
    pub fn add_calibration_frame(&mut self, frame: &DepthFrame) -> Result<bool, TouchError> {
        self.check_frame_size(frame)?;
        match self.systems.background_sampler.add_sample(frame)? {
            Some(model) => {
                self.systems.background = Some(model);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Build the background model from the next `background_frames` frames.
    /// Keep the surface clear while this runs.
    pub fn calibrate(&mut self, source: &mut dyn DepthSource) -> Result<(), TouchError> {
        info!(
            "Calibrating background from {} frames; keep hands off the surface",
            self.config.background_frames
        );
        self.systems.background_sampler = BackgroundSampler::new(self.config.background_frames);
        loop {
            let frame = source.next_frame()?;
            if self.add_calibration_frame(&frame)? {
                return Ok(());
            }
        }
    }

    /// Explicitly rebuild the background model; existing cursors are kept
    pub fn recalibrate(&mut self, source: &mut dyn DepthSource) -> Result<(), TouchError> {
        warn!("Re-calibration requested; replacing background model");
        self.calibrate(source)
    }

    pub fn process_frame(&mut self, frame: &DepthFrame) -> Result<FrameEvents, TouchError> {
        let background = self.systems.background.as_ref().ok_or_else(|| {
            TouchError::InvalidInput(String::from(
                "no background model yet; calibrate before processing frames",
            ))
        })?;

        let points = self
            .systems
            .touch_detector
            .detect_normalised(frame, background)?;

        let frame_index = self.frames_processed + 1;
        let events = self.systems.cursor_tracker.update(&points, frame_index)?;
        self.frames_processed = frame_index;

        debug!(
            "Frame {}: {} candidates, {} events",
            frame_index,
            points.len(),
            events.len()
        );

        Ok(FrameEvents {
            frame: frame_index,
            events,
        })
    }

    /// Hand a batch to the sink, subject to the empty-batch policy
    pub fn publish(&mut self, batch: &FrameEvents, sink: &mut dyn EventSink) -> Result<()> {
        if self.empty_filter.should_send(batch) {
            sink.publish_frame(batch)?;
        }
        Ok(())
    }

    /// Calibrate if needed, then pull, process and publish frames until the
    /// source fails or `max_frames` have been processed. Returns the number of
    /// frames processed by this call.
    pub fn run(
        &mut self,
        source: &mut dyn DepthSource,
        sink: &mut dyn EventSink,
        mut announcer: Option<&mut PeriodicAnnouncer>,
        max_frames: Option<u64>,
    ) -> Result<u64> {
        if !self.is_calibrated() {
            self.calibrate(source)?;
        }

        let mut count = 0;
        while max_frames.is_none_or(|max| count < max) {
            let frame = source.next_frame()?;
            let batch = self.process_frame(&frame)?;
            self.publish(&batch, sink)?;
            count += 1;

            if let Some(announcer) = announcer.as_deref_mut() {
                if announcer.is_due() {
                    sink.publish_snapshot(&self.tracker().snapshot())?;
                    announcer.reset_timer();
                }
            }
        }
        Ok(count)
    }

    pub fn set_roi(&mut self, roi: Roi) -> Result<(), TouchError> {
        self.apply(|c| c.region_of_interest = roi)
    }

    pub fn set_depth_band(&mut self, depth_band: DepthBand) -> Result<(), TouchError> {
        self.apply(|c| c.depth_band = depth_band)
    }

    pub fn set_min_area(&mut self, min_area: usize) -> Result<(), TouchError> {
        self.apply(|c| c.min_area = min_area)
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> Result<(), TouchError> {
        self.apply(|c| c.connectivity = connectivity)
    }

    /// Takes effect on the next (re)calibration
    pub fn set_background_frames(&mut self, count: usize) -> Result<(), TouchError> {
        self.apply(|c| c.background_frames = count)
    }

    fn apply(&mut self, change: impl FnOnce(&mut TouchConfig)) -> Result<(), TouchError> {
        let mut candidate = self.config.clone();
        change(&mut candidate);
        candidate.validate()?;
        info!("Updated touch config: {:?}", candidate);
        self.systems.touch_detector.update_settings(&candidate);
        self.config = candidate;
        Ok(())
    }

    fn check_frame_size(&self, frame: &DepthFrame) -> Result<(), TouchError> {
        if frame.width() != self.config.frame_width || frame.height() != self.config.frame_height
        {
            return Err(TouchError::InvalidInput(format!(
                "frame is {}x{}, configured sensor resolution is {}x{}",
                frame.width(),
                frame.height(),
                self.config.frame_width,
                self.config.frame_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{depth_source::ScriptedDepthSource, output::MemorySink};

    fn small_config() -> TouchConfig {
        TouchConfig {
            frame_width: 100,
            frame_height: 100,
            region_of_interest: Roi::new(0, 0, 100, 100),
            depth_band: DepthBand::new(10, 20),
            min_area: 50,
            background_frames: 3,
            ..TouchConfig::default()
        }
    }

    #[test]
    fn invalid_config_prevents_construction() {
        let mut config = small_config();
        config.region_of_interest = Roi::new(10, 10, 5, 50);
        assert!(matches!(
            TouchPipeline::new(config),
            Err(TouchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn processing_before_calibration_fails() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        assert!(matches!(
            pipeline.process_frame(&DepthFrame::uniform(100, 100, 2000)),
            Err(TouchError::InvalidInput(_))
        ));
    }

    #[test]
    fn calibration_consumes_configured_frame_count() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        let mut source =
            ScriptedDepthSource::new((0..5).map(|_| DepthFrame::uniform(100, 100, 2000)));
        pipeline.calibrate(&mut source).unwrap();
        assert!(pipeline.is_calibrated());
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn calibration_rejects_wrong_resolution() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        let mut source = ScriptedDepthSource::new([DepthFrame::uniform(64, 48, 2000)]);
        assert!(matches!(
            pipeline.calibrate(&mut source),
            Err(TouchError::InvalidInput(_))
        ));
    }

    #[test]
    fn setters_validate_and_keep_previous_value() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        assert!(pipeline.set_min_area(0).is_err());
        assert_eq!(pipeline.config().min_area, 50);
        assert!(pipeline.set_depth_band(DepthBand::new(30, 30)).is_err());
        assert!(pipeline.set_roi(Roi::new(0, 0, 200, 50)).is_err());
        assert_eq!(pipeline.config().region_of_interest, Roi::new(0, 0, 100, 100));

        pipeline.set_roi(Roi::new(10, 10, 60, 60)).unwrap();
        assert_eq!(pipeline.config().region_of_interest, Roi::new(10, 10, 60, 60));
        pipeline.set_connectivity(Connectivity::Four).unwrap();
        pipeline.set_background_frames(10).unwrap();
        assert_eq!(pipeline.config().background_frames, 10);
    }

    #[test]
    fn run_stops_on_sensor_failure() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        let mut source =
            ScriptedDepthSource::new((0..5).map(|_| DepthFrame::uniform(100, 100, 2000)));
        let mut sink = MemorySink::default();

        let err = pipeline.run(&mut source, &mut sink, None, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TouchError>(),
            Some(TouchError::SensorAcquisitionFailure(_))
        ));
        assert_eq!(pipeline.frames_processed(), 2);
        // Two empty frames; only the first is forwarded with the default policy
        assert_eq!(sink.frames.len(), 1);
    }

    #[test]
    fn run_honours_max_frames_and_announces() {
        let mut pipeline = TouchPipeline::new(small_config()).unwrap();
        let mut source = ScriptedDepthSource::new(
            (0..3)
                .map(|_| DepthFrame::uniform(100, 100, 2000))
                .chain((0..4).map(|_| {
                    DepthFrame::uniform(100, 100, 2000).with_block(20, 20, 10, 10, 1985)
                })),
        );
        let mut sink = MemorySink::default();
        let mut announcer = PeriodicAnnouncer::new(1);
        std::thread::sleep(std::time::Duration::from_millis(5));

        let processed = pipeline
            .run(&mut source, &mut sink, Some(&mut announcer), Some(3))
            .unwrap();
        assert_eq!(processed, 3);
        assert_eq!(source.remaining(), 1);
        assert_eq!(sink.frames.len(), 3);
        assert!(!sink.snapshots.is_empty());
        assert_eq!(sink.snapshots[0].cursors.len(), 1);
        assert_eq!(pipeline.tracker().cursors().len(), 1);
    }
}
