pub mod announcer;
pub mod background;
pub mod cursor_tracking;
pub mod detection;

use background::{BackgroundModel, BackgroundSampler};
use cursor_tracking::CursorTracker;
use detection::TouchDetector;
use log::info;

use crate::touch_config::TouchConfig;

pub struct Systems {
    pub touch_detector: TouchDetector,
    pub cursor_tracker: CursorTracker,
    pub background_sampler: BackgroundSampler,
    pub background: Option<BackgroundModel>,
}

impl Systems {
    pub fn new(config: &TouchConfig) -> Systems {
        info!(
            "Touch detection in ROI {:?}, depth band {:?} mm, min area {} px",
            config.region_of_interest, config.depth_band, config.min_area
        );

        Systems {
            touch_detector: TouchDetector::new(config),
            cursor_tracker: CursorTracker::new(),
            background_sampler: BackgroundSampler::new(config.background_frames),
            background: None,
        }
    }
}
