pub mod depth_source;
pub mod error;
pub mod geometry_utils;
pub mod output;
pub mod pipeline;
pub mod systems;
pub mod touch_config;
pub mod tracking;

pub type Point2D = (f32, f32);
