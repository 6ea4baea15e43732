use clap::Parser;
use depth_touch::output::OutputFormat;

// Some defaults; some of which can be overriden via CLI args
const CONFIG_FILE_PATH: &str = "./touchConfig.json";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Where to load touch detection config
    #[arg(long="config",default_value_t=String::from(CONFIG_FILE_PATH))]
    pub config_path: String,

    /// Raw depth recording to play back (little-endian u16 frames)
    #[arg(long = "input")]
    pub input_path: String,

    /// Write cursor events here instead of stdout
    #[arg(long = "output")]
    pub output_path: Option<String>,

    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// How often (ms) to re-send the full set of cursors; 0 disables
    #[arg(long = "fullUpdateInterval", default_value_t = 0)]
    pub full_update_interval: u64,

    /// Stop after this many frames (not counting calibration)
    #[arg(long = "maxFrames")]
    pub max_frames: Option<u64>,

    /// Save the effective config back to the config path before starting
    #[arg(long = "writeConfig")]
    pub write_config: bool,

    #[arg(long = "loglevel",default_value_t=String::from("info"))]
    pub log_level: String,
}
