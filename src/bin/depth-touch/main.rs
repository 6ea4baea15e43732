use std::fs::File;
use std::io::{BufWriter, Write, stdout};

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, error, info};

use depth_touch::depth_source::RecordedDepthSource;
use depth_touch::error::TouchError;
use depth_touch::output::EncodingSink;
use depth_touch::pipeline::TouchPipeline;
use depth_touch::systems::announcer::PeriodicAnnouncer;
use depth_touch::touch_config::load_config_from_file;

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger from the environment

    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    debug!("Started; args: {:?}", cli);

    let config = load_config_from_file(&cli.config_path)?;
    if cli.write_config {
        config.write_config_to_file(&cli.config_path)?;
    }

    let mut source =
        RecordedDepthSource::open(&cli.input_path, config.frame_width, config.frame_height)?;
    let mut pipeline = TouchPipeline::new(config)?;

    let writer: Box<dyn Write> = match &cli.output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(stdout()),
    };
    let mut sink = EncodingSink::new(writer, cli.format);
    let mut announcer = PeriodicAnnouncer::new(cli.full_update_interval);

    match pipeline.run(
        &mut source,
        &mut sink,
        Some(&mut announcer),
        cli.max_frames,
    ) {
        Ok(count) => {
            info!("Processed {} frames", count);
            Ok(())
        }
        Err(e) => match e.downcast_ref::<TouchError>() {
            Some(TouchError::EndOfStream { .. }) if pipeline.is_calibrated() => {
                info!(
                    "Recording finished after {} frames",
                    pipeline.frames_processed()
                );
                Ok(())
            }
            _ => {
                error!("Frame loop failed: {}", e);
                Err(e)
            }
        },
    }
}
