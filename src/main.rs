mod boundary;
mod camera_pipeline;
mod config;
mod frame_pipeline;
mod host;
mod measurement;
mod pipeline_steps;

use std::path::{Path, PathBuf};

use clap::Parser;

use camera_pipeline::Frame;
use config::{AppConfig, TuningParams, DEFAULT_CONFIG_PATH};
use frame_pipeline::FramePipeline;
use host::ux_loop::launch_ux_loop;
use measurement::{Measurement, NO_LAYERS_TEXT};
use pipeline_steps::edge_map::EdgeMapBuilder;

// handle command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, help = "Still image to measure", required_unless_present = "ui")]
    input: Option<String>,

    #[arg(short, long, help = "Output directory", required_unless_present = "ui")]
    output: Option<String>,

    #[arg(long, default_value_t = false, help = "Launch the measurement UI")]
    ui: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Enable development mode with hot reloading"
    )]
    dev: bool,

    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, help = "Configuration file")]
    config: PathBuf,

    #[arg(long, help = "Override the configured camera index")]
    camera: Option<i32>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    if args.ui {
        log::info!("launching measurement UI");
        if let Err(err) = launch_ux_loop(args.dev, args.config, args.camera).await {
            log::error!("could not start: {}", err);
            eprintln!("No camera available");
            std::process::exit(1);
        }
    } else {
        log::info!("running in CLI mode");
        let input = args.input.as_ref().unwrap();
        let output = args.output.as_ref().unwrap();

        if let Err(err) = measure_still(input, output, &args.config) {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

/// Run one still image through the pipeline with the configured ROI and
/// tuning parameters, printing the measurement and saving the edge map.
fn measure_still(
    input: &str,
    output: &str,
    config_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path);
    let frame = Frame::open(Path::new(input))?;

    let mut pipeline = FramePipeline::new(output)?;
    pipeline.set_debug(true);
    pipeline.add_step(EdgeMapBuilder::new(
        TuningParams {
            sensitivity: config.threshold,
            kernel_size: config.kernel_size,
        },
        config.roi,
    ));

    let edges = pipeline.process_frame(&frame, 0)?;

    match boundary::scan_boundaries(&edges) {
        Some(boundaries) => {
            let measurement = Measurement::now(&boundaries);
            println!("{}", measurement.result_text());
            Ok(())
        }
        None => Err(NO_LAYERS_TEXT.into()),
    }
}
