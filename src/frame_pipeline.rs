use crate::camera_pipeline::Frame;
use std::{io, path::PathBuf};

/// A single step in the measurement pipeline. Steps mutate the frame in
/// place; a step may change dimensions and channel count (the edge map
/// builder swaps the full frame for the ROI-sized map).
pub trait PipelineStep {
    fn process(&self, frame: &mut Frame, frame_count: u32) -> io::Result<()>;

    /// Step name used for debug output files and logging.
    fn name(&self) -> &str;
}

/// Runs a sequence of steps over still frames, saving the result (and, with
/// debug enabled, every intermediate) under a per-frame output directory.
/// Used by the CLI mode; the live loop drives the steps directly.
pub struct FramePipeline {
    steps: Vec<Box<dyn PipelineStep>>,
    output_dir: String,
    debug: bool,
}

impl FramePipeline {
    pub fn new(output_dir: &str) -> io::Result<Self> {
        // start from a clean output directory
        if std::path::Path::new(output_dir).exists() {
            std::fs::remove_dir_all(output_dir)?;
        }
        std::fs::create_dir_all(output_dir)?;

        Ok(Self {
            steps: Vec::new(),
            output_dir: output_dir.to_string(),
            debug: false,
        })
    }

    pub fn add_step<T: PipelineStep + 'static>(&mut self, step: T) {
        self.steps.push(Box::new(step));
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn process_frame(&self, frame: &Frame, frame_count: u32) -> io::Result<Frame> {
        let mut current = frame.clone();

        let frame_dir =
            PathBuf::from(&self.output_dir).join(format!("frame_{:08}_output", frame_count));
        std::fs::create_dir_all(&frame_dir)?;

        for (index, step) in self.steps.iter().enumerate() {
            log::debug!("executing step {}: {}", index + 1, step.name());
            step.process(&mut current, frame_count)?;

            if self.debug {
                let debug_path = frame_dir.join(format!(
                    "debug_step_{}_{}_{:08}.png",
                    index + 1,
                    step.name(),
                    frame_count
                ));
                current.save(&debug_path)?;
            }
        }

        current.save(&frame_dir.join(format!("frame_{:08}.png", frame_count)))?;

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Invert;

    impl PipelineStep for Invert {
        fn process(&self, frame: &mut Frame, _frame_count: u32) -> io::Result<()> {
            for v in frame.data.iter_mut() {
                *v = 255 - *v;
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "Invert"
        }
    }

    fn temp_output_dir(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("serovis_pipeline_{}_{}", name, std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn steps_run_in_order_and_result_is_saved() {
        let dir = temp_output_dir("run");
        let mut pipeline = FramePipeline::new(&dir).unwrap();
        pipeline.add_step(Invert);

        let frame = Frame {
            data: vec![10; 4 * 4],
            width: 4,
            height: 4,
            channels: 1,
        };

        let result = pipeline.process_frame(&frame, 0).unwrap();
        assert!(result.data.iter().all(|&v| v == 245));
        assert!(PathBuf::from(&dir)
            .join("frame_00000000_output")
            .join("frame_00000000.png")
            .exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn debug_mode_saves_intermediates() {
        let dir = temp_output_dir("debug");
        let mut pipeline = FramePipeline::new(&dir).unwrap();
        pipeline.add_step(Invert);
        pipeline.set_debug(true);

        let frame = Frame {
            data: vec![0; 4],
            width: 2,
            height: 2,
            channels: 1,
        };
        pipeline.process_frame(&frame, 3).unwrap();

        assert!(PathBuf::from(&dir)
            .join("frame_00000003_output")
            .join("debug_step_1_Invert_00000003.png")
            .exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
