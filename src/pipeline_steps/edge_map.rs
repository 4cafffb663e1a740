use crate::camera_pipeline::Frame;
use crate::config::{Roi, TuningParams};
use crate::frame_pipeline::PipelineStep;

use super::double_thresholding::DoubleThresholder;
use super::edge_tracking::track_edges_hysteresis;
use super::gaussian_blur::{BlurError, GaussianBlur};
use super::gradient_calculation::SobelOperator;
use super::non_max_suppression::GradNonMaxSuppression;

use std::io;

#[derive(Debug)]
pub enum EdgeMapError {
    RoiOutOfBounds {
        roi: Roi,
        frame_width: i32,
        frame_height: i32,
    },
    Stage(io::Error),
}

impl std::fmt::Display for EdgeMapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeMapError::RoiOutOfBounds {
                roi,
                frame_width,
                frame_height,
            } => write!(
                f,
                "ROI [{}, {}, {}, {}] does not fit a {}x{} frame",
                roi.x, roi.y, roi.width, roi.height, frame_width, frame_height
            ),
            EdgeMapError::Stage(err) => write!(f, "edge detection stage failed: {}", err),
        }
    }
}

impl std::error::Error for EdgeMapError {}

impl From<io::Error> for EdgeMapError {
    fn from(err: io::Error) -> Self {
        EdgeMapError::Stage(err)
    }
}

impl From<BlurError> for EdgeMapError {
    fn from(err: BlurError) -> Self {
        EdgeMapError::Stage(err.into())
    }
}

impl From<EdgeMapError> for io::Error {
    fn from(err: EdgeMapError) -> Self {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    }
}

/// The full edge detector: ROI extraction, grayscale, Gaussian smoothing,
/// Sobel gradients, thinning, double thresholding, hysteresis. Produces a
/// binary 0/255 map with exactly the ROI's dimensions.
pub struct EdgeMapBuilder {
    params: TuningParams,
    roi: Roi,
}

impl EdgeMapBuilder {
    pub fn new(params: TuningParams, roi: Roi) -> Self {
        Self { params, roi }
    }

    pub fn build(&self, frame: &Frame) -> Result<Frame, EdgeMapError> {
        let mut sub = frame.crop(&self.roi).ok_or(EdgeMapError::RoiOutOfBounds {
            roi: self.roi,
            frame_width: frame.width,
            frame_height: frame.height,
        })?;

        sub.to_grayscale();

        let blur = GaussianBlur::new(self.params.kernel_size)?;
        blur.apply(&mut sub)?;

        let gradients = SobelOperator::calculate_gradient(&sub)?;
        let thinned = GradNonMaxSuppression::suppress(gradients);

        let thresholder = DoubleThresholder::for_sensitivity(self.params.clamped_sensitivity());
        let classified = thresholder.threshold(&thinned);

        Ok(track_edges_hysteresis(&classified))
    }
}

impl PipelineStep for EdgeMapBuilder {
    fn process(&self, frame: &mut Frame, _frame_count: u32) -> io::Result<()> {
        *frame = self.build(frame)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "EdgeMapBuilder"
    }
}
