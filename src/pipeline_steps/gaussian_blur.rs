use crate::camera_pipeline::Frame;
use crate::config::{KERNEL_MAX, KERNEL_MIN};

use std::io;

#[derive(Debug)]
pub enum BlurError {
    InvalidKernel(String),
    InvalidDimensions(String),
    ProcessingError(String),
    EmptyInput(String),
}

impl std::fmt::Display for BlurError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlurError::InvalidKernel(msg) => write!(f, "Invalid kernel size: {}", msg),
            BlurError::InvalidDimensions(msg) => write!(f, "Invalid dimensions: {}", msg),
            BlurError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            BlurError::EmptyInput(msg) => write!(f, "Empty input: {}", msg),
        }
    }
}

impl std::error::Error for BlurError {}

impl From<BlurError> for io::Error {
    fn from(error: BlurError) -> Self {
        io::Error::new(io::ErrorKind::Other, error.to_string())
    }
}

/// The kernel size the blur actually uses for a requested size: clamped to
/// the configured range, then bumped to the next odd value when even.
pub fn effective_kernel_size(requested: i32) -> usize {
    let mut size = requested.clamp(KERNEL_MIN, KERNEL_MAX);
    if size % 2 == 0 {
        size += 1;
    }
    size as usize
}

pub struct GaussianBlur {
    kernel: Vec<f32>,
    radius: usize,
}

impl GaussianBlur {
    /// Build a separable Gaussian for the requested kernel size. The spread
    /// is derived from the effective size by the usual
    /// `0.3 * ((k - 1) / 2 - 1) + 0.8` rule, so a given kernel slider value
    /// always smooths the same amount.
    pub fn new(kernel_size: i32) -> Result<Self, BlurError> {
        if kernel_size < 1 {
            return Err(BlurError::InvalidKernel(format!(
                "kernel size must be positive, got {}",
                kernel_size
            )));
        }

        let size = effective_kernel_size(kernel_size);
        let radius = (size - 1) / 2;
        let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;

        let two_sigma_sq = 2.0 * sigma * sigma;
        let mut kernel = Vec::with_capacity(size);
        let mut sum = 0.0;

        for i in 0..size {
            let x = (i as i32 - radius as i32) as f32;
            let g = (-x * x / two_sigma_sq).exp();
            kernel.push(g);
            sum += g;
        }

        if sum.abs() < f32::EPSILON {
            return Err(BlurError::ProcessingError(
                "Kernel sum too close to zero".to_string(),
            ));
        }

        for val in kernel.iter_mut() {
            *val /= sum;
        }

        Ok(Self { kernel, radius })
    }

    pub fn effective_size(&self) -> usize {
        2 * self.radius + 1
    }

    /// Smooth a frame in place, converting it to grayscale first if needed.
    pub fn apply(&self, frame: &mut Frame) -> Result<(), BlurError> {
        if frame.width <= 0 || frame.height <= 0 {
            return Err(BlurError::InvalidDimensions(format!(
                "Invalid frame dimensions: {}x{}",
                frame.width, frame.height
            )));
        }
        if frame.data.is_empty() {
            return Err(BlurError::EmptyInput("Frame data is empty".to_string()));
        }

        frame.to_grayscale();

        let width = frame.width as usize;
        let height = frame.height as usize;

        let mut temp = vec![0u8; width * height];
        self.horizontal_pass(&frame.data, &mut temp, width, height)?;

        frame.data.clear();
        frame.data.resize(width * height, 0);
        self.vertical_pass(&temp, &mut frame.data, width, height)?;

        Ok(())
    }

    #[inline(always)]
    fn horizontal_pass(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: usize,
        height: usize,
    ) -> Result<(), BlurError> {
        if input.len() != width * height {
            return Err(BlurError::InvalidDimensions(format!(
                "Input length {} does not match dimensions {}x{}",
                input.len(),
                width,
                height
            )));
        }

        for y in 0..height {
            let row = y * width;
            for x in 0..width {
                let mut sum = 0.0;
                for (i, &k) in self.kernel.iter().enumerate() {
                    let src_x = x.saturating_add(i).saturating_sub(self.radius);
                    if src_x >= width {
                        continue;
                    }
                    sum += input[row + src_x] as f32 * k;
                }
                output[row + x] = sum.clamp(0.0, 255.0) as u8;
            }
        }

        Ok(())
    }

    #[inline(always)]
    fn vertical_pass(
        &self,
        input: &[u8],
        output: &mut [u8],
        width: usize,
        height: usize,
    ) -> Result<(), BlurError> {
        if input.len() != width * height {
            return Err(BlurError::InvalidDimensions(format!(
                "Input length {} does not match dimensions {}x{}",
                input.len(),
                width,
                height
            )));
        }

        for x in 0..width {
            for y in 0..height {
                let mut sum = 0.0;
                for (i, &k) in self.kernel.iter().enumerate() {
                    let src_y = y.saturating_add(i).saturating_sub(self.radius);
                    if src_y >= height {
                        continue;
                    }
                    sum += input[src_y * width + x] as f32 * k;
                }
                output[y * width + x] = sum.clamp(0.0, 255.0) as u8;
            }
        }

        Ok(())
    }
}
