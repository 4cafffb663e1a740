use crate::camera_pipeline::Frame;
use std::f32::consts::PI;
use std::io;

#[derive(Clone)]
pub struct PixelGradient {
    pub magnitude: f32,
    pub direction: f32,
}

impl PixelGradient {
    pub fn new(mag: f32, dir: f32) -> Self {
        Self {
            magnitude: mag,
            direction: dir,
        }
    }
}

pub struct SobelOperator {
    kernel_x: [[i32; 3]; 3],
    kernel_y: [[i32; 3]; 3],
}

impl SobelOperator {
    pub fn new() -> Self {
        Self {
            kernel_x: [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]],
            kernel_y: [[-1, -2, -1], [0, 0, 0], [1, 2, 1]],
        }
    }

    fn apply_kernels(&self, frame: &Frame, x: i32, y: i32) -> (i32, i32) {
        let mut gx = 0;
        let mut gy = 0;

        for ky in 0..3 {
            for kx in 0..3 {
                if let Some((value, _, _)) =
                    frame.get_pixel(x + (kx as i32 - 1), y + (ky as i32 - 1))
                {
                    gx += value * self.kernel_x[ky][kx];
                    gy += value * self.kernel_y[ky][kx];
                }
            }
        }

        (gx, gy)
    }

    /// Gradient magnitude and direction per pixel. Border pixels stay zero.
    /// Requires a single-channel frame; anything else is a caller bug that
    /// is reported, not a reason to take the update loop down.
    pub fn calculate_gradient(frame: &Frame) -> io::Result<Vec<Vec<PixelGradient>>> {
        if frame.channels != 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Sobel operator needs a grayscale frame, got {} channels",
                    frame.channels
                ),
            ));
        }
        if frame.width <= 0 || frame.height <= 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid frame dimensions: {}x{}", frame.width, frame.height),
            ));
        }

        let height = frame.height as usize;
        let width = frame.width as usize;
        let mut gradients = vec![vec![PixelGradient::new(0.0, 0.0); width]; height];
        let sobel = SobelOperator::new();

        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let (gx, gy) = sobel.apply_kernels(frame, x as i32, y as i32);

                let magnitude = ((gx * gx + gy * gy) as f32).sqrt();
                let direction = if gx == 0 {
                    if gy == 0 {
                        0.0
                    } else {
                        PI / 2.0 * gy.signum() as f32
                    }
                } else {
                    (gy as f32).atan2(gx as f32)
                };

                gradients[y][x] = PixelGradient::new(magnitude, direction);
            }
        }

        Ok(gradients)
    }
}
