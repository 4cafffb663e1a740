use crate::camera_pipeline::Frame;

use super::gradient_calculation::PixelGradient;

pub struct GradNonMaxSuppression {}

impl GradNonMaxSuppression {
    /// Thin the gradient field: a pixel survives only if its magnitude is a
    /// local maximum along its gradient direction. Borders stay suppressed.
    pub fn suppress(gradients: Vec<Vec<PixelGradient>>) -> Frame {
        let height = gradients.len() as i32;
        let width = gradients.first().map(|row| row.len()).unwrap_or(0) as i32;

        let mut output_data = vec![0u8; (width * height) as usize];

        for y in 1..(height - 1) {
            for x in 1..(width - 1) {
                let current = &gradients[y as usize][x as usize];
                let (n1, n2) = Self::neighbors_along_direction(&gradients, x, y);

                if current.magnitude >= n1 && current.magnitude >= n2 {
                    let idx = (y * width + x) as usize;
                    output_data[idx] = current.magnitude.clamp(0.0, 255.0) as u8;
                }
            }
        }

        Frame {
            data: output_data,
            width,
            height,
            channels: 1,
        }
    }

    /// Magnitudes of the two neighbors the gradient direction points at,
    /// bucketed into the four canonical orientations.
    fn neighbors_along_direction(
        gradients: &[Vec<PixelGradient>],
        x: i32,
        y: i32,
    ) -> (f32, f32) {
        let mut angle = gradients[y as usize][x as usize].direction.to_degrees() % 180.0;
        if angle < 0.0 {
            angle += 180.0;
        }

        let ((dx1, dy1), (dx2, dy2)) = if !(22.5..157.5).contains(&angle) {
            // horizontal edge
            ((-1, 0), (1, 0))
        } else if angle < 67.5 {
            // 45 degree diagonal
            ((1, -1), (-1, 1))
        } else if angle < 112.5 {
            // vertical edge
            ((0, -1), (0, 1))
        } else {
            // 135 degree diagonal
            ((-1, -1), (1, 1))
        };

        (
            gradients[(y + dy1) as usize][(x + dx1) as usize].magnitude,
            gradients[(y + dy2) as usize][(x + dx2) as usize].magnitude,
        )
    }
}
