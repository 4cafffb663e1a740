use crate::camera_pipeline::Frame;

#[derive(Debug, PartialEq)]
pub enum Strength {
    Strong,
    Weak,
    Suppressed,
}

pub struct MeasuredPixel {
    pub weight: Strength,
}

/// Classifies thinned gradient magnitudes against the sensitivity value.
/// The low threshold is the configured sensitivity, the high threshold is
/// exactly twice that; the coupling is part of the measurement contract.
pub struct DoubleThresholder {
    pub low: i32,
    pub high: i32,
}

impl DoubleThresholder {
    pub fn for_sensitivity(sensitivity: i32) -> Self {
        Self {
            low: sensitivity,
            high: sensitivity * 2,
        }
    }

    fn classify(&self, value: i32) -> Strength {
        if value <= self.low {
            Strength::Suppressed
        } else if value >= self.high {
            Strength::Strong
        } else {
            Strength::Weak
        }
    }

    pub fn threshold(&self, frame: &Frame) -> Vec<Vec<MeasuredPixel>> {
        let width = frame.width.max(0) as usize;

        frame
            .data
            .chunks(width.max(1))
            .map(|row| {
                row.iter()
                    .map(|&v| MeasuredPixel {
                        weight: self.classify(v as i32),
                    })
                    .collect()
            })
            .collect()
    }
}
