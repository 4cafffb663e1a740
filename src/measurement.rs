use serde::Serialize;

use crate::boundary::BoundaryTriple;

/// Number of past measurements retained for the history table.
pub const HISTORY_CAP: usize = 3;

/// Shown to the operator when one or more boundary scans fail.
pub const NO_LAYERS_TEXT: &str = "Could not detect all layers";

/// One completed measurement: serum layer thickness and total separated
/// height in pixels, and their ratio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub timestamp: String,
    pub serum_px: i64,
    pub total_px: i64,
    pub ratio: f64,
}

impl Measurement {
    pub fn new(boundaries: &BoundaryTriple, timestamp: String) -> Self {
        let serum_px = boundaries.interface as i64 - boundaries.upper_serum as i64;
        let total_px = boundaries.lower_liquid as i64 - boundaries.upper_serum as i64;
        let ratio = if total_px > 0 {
            serum_px as f64 / total_px as f64
        } else {
            0.0
        };

        Self {
            timestamp,
            serum_px,
            total_px,
            ratio,
        }
    }

    pub fn now(boundaries: &BoundaryTriple) -> Self {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self::new(boundaries, timestamp)
    }

    /// The result text shown to the operator after a manual measurement.
    pub fn result_text(&self) -> String {
        format!(
            "serum thickness: {:.2} px\nTotal height: {:.2} px\nserum ratio: {:.2}%",
            self.serum_px as f64,
            self.total_px as f64,
            self.ratio * 100.0
        )
    }
}

/// Bounded record of past measurements, oldest first. Appending beyond the
/// cap evicts the oldest entry.
#[derive(Debug, Default)]
pub struct MeasurementHistory {
    entries: Vec<Measurement>,
}

impl MeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, measurement: Measurement) {
        self.entries.push(measurement);
        if self.entries.len() > HISTORY_CAP {
            self.entries.remove(0);
        }
    }

    /// Entries ordered oldest to newest.
    pub fn entries(&self) -> &[Measurement] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(upper: usize, interface: usize, lower: usize) -> BoundaryTriple {
        BoundaryTriple {
            upper_serum: upper,
            interface,
            lower_liquid: lower,
        }
    }

    fn measurement(upper: usize, interface: usize, lower: usize) -> Measurement {
        Measurement::new(&triple(upper, interface, lower), "t".to_string())
    }

    #[test]
    fn thickness_total_and_ratio() {
        let m = measurement(10, 30, 80);

        assert_eq!(m.serum_px, 20);
        assert_eq!(m.total_px, 70);
        assert!((m.ratio - 0.2857).abs() < 1e-3);
    }

    #[test]
    fn zero_total_height_is_guarded_not_an_error() {
        let m = measurement(10, 10, 10);

        assert_eq!(m.serum_px, 0);
        assert_eq!(m.total_px, 0);
        assert_eq!(m.ratio, 0.0);
    }

    #[test]
    fn result_text_formats_like_the_operator_display() {
        let m = measurement(10, 30, 80);
        let text = m.result_text();

        assert!(text.contains("serum thickness: 20.00 px"));
        assert!(text.contains("Total height: 70.00 px"));
        assert!(text.contains("serum ratio: 28.57%"));
    }

    #[test]
    fn history_keeps_the_three_most_recent() {
        let mut history = MeasurementHistory::new();
        for i in 0..4 {
            history.push(measurement(0, 10 + i, 60 + i));
        }

        let entries = history.entries();
        assert_eq!(entries.len(), HISTORY_CAP);
        // the first measurement was evicted; order stays oldest to newest
        assert_eq!(entries[0].serum_px, 11);
        assert_eq!(entries[1].serum_px, 12);
        assert_eq!(entries[2].serum_px, 13);
    }

    #[test]
    fn end_to_end_synthetic_scenario() {
        use crate::boundary::scan_boundaries;
        use crate::camera_pipeline::Frame;

        // lit rows at 12, 40 and 90 on a 100-wide map
        let width = 100usize;
        let mut edges = Frame {
            data: vec![0; width * 100],
            width: width as i32,
            height: 100,
            channels: 1,
        };
        for row in [12usize, 40, 90] {
            for v in &mut edges.data[row * width..(row + 1) * width] {
                *v = 255;
            }
        }

        let boundaries = scan_boundaries(&edges).unwrap();
        assert_eq!(boundaries, triple(12, 40, 90));

        let m = Measurement::now(&boundaries);
        assert_eq!(m.serum_px, 28);
        assert_eq!(m.total_px, 78);
        assert!((m.ratio - 0.359).abs() < 1e-3);
    }
}
