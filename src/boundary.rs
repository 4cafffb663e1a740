use serde::Serialize;

use crate::camera_pipeline::Frame;

/// A row qualifies as a boundary when its summed pixel values strictly
/// exceed this fraction of the maximum possible row brightness.
pub const ROW_DENSITY_FRACTION: f32 = 0.1;

/// Rows skipped after the upper serum boundary before the interface scan
/// starts, so one physical edge is not detected twice.
pub const INTERFACE_MIN_GAP: usize = 10;

/// Rows skipped after the interface before the lower boundary scan starts,
/// reflecting the minimum expected liquid layer thickness.
pub const LOWER_MIN_GAP: usize = 40;

/// The three detected boundary rows, relative to the ROI. Only ever
/// constructed complete; a failed scan yields no triple at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundaryTriple {
    pub upper_serum: usize,
    pub interface: usize,
    pub lower_liquid: usize,
}

/// Scan a binary edge map top to bottom for the three layer boundaries.
///
/// Three bounded linear scans, each restarting where the previous one left
/// off plus a fixed gap. All-or-nothing: if any scan finds no qualifying
/// row the whole result is None.
pub fn scan_boundaries(edges: &Frame) -> Option<BoundaryTriple> {
    if edges.channels != 1 || edges.width <= 0 || edges.height <= 0 {
        return None;
    }

    let upper_serum = first_dense_row(edges, 0)?;
    let interface = first_dense_row(edges, upper_serum + INTERFACE_MIN_GAP)?;
    let lower_liquid = first_dense_row(edges, interface + LOWER_MIN_GAP)?;

    Some(BoundaryTriple {
        upper_serum,
        interface,
        lower_liquid,
    })
}

fn first_dense_row(edges: &Frame, from: usize) -> Option<usize> {
    let width = edges.width as usize;
    let height = edges.height as usize;
    let threshold = ROW_DENSITY_FRACTION * width as f32 * 255.0;

    (from..height).find(|&row| {
        let start = row * width;
        let sum: u32 = edges.data[start..start + width]
            .iter()
            .map(|&v| v as u32)
            .sum();
        sum as f32 > threshold
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_map(width: i32, height: i32) -> Frame {
        Frame {
            data: vec![0; (width * height) as usize],
            width,
            height,
            channels: 1,
        }
    }

    fn light_row(edges: &mut Frame, row: usize) {
        let width = edges.width as usize;
        for v in &mut edges.data[row * width..(row + 1) * width] {
            *v = 255;
        }
    }

    #[test]
    fn density_rule_is_strictly_greater_than() {
        // width 100: threshold is 0.1 * 100 * 255 = 2550
        let mut edges = edge_map(100, 1);

        // exactly 2550: ten full pixels, not a candidate
        for v in &mut edges.data[0..10] {
            *v = 255;
        }
        assert_eq!(first_dense_row(&edges, 0), None);

        // one more unit of brightness crosses the line
        edges.data[10] = 1;
        assert_eq!(first_dense_row(&edges, 0), Some(0));
    }

    #[test]
    fn finds_three_boundaries_with_gaps() {
        let mut edges = edge_map(100, 100);
        light_row(&mut edges, 12);
        light_row(&mut edges, 40);
        light_row(&mut edges, 90);

        let triple = scan_boundaries(&edges).unwrap();
        assert_eq!(
            triple,
            BoundaryTriple {
                upper_serum: 12,
                interface: 40,
                lower_liquid: 90,
            }
        );
    }

    #[test]
    fn resolved_boundaries_are_strictly_ordered() {
        let mut edges = edge_map(50, 200);
        light_row(&mut edges, 3);
        light_row(&mut edges, 30);
        light_row(&mut edges, 120);

        let triple = scan_boundaries(&edges).unwrap();
        assert!(triple.upper_serum < triple.interface);
        assert!(triple.interface < triple.lower_liquid);
        assert!(triple.interface >= triple.upper_serum + INTERFACE_MIN_GAP);
        assert!(triple.lower_liquid >= triple.interface + LOWER_MIN_GAP);
    }

    #[test]
    fn rows_inside_the_interface_gap_are_skipped() {
        let mut edges = edge_map(50, 100);
        light_row(&mut edges, 10);
        // within 10 rows of the upper boundary: same physical edge
        light_row(&mut edges, 15);
        light_row(&mut edges, 25);
        light_row(&mut edges, 70);

        let triple = scan_boundaries(&edges).unwrap();
        assert_eq!(triple.upper_serum, 10);
        assert_eq!(triple.interface, 25);
        assert_eq!(triple.lower_liquid, 70);
    }

    #[test]
    fn missing_any_boundary_yields_nothing() {
        // empty map: no upper boundary
        assert_eq!(scan_boundaries(&edge_map(50, 100)), None);

        // upper only
        let mut edges = edge_map(50, 100);
        light_row(&mut edges, 5);
        assert_eq!(scan_boundaries(&edges), None);

        // upper and interface, but nothing past the 40-row gap
        let mut edges = edge_map(50, 100);
        light_row(&mut edges, 5);
        light_row(&mut edges, 20);
        light_row(&mut edges, 50); // inside the gap, ignored
        assert_eq!(scan_boundaries(&edges), None);
    }

    #[test]
    fn short_maps_cannot_resolve() {
        // height 45 leaves no room for interface + 40
        let mut edges = edge_map(50, 45);
        light_row(&mut edges, 0);
        light_row(&mut edges, 12);
        assert_eq!(scan_boundaries(&edges), None);
    }

    #[test]
    fn color_frames_are_rejected() {
        let frame = Frame {
            data: vec![255; 300],
            width: 10,
            height: 10,
            channels: 3,
        };
        assert_eq!(scan_boundaries(&frame), None);
    }
}
