use crate::camera_pipeline::Frame;
use std::collections::VecDeque;

use super::double_thresholding::{MeasuredPixel, Strength};

const EDGE_ON: u8 = 255;

/// Hysteresis pass: strong pixels seed a BFS that promotes 8-connected weak
/// pixels; everything else drops out. The result is strictly binary 0/255,
/// which the boundary scanner's row-density rule depends on.
pub fn track_edges_hysteresis(pixels: &[Vec<MeasuredPixel>]) -> Frame {
    let height = pixels.len() as i32;
    let width = pixels.first().map(|row| row.len()).unwrap_or(0) as i32;

    let mut output_data = vec![0u8; (width * height) as usize];
    let mut visited = vec![false; (width * height) as usize];
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            if pixels[y as usize][x as usize].weight == Strength::Strong {
                let idx = (y * width + x) as usize;
                queue.push_back((x, y));
                visited[idx] = true;
                output_data[idx] = EDGE_ON;
            }
        }
    }

    let neighbors = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in neighbors.iter() {
            let nx = x + dx;
            let ny = y + dy;

            if nx < 0 || nx >= width || ny < 0 || ny >= height {
                continue;
            }

            let idx = (ny * width + nx) as usize;
            if visited[idx] {
                continue;
            }

            if pixels[ny as usize][nx as usize].weight == Strength::Weak {
                visited[idx] = true;
                queue.push_back((nx, ny));
                output_data[idx] = EDGE_ON;
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
