use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app::{self as gst_app, AppSink};
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;
use image::{ImageBuffer, Luma, Rgb};

use crate::config::Roi;

/// Frame dimensions requested from the camera in the default configuration.
pub const FRAME_WIDTH: i32 = 640;
pub const FRAME_HEIGHT: i32 = 480;

#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub channels: i32,
}

impl Frame {
    /// Read a still image from disk as an RGB frame (CLI mode input).
    pub fn open(path: &Path) -> io::Result<Self> {
        let img = image::open(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?
            .to_rgb8();
        let (width, height) = img.dimensions();

        Ok(Self {
            data: img.into_raw(),
            width: width as i32,
            height: height as i32,
            channels: 3,
        })
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<(i32, i32, i32)> {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return None;
        }

        let index = ((y * self.width + x) * self.channels) as usize;
        if index + (self.channels as usize) > self.data.len() {
            return None;
        }

        if self.channels == 1 {
            let v = self.data[index] as i32;
            return Some((v, v, v));
        }

        Some((
            self.data[index] as i32,
            self.data[index + 1] as i32,
            self.data[index + 2] as i32,
        ))
    }

    /// Collapse an RGB frame to single-channel intensity in place using the
    /// standard luma weights. Already-grayscale frames pass through.
    pub fn to_grayscale(&mut self) {
        if self.channels == 1 {
            return;
        }

        let pixels = (self.width * self.height) as usize;
        let mut gray = Vec::with_capacity(pixels);

        for chunk in self.data.chunks_exact(3) {
            let luma = 0.299 * chunk[0] as f32 + 0.587 * chunk[1] as f32 + 0.114 * chunk[2] as f32;
            gray.push(luma.round().clamp(0.0, 255.0) as u8);
        }

        self.data = gray;
        self.channels = 1;
    }

    /// Copy out the ROI sub-image. Returns None when the rectangle is empty
    /// or reaches outside the frame; callers treat that as "no result".
    pub fn crop(&self, roi: &Roi) -> Option<Frame> {
        if roi.width <= 0 || roi.height <= 0 {
            return None;
        }
        if roi.x < 0 || roi.y < 0 {
            return None;
        }
        if roi.x + roi.width > self.width || roi.y + roi.height > self.height {
            return None;
        }

        let channels = self.channels as usize;
        let src_stride = self.width as usize * channels;
        let row_bytes = roi.width as usize * channels;
        let mut data = Vec::with_capacity(roi.height as usize * row_bytes);

        for row in roi.y..roi.y + roi.height {
            let start = row as usize * src_stride + roi.x as usize * channels;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        Some(Frame {
            data,
            width: roi.width,
            height: roi.height,
            channels: self.channels,
        })
    }

    /// Overwrite the region at (x, y) with a single-channel image, expanding
    /// it to gray RGB. Used by tuning mode to show the edge map in place.
    pub fn splice_gray(&mut self, patch: &Frame, x: i32, y: i32) {
        if self.channels != 3 || patch.channels != 1 {
            return;
        }
        if x < 0 || y < 0 || x + patch.width > self.width || y + patch.height > self.height {
            return;
        }

        for row in 0..patch.height {
            for col in 0..patch.width {
                let v = patch.data[(row * patch.width + col) as usize];
                let dst = (((y + row) * self.width + (x + col)) * 3) as usize;
                self.data[dst] = v;
                self.data[dst + 1] = v;
                self.data[dst + 2] = v;
            }
        }
    }

    /// Draw a horizontal line segment from x0 to x1 at row y, `thickness`
    /// rows tall. Out-of-frame rows and columns are clipped.
    pub fn draw_hline(&mut self, x0: i32, x1: i32, y: i32, color: (u8, u8, u8), thickness: i32) {
        if self.channels != 3 {
            return;
        }

        let x_start = x0.clamp(0, self.width);
        let x_end = x1.clamp(0, self.width);

        for row in y..y + thickness {
            if row < 0 || row >= self.height {
                continue;
            }
            for col in x_start..x_end {
                let idx = ((row * self.width + col) * 3) as usize;
                self.data[idx] = color.0;
                self.data[idx + 1] = color.1;
                self.data[idx + 2] = color.2;
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        match self.channels {
            3 => {
                let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(
                    self.width as u32,
                    self.height as u32,
                    self.data.clone(),
                )
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "frame buffer size mismatch")
                })?;
                buffer
                    .save(path)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            }
            1 => {
                let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(
                    self.width as u32,
                    self.height as u32,
                    self.data.clone(),
                )
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "frame buffer size mismatch")
                })?;
                buffer
                    .save(path)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
            }
            n => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot save frame with {} channels", n),
            )),
        }
    }

    /// Encode as PNG and base64 for pushing into the webview.
    pub fn to_png_base64(&self) -> io::Result<String> {
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);

        match self.channels {
            3 => {
                let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(
                    self.width as u32,
                    self.height as u32,
                    self.data.clone(),
                )
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "frame buffer size mismatch")
                })?;
                image::DynamicImage::ImageRgb8(buffer)
                    .write_to(&mut cursor, image::ImageFormat::Png)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            }
            1 => {
                let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(
                    self.width as u32,
                    self.height as u32,
                    self.data.clone(),
                )
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "frame buffer size mismatch")
                })?;
                image::DynamicImage::ImageLuma8(buffer)
                    .write_to(&mut cursor, image::ImageFormat::Png)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            }
            n => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot encode frame with {} channels", n),
                ))
            }
        }

        Ok(base64::encode(&bytes))
    }
}

// gstreamer pipeline pulling live frames from a webcam
pub struct CameraPipeline {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    width: i32,
    height: i32,
}

impl CameraPipeline {
    /// Open the camera at the given index and probe it for a first frame.
    /// A camera that produces nothing within the timeout is a startup
    /// failure and the application is expected to terminate.
    pub fn new(camera_index: i32) -> Result<Self, gst::glib::Error> {
        gst::init()?;

        let pipeline = gst::Pipeline::new();

        let src = gst::ElementFactory::make_with_name("v4l2src", None).map_err(|_e| {
            gst::glib::Error::new(
                gst::LibraryError::Failed,
                "Failed to create v4l2src element",
            )
        })?;
        let convert = gst::ElementFactory::make_with_name("videoconvert", None).map_err(|_e| {
            gst::glib::Error::new(
                gst::LibraryError::Failed,
                "Failed to create convert element",
            )
        })?;

        src.set_property("device", format!("/dev/video{}", camera_index));

        // fixed-size RGB frames; videoconvert negotiates with the sensor
        let caps = gst::Caps::builder("video/x-raw")
            .field("format", &"RGB")
            .field("width", FRAME_WIDTH)
            .field("height", FRAME_HEIGHT)
            .build();

        let sink: AppSink = gst_app::AppSink::builder()
            .name("appsink")
            .caps(&caps)
            .build();

        pipeline
            .add_many(&[&src, &convert, sink.upcast_ref()])
            .map_err(|_e| {
                gst::glib::Error::new(
                    gst::LibraryError::Failed,
                    "Failed to add elements to pipeline",
                )
            })?;

        src.link(&convert).map_err(|_e| {
            gst::glib::Error::new(gst::LibraryError::Failed, "Failed to link src to convert")
        })?;
        convert.link(&sink).map_err(|_e| {
            gst::glib::Error::new(gst::LibraryError::Failed, "Failed to link convert to sink")
        })?;

        let mut camera = CameraPipeline {
            pipeline,
            appsink: sink,
            width: 0,
            height: 0,
        };

        // probe: the camera must deliver a frame before the UI comes up
        camera.pipeline.set_state(gst::State::Playing).map_err(|_e| {
            gst::glib::Error::new(
                gst::LibraryError::Failed,
                "Failed to set pipeline state to playing",
            )
        })?;

        let start_time = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        while start_time.elapsed() < timeout {
            match camera
                .appsink
                .try_pull_sample(gst::ClockTime::from_mseconds(100))
            {
                Some(sample) => {
                    if let Some(caps) = sample.caps() {
                        let structure = caps.structure(0).unwrap();
                        camera.width = structure.get::<i32>("width").unwrap();
                        camera.height = structure.get::<i32>("height").unwrap();
                        break;
                    }
                }
                None => {
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }

        if camera.width == 0 || camera.height == 0 {
            return Err(gst::glib::Error::new(
                gst::LibraryError::Failed,
                "No camera available",
            ));
        }

        camera.pipeline.set_state(gst::State::Null).map_err(|_e| {
            gst::glib::Error::new(
                gst::LibraryError::Failed,
                "Failed to set pipeline state to null",
            )
        })?;

        Ok(camera)
    }

    pub fn start(&self) -> Result<(), gst::glib::Error> {
        self.pipeline.set_state(gst::State::Playing).map_err(|_e| {
            gst::glib::Error::new(gst::LibraryError::Failed, "Failed to start camera")
        })?;

        Ok(())
    }

    pub fn stop(&self) -> Result<(), gst::glib::Error> {
        self.pipeline.set_state(gst::State::Null).map_err(|_e| {
            gst::glib::Error::new(gst::LibraryError::Failed, "Failed to stop camera")
        })?;

        Ok(())
    }

    pub fn get_dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Pull the most recent frame, or None if the camera has nothing yet.
    pub fn next_frame(&self) -> Option<Frame> {
        self.appsink
            .try_pull_sample(gst::ClockTime::from_mseconds(100))
            .map(|sample| {
                let buffer = sample.buffer().unwrap();
                let map = buffer.map_readable().unwrap();

                Frame {
                    data: map.as_slice().to_vec(),
                    width: self.width,
                    height: self.height,
                    channels: 3,
                }
            })
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
