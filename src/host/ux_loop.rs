use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use include_dir::{include_dir, Dir};
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoop};
use tokio::time::sleep;
use wry::webview::{WebView, WebViewBuilder};

use super::ux_message::{self, UxMessage};
use super::vite_server::ViteServer;
use crate::boundary::{scan_boundaries, BoundaryTriple};
use crate::camera_pipeline::{CameraPipeline, Frame};
use crate::config::{AppConfig, AppState, Roi};
use crate::pipeline_steps::edge_map::EdgeMapBuilder;

static DIST_DIR: Dir = include_dir!("ui/dist");

/// Capture and update cadence, ~10 per second each.
const CAPTURE_INTERVAL: Duration = Duration::from_millis(100);
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// The camera needs a moment after starting before frames are usable.
const CAMERA_WARMUP: Duration = Duration::from_secs(2);

const LINE_THICKNESS: i32 = 2;
const UPPER_SERUM_COLOR: (u8, u8, u8) = (0, 255, 0);
const INTERFACE_COLOR: (u8, u8, u8) = (255, 255, 0);
const LOWER_LIQUID_COLOR: (u8, u8, u8) = (0, 0, 255);

pub async fn launch_ux_loop(
    devmode: bool,
    config_path: PathBuf,
    camera_override: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(&config_path);
    let mut state = AppState::from_config(&config, config_path);
    if let Some(index) = camera_override {
        state.camera_index = index;
    }

    // a camera that cannot deliver frames at startup is fatal
    let camera = CameraPipeline::new(state.camera_index)?;
    camera.start()?;
    thread::sleep(CAMERA_WARMUP);

    // the one resource shared with the capture thread: the newest frame
    let latest_frame: Arc<Mutex<Option<Frame>>> = Arc::new(Mutex::new(None));
    {
        let latest_frame = Arc::clone(&latest_frame);
        thread::spawn(move || loop {
            if let Some(frame) = camera.next_frame() {
                if let Ok(mut slot) = latest_frame.lock() {
                    *slot = Some(frame);
                }
            }
            thread::sleep(CAPTURE_INTERVAL);
        });
    }

    let event_loop = EventLoop::new();
    let (tx, rx): (mpsc::Sender<String>, mpsc::Receiver<String>) = mpsc::channel();

    let window = tao::window::WindowBuilder::new()
        .with_title("Serovis Serum Measurement")
        .with_inner_size(tao::dpi::LogicalSize::new(1100, 720))
        .build(&event_loop)?;

    // build the vite server if we are in dev mode
    let vite_server = if devmode {
        let server = ViteServer::new()?;
        for _ in 0..50 {
            if reqwest::get(format!("http://localhost:{}", server.port))
                .await
                .is_ok()
            {
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }
        Some(server)
    } else {
        None
    };

    let url = if devmode {
        format!("http://localhost:{}", vite_server.as_ref().unwrap().port)
    } else {
        let index_html = DIST_DIR
            .get_file("index.html")
            .expect("index.html not found")
            .contents_utf8()
            .expect("invalid utf8");
        format!("data:text/html;base64,{}", base64::encode(index_html))
    };

    let webview = WebViewBuilder::new(window)?
        .with_url(&url)?
        .with_ipc_handler(move |_, msg| {
            if tx.send(msg.to_string()).is_err() {
                log::warn!("UI message dropped, event loop is gone");
            }
        })
        .build()?;

    let mut next_tick = Instant::now() + UPDATE_INTERVAL;
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(next_tick);

        match event {
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                // copy the newest frame out, then release the lock
                let snapshot = latest_frame.lock().ok().and_then(|slot| slot.clone());

                while let Ok(msg) = rx.try_recv() {
                    ux_message::handle_ux_message(&msg, &webview, &mut state, snapshot.as_ref());
                }

                // the tick must survive any per-cycle failure
                if let Err(err) = update_cycle(&webview, &mut state, snapshot.as_ref()) {
                    log::warn!("update cycle failed: {}", err);
                }

                next_tick = Instant::now() + UPDATE_INTERVAL;
                *control_flow = ControlFlow::WaitUntil(next_tick);
            }
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                *control_flow = ControlFlow::Exit;
            }
            _ => {}
        }
    });
}

/// One foreground cycle: process the newest frame when live display or
/// tuning mode wants it, then push the display frame and state to the UI.
fn update_cycle(
    webview: &WebView,
    state: &mut AppState,
    snapshot: Option<&Frame>,
) -> std::io::Result<()> {
    let Some(frame) = snapshot else {
        // no frame yet; nothing to show this tick
        return Ok(());
    };

    let mut display = frame.clone();

    if state.tuning_mode || state.live_display {
        let builder = EdgeMapBuilder::new(state.tuning, state.roi);
        match builder.build(frame) {
            Ok(edges) => {
                state.boundaries = scan_boundaries(&edges);
                state.edge_map = Some(edges);
            }
            Err(err) => {
                log::warn!("frame processing failed: {}", err);
                state.clear_processed();
            }
        }

        if state.tuning_mode {
            if let Some(edges) = &state.edge_map {
                display.splice_gray(edges, state.roi.x, state.roi.y);
            }
        } else if let Some(boundaries) = state.boundaries {
            draw_boundaries(&mut display, &state.roi, &boundaries);
        }
    }

    let image = display.to_png_base64()?;
    ux_message::push_to_ui(
        webview,
        &UxMessage::new(
            "frame",
            serde_json::json!({
                "image": image,
                "roi": state.roi,
                "boundaries": state.boundaries,
                "live": state.live_display,
                "tuning_mode": state.tuning_mode,
            }),
        ),
    );

    Ok(())
}

/// Burn the three boundary lines into the display frame at their
/// frame-absolute rows.
fn draw_boundaries(display: &mut Frame, roi: &Roi, boundaries: &BoundaryTriple) {
    let x0 = roi.x;
    let x1 = roi.x + roi.width;

    display.draw_hline(
        x0,
        x1,
        roi.y + boundaries.upper_serum as i32,
        UPPER_SERUM_COLOR,
        LINE_THICKNESS,
    );
    display.draw_hline(
        x0,
        x1,
        roi.y + boundaries.interface as i32,
        INTERFACE_COLOR,
        LINE_THICKNESS,
    );
    display.draw_hline(
        x0,
        x1,
        roi.y + boundaries.lower_liquid as i32,
        LOWER_LIQUID_COLOR,
        LINE_THICKNESS,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_lines_land_at_roi_offset_rows() {
        let mut display = Frame {
            data: vec![0; 100 * 100 * 3],
            width: 100,
            height: 100,
            channels: 3,
        };
        let roi = Roi {
            x: 10,
            y: 20,
            width: 50,
            height: 70,
        };
        let boundaries = BoundaryTriple {
            upper_serum: 5,
            interface: 20,
            lower_liquid: 62,
        };

        draw_boundaries(&mut display, &roi, &boundaries);

        assert_eq!(display.get_pixel(10, 25), Some((0, 255, 0)));
        assert_eq!(display.get_pixel(59, 40), Some((255, 255, 0)));
        assert_eq!(display.get_pixel(30, 82), Some((0, 0, 255)));
        // outside the ROI columns nothing is drawn
        assert_eq!(display.get_pixel(9, 25), Some((0, 0, 0)));
        assert_eq!(display.get_pixel(60, 25), Some((0, 0, 0)));
    }
}
