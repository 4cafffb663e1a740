use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wry::webview::WebView;

use crate::boundary::scan_boundaries;
use crate::camera_pipeline::Frame;
use crate::config::{AppState, Roi, TuningParams};
use crate::measurement::{Measurement, NO_LAYERS_TEXT};
use crate::pipeline_steps::edge_map::EdgeMapBuilder;

/// Envelope for both directions of UI traffic.
#[derive(Serialize, Deserialize)]
pub struct UxMessage {
    pub message_type: String,
    pub data: Value,
}

impl UxMessage {
    pub fn new(message_type: &str, data: Value) -> Self {
        Self {
            message_type: message_type.to_string(),
            data,
        }
    }
}

pub fn handle_ux_message(
    msg: &str,
    webview: &WebView,
    state: &mut AppState,
    latest: Option<&Frame>,
) {
    match serde_json::from_str::<UxMessage>(msg) {
        Ok(parsed) => {
            for response in apply_ux_message(&parsed, state, latest) {
                push_to_ui(webview, &response);
            }
        }
        Err(err) => log::warn!("discarding unparseable UI message: {}", err),
    }
}

/// Apply one UI message to the application state, returning any messages
/// that should be pushed back. Split from the webview plumbing so the
/// message protocol can be exercised without a window.
pub fn apply_ux_message(
    msg: &UxMessage,
    state: &mut AppState,
    latest: Option<&Frame>,
) -> Vec<UxMessage> {
    match msg.message_type.as_str() {
        // sent once by the UI when its page has loaded
        "ready" => vec![config_message(state), history_message(state)],
        "roi" => {
            match serde_json::from_value::<Roi>(msg.data.clone()) {
                Ok(roi) => state.roi = roi,
                Err(err) => log::warn!("bad ROI from UI: {}", err),
            }
            Vec::new()
        }
        "tuning" => {
            match serde_json::from_value::<TuningParams>(msg.data.clone()) {
                Ok(params) => state.tuning = params,
                Err(err) => log::warn!("bad tuning parameters from UI: {}", err),
            }
            Vec::new()
        }
        "live" => {
            state.live_display = msg.data.as_bool().unwrap_or(state.live_display);
            Vec::new()
        }
        "tuning_mode" => {
            state.tuning_mode = msg.data.as_bool().unwrap_or(state.tuning_mode);
            Vec::new()
        }
        "measure" => measure(state, latest),
        "save_config" => match state.to_config().save(&state.config_path) {
            Ok(()) => vec![result_message("Configuration saved")],
            Err(err) => {
                log::error!("could not save configuration: {}", err);
                vec![result_message(&format!("Could not save configuration: {}", err))]
            }
        },
        other => {
            log::warn!("unknown UI message type: {}", other);
            Vec::new()
        }
    }
}

/// Manual measurement: run the pipeline on whatever frame, ROI and
/// parameters are current right now, then record the result.
fn measure(state: &mut AppState, latest: Option<&Frame>) -> Vec<UxMessage> {
    if let Some(frame) = latest {
        let builder = EdgeMapBuilder::new(state.tuning, state.roi);
        match builder.build(frame) {
            Ok(edges) => {
                state.boundaries = scan_boundaries(&edges);
                state.edge_map = Some(edges);
            }
            Err(err) => {
                log::warn!("measurement processing failed: {}", err);
                state.clear_processed();
            }
        }
    } else {
        state.clear_processed();
    }

    match state.boundaries {
        Some(boundaries) => {
            let measurement = Measurement::now(&boundaries);
            let text = measurement.result_text();
            state.history.push(measurement);
            vec![result_message(&text), history_message(state)]
        }
        None => vec![result_message(NO_LAYERS_TEXT)],
    }
}

pub fn result_message(text: &str) -> UxMessage {
    UxMessage::new("result", json!(text))
}

/// History entries, newest first, the way the table displays them.
pub fn history_message(state: &AppState) -> UxMessage {
    let entries: Vec<&Measurement> = state.history.entries().iter().rev().collect();
    UxMessage::new("history", json!(entries))
}

pub fn config_message(state: &AppState) -> UxMessage {
    UxMessage::new(
        "config",
        json!({
            "sensitivity": state.tuning.sensitivity,
            "kernel_size": state.tuning.kernel_size,
            "roi": state.roi,
            "live": state.live_display,
        }),
    )
}

pub fn push_to_ui(webview: &WebView, msg: &UxMessage) {
    let payload = match serde_json::to_string(msg) {
        Ok(payload) => payload,
        Err(err) => {
            log::error!("could not serialize UI message: {}", err);
            return;
        }
    };

    let js = format!(
        "window.dispatchEvent(new CustomEvent('rust-message', {{ detail: {} }}))",
        payload
    );

    if let Err(err) = webview.evaluate_script(&js) {
        log::warn!("could not push message to UI: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::path::PathBuf;

    fn state() -> AppState {
        AppState::from_config(&AppConfig::default(), PathBuf::from("test_config.json"))
    }

    fn msg(message_type: &str, data: Value) -> UxMessage {
        UxMessage::new(message_type, data)
    }

    #[test]
    fn ready_handshake_returns_config_and_history() {
        let mut state = state();
        let responses = apply_ux_message(&msg("ready", json!(null)), &mut state, None);

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].message_type, "config");
        assert_eq!(responses[0].data["sensitivity"], 128);
        assert_eq!(responses[0].data["kernel_size"], 5);
        assert_eq!(responses[1].message_type, "history");
    }

    #[test]
    fn roi_message_updates_state() {
        let mut state = state();
        let responses = apply_ux_message(&msg("roi", json!([5, 6, 70, 80])), &mut state, None);

        assert!(responses.is_empty());
        assert_eq!(
            state.roi,
            Roi {
                x: 5,
                y: 6,
                width: 70,
                height: 80
            }
        );
    }

    #[test]
    fn tuning_message_updates_state() {
        let mut state = state();
        let responses = apply_ux_message(
            &msg("tuning", json!({"sensitivity": 40, "kernel_size": 7})),
            &mut state,
            None,
        );

        assert!(responses.is_empty());
        assert_eq!(state.tuning.sensitivity, 40);
        assert_eq!(state.tuning.kernel_size, 7);
    }

    #[test]
    fn toggles_update_flags() {
        let mut state = state();
        apply_ux_message(&msg("live", json!(false)), &mut state, None);
        apply_ux_message(&msg("tuning_mode", json!(true)), &mut state, None);

        assert!(!state.live_display);
        assert!(state.tuning_mode);
    }

    #[test]
    fn measure_without_a_frame_reports_no_layers() {
        let mut state = state();
        let responses = apply_ux_message(&msg("measure", json!(null)), &mut state, None);

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].message_type, "result");
        assert_eq!(responses[0].data, json!(NO_LAYERS_TEXT));
        assert!(state.history.entries().is_empty());
    }

    #[test]
    fn measure_on_a_featureless_frame_reports_no_layers() {
        let mut state = state();
        state.roi = Roi {
            x: 0,
            y: 0,
            width: 32,
            height: 32,
        };
        let frame = Frame {
            data: vec![128; 32 * 32 * 3],
            width: 32,
            height: 32,
            channels: 3,
        };

        let responses = apply_ux_message(&msg("measure", json!(null)), &mut state, Some(&frame));

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].data, json!(NO_LAYERS_TEXT));
        assert!(state.history.entries().is_empty());
    }

    #[test]
    fn unknown_message_is_ignored() {
        let mut state = state();
        let responses = apply_ux_message(&msg("bogus", json!(null)), &mut state, None);
        assert!(responses.is_empty());
    }

    #[test]
    fn history_is_pushed_newest_first() {
        use crate::boundary::BoundaryTriple;

        let mut state = state();
        for i in 0..2usize {
            state.history.push(Measurement::new(
                &BoundaryTriple {
                    upper_serum: 0,
                    interface: 10 + i,
                    lower_liquid: 60,
                },
                format!("t{}", i),
            ));
        }

        let message = history_message(&state);
        let entries = message.data.as_array().unwrap();
        assert_eq!(entries[0]["timestamp"], "t1");
        assert_eq!(entries[1]["timestamp"], "t0");
    }
}
