//! Controller detection, event forwarding and adapter replacement.

use std::sync::Arc;
use std::time::Duration;

use gr::transport::mock::MockTransport;
use gr::{CameraError, Controller, ControllerOptions, ControllerState, DeviceFamily, EventKind};
use serde_json::json;

use crate::common::fixtures::{gr2_props, gr3_props, with};
use crate::common::gated::GatedTransport;
use crate::common::recorder::EventRecorder;
use crate::common::{advance, init_test_logging};

fn controller(auto_reconnect: bool) -> (Controller, Arc<MockTransport>, EventRecorder) {
    init_test_logging();
    let mock = Arc::new(MockTransport::new());
    let options = ControllerOptions {
        poll_interval: Duration::from_millis(500),
        detect_interval: Duration::from_millis(1000),
        auto_reconnect,
    };
    let controller = Controller::new(mock.clone(), options);
    let recorder = EventRecorder::attach(controller.events());
    (controller, mock, recorder)
}

#[tokio::test(start_paused = true)]
async fn test_detection_installs_matching_adapter() {
    let (controller, mock, recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());

    controller.start_detection();
    assert_eq!(controller.state(), ControllerState::Detecting);
    advance(1001).await;

    assert_eq!(controller.family(), Some(DeviceFamily::Gr3));
    assert_eq!(controller.state(), ControllerState::Connected);
    // Adapter is listening but has not polled yet.
    assert!(!controller.is_connected());

    advance(500).await;
    assert!(controller.is_connected());
    assert_eq!(recorder.kinds(), vec![EventKind::Connected]);
}

#[tokio::test(start_paused = true)]
async fn test_detection_keeps_probing_until_camera_appears() {
    let (controller, mock, _recorder) = controller(true);
    mock.disconnect();

    controller.start_detection();
    advance(3001).await;
    assert_eq!(mock.count_for("/v1/props"), 3);
    assert!(!controller.has_adapter());
    assert_eq!(controller.state(), ControllerState::Detecting);

    mock.reconnect();
    mock.respond("/v1/props", gr2_props());
    advance(1000).await;
    assert_eq!(controller.family(), Some(DeviceFamily::Gr2));
}

#[tokio::test(start_paused = true)]
async fn test_no_probe_while_adapter_installed() {
    let (controller, mock, _recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());

    assert_eq!(controller.detect().await.unwrap(), DeviceFamily::Gr3);
    assert_eq!(controller.detect().await.unwrap(), DeviceFamily::Gr3);
    controller.start_detection();
    assert_eq!(mock.count_for("/v1/props"), 1);
    assert_eq!(controller.state(), ControllerState::Connected);

    controller.shutdown();
}

#[tokio::test]
async fn test_gr3x_model_selects_gr3x_family() {
    let (controller, mock, _recorder) = controller(true);
    mock.respond("/v1/props", with(gr3_props(), "model", json!("RICOH GR IIIx")));

    assert_eq!(controller.detect().await.unwrap(), DeviceFamily::Gr3x);
    assert!(controller.list_dial_modes().unwrap().contains(&"Snap"));
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_changes_are_forwarded() {
    let (controller, mock, recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());
    controller.detect().await.unwrap();
    advance(501).await;

    mock.respond("/v1/props", with(gr3_props(), "av", json!("4.0")));
    advance(500).await;

    assert_eq!(
        recorder.kinds(),
        vec![EventKind::Connected, EventKind::CaptureSettingsChanged]
    );
    let settings = controller.capture_settings().unwrap().unwrap();
    assert_eq!(settings.get_str("av"), Some("4.0"));
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_tears_down_and_redetects() {
    let (controller, mock, recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());
    controller.detect().await.unwrap();
    advance(501).await;

    mock.disconnect();
    advance(500).await;

    assert_eq!(
        recorder.kinds(),
        vec![EventKind::Connected, EventKind::Disconnected]
    );
    assert!(!controller.has_adapter());
    assert_eq!(controller.state(), ControllerState::Detecting);
    assert!(matches!(
        controller.take_photo(None).await,
        Err(CameraError::NotConnected)
    ));

    // The camera comes back as a different generation.
    mock.reconnect();
    mock.respond("/v1/props", gr2_props());
    advance(1000).await;
    assert_eq!(controller.family(), Some(DeviceFamily::Gr2));

    advance(500).await;
    assert_eq!(recorder.count(EventKind::Connected), 2);
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_without_auto_reconnect_stays_down() {
    let (controller, mock, recorder) = controller(false);
    mock.respond("/v1/props", gr3_props());
    controller.detect().await.unwrap();
    advance(501).await;

    mock.disconnect();
    advance(500).await;
    assert_eq!(controller.state(), ControllerState::Disconnected);

    mock.clear_requests();
    advance(5000).await;
    mock.assert_no_requests();
    assert_eq!(recorder.count(EventKind::Disconnected), 1);
}

#[tokio::test(start_paused = true)]
async fn test_old_adapter_events_are_not_forwarded_after_swap() {
    let (controller, mock, recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());
    controller.detect().await.unwrap();
    advance(501).await;

    mock.disconnect();
    advance(500).await;
    recorder.clear();

    // Only the fresh adapter polls from now on: one Connected, not two.
    mock.reconnect();
    advance(1000).await;
    advance(500).await;
    advance(1000).await;
    assert_eq!(recorder.kinds(), vec![EventKind::Connected]);
    controller.shutdown();
}

#[tokio::test]
async fn test_operations_route_to_active_adapter() {
    let (controller, mock, _recorder) = controller(true);
    mock.respond("/v1/props", gr2_props());
    controller.detect().await.unwrap();
    mock.clear_requests();

    controller.set_dial_mode("Av").await.unwrap();
    assert!(matches!(
        controller.get_drive_mode(),
        Err(CameraError::NotSupported { .. })
    ));
    assert_eq!(controller.live_view_url().unwrap(), "http://192.168.0.1/v1/display");
    assert_eq!(mock.count_for("/_gr"), 1);
    controller.shutdown();
}

#[tokio::test]
async fn test_shutdown_returns_to_unpaired() {
    let (controller, mock, _recorder) = controller(true);
    mock.respond("/v1/props", gr3_props());
    controller.detect().await.unwrap();

    controller.shutdown();
    assert_eq!(controller.state(), ControllerState::Unpaired);
    assert!(!controller.has_adapter());
    assert!(matches!(controller.live_view_url(), Err(CameraError::NotConnected)));
}

fn gated_controller() -> (Controller, Arc<GatedTransport>) {
    init_test_logging();
    let transport = Arc::new(GatedTransport::new());
    transport.mock.respond("/v1/props", gr3_props());
    let controller = Controller::new(transport.clone(), ControllerOptions::default());
    transport.close();
    (controller, transport)
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_discards_probe_in_flight() {
    let (controller, transport) = gated_controller();

    controller.start_detection();
    advance(1001).await;
    assert_eq!(transport.mock.count_for("/v1/props"), 0);

    controller.shutdown();
    transport.release();
    advance(10).await;

    assert_eq!(transport.mock.count_for("/v1/props"), 1);
    assert!(!controller.has_adapter());
    assert_eq!(controller.state(), ControllerState::Unpaired);

    advance(3000).await;
    assert!(!controller.is_connected());
    assert_eq!(transport.mock.count_for("/v1/props"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_detection_discards_probe_in_flight() {
    let (controller, transport) = gated_controller();

    controller.start_detection();
    advance(1001).await;
    controller.stop_detection();
    assert_eq!(controller.state(), ControllerState::Unpaired);

    transport.release();
    advance(10).await;
    assert_eq!(transport.mock.count_for("/v1/props"), 1);
    assert_eq!(controller.family(), None);
    assert_eq!(controller.state(), ControllerState::Unpaired);

    // A later detection round still works.
    controller.start_detection();
    transport.release();
    advance(1001).await;
    assert_eq!(controller.family(), Some(DeviceFamily::Gr3));
    assert_eq!(controller.state(), ControllerState::Connected);
    controller.shutdown();
}
