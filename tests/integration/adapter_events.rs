//! Poll-and-diff behavior of the generation adapters, driven tick by tick
//! through the mock transport.

use std::sync::Arc;
use std::time::Duration;

use gr::adapter::{CameraAdapter, Gr2Adapter, Gr3Adapter};
use gr::shoot_mode::{DriveMode, SelfTimer};
use gr::transport::mock::{MockTransport, Request};
use gr::{CameraError, CameraEvent, EventKind, PhotoSize};
use serde_json::json;

use crate::common::fixtures::{gr2_props, gr3_props, settings, with};
use crate::common::gated::GatedTransport;
use crate::common::recorder::EventRecorder;
use crate::common::{advance, init_test_logging};

const POLL: Duration = Duration::from_millis(500);

fn gr3() -> (Gr3Adapter, Arc<MockTransport>, EventRecorder) {
    init_test_logging();
    let mock = Arc::new(MockTransport::new());
    let adapter = Gr3Adapter::new(mock.clone(), POLL);
    let recorder = EventRecorder::attach(adapter.events());
    (adapter, mock, recorder)
}

fn gr2() -> (Gr2Adapter, Arc<MockTransport>, EventRecorder) {
    init_test_logging();
    let mock = Arc::new(MockTransport::new());
    let adapter = Gr2Adapter::new(mock.clone(), POLL);
    let recorder = EventRecorder::attach(adapter.events());
    (adapter, mock, recorder)
}

#[tokio::test]
async fn test_first_successful_poll_emits_connected() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());

    assert!(!adapter.is_connected());
    adapter.session().tick().await;

    assert!(adapter.is_connected());
    assert_eq!(recorder.kinds(), vec![EventKind::Connected]);
    let CameraEvent::Connected { snapshot } = recorder.last(EventKind::Connected) else {
        unreachable!()
    };
    assert_eq!(snapshot["av"], "2.8");

    let settings = adapter.capture_settings().unwrap();
    assert_eq!(settings.get_str("av"), Some("2.8"));
    assert!(settings.get("model").is_none());
}

#[tokio::test]
async fn test_unreachable_camera_stays_silent() {
    let (adapter, mock, recorder) = gr3();
    mock.disconnect();

    adapter.session().tick().await;
    adapter.session().tick().await;

    assert!(!adapter.is_connected());
    assert!(recorder.events().is_empty());
    assert_eq!(mock.count_for("/v1/props"), 2);
}

#[tokio::test]
async fn test_aperture_change_emits_capture_event_only() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    mock.respond("/v1/props", with(gr3_props(), "av", json!("4.0")));
    adapter.session().tick().await;

    assert_eq!(recorder.kinds(), vec![EventKind::CaptureSettingsChanged]);
    let event = recorder.last(EventKind::CaptureSettingsChanged);
    let differences = event.differences().unwrap();
    assert_eq!(differences.count(), 1);
    let change = differences.get("av").unwrap();
    assert_eq!(change.before, Some(json!("2.8")));
    assert_eq!(change.after, Some(json!("4.0")));
    assert_eq!(event.snapshot().unwrap()["av"], "4.0");
    assert_eq!(adapter.device_info().unwrap()["av"], "4.0");
}

#[tokio::test]
async fn test_clock_only_change_is_ignored() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    mock.respond(
        "/v1/props",
        with(gr3_props(), "datetime", json!("2024-05-01T10:00:01")),
    );
    adapter.session().tick().await;

    assert!(recorder.events().is_empty());
    // The cache keeps the connect-time snapshot since nothing relevant changed.
    assert_eq!(adapter.device_info().unwrap()["datetime"], "2024-05-01T10:00:00");
}

#[tokio::test]
async fn test_one_change_can_fire_several_kinds() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    let changed = with(
        with(gr3_props(), "focusSetting", json!("mf")),
        "orientation",
        json!(90),
    );
    mock.respond("/v1/props", changed);
    adapter.session().tick().await;

    assert_eq!(
        recorder.kinds(),
        vec![
            EventKind::CaptureSettingsChanged,
            EventKind::FocusChanged,
            EventKind::OrientationChanged,
        ]
    );
    assert_eq!(adapter.get_focus_setting().unwrap(), "mf");
}

#[tokio::test]
async fn test_storage_change_on_gr3() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    mock.respond(
        "/v1/props",
        with(gr3_props(), "storages", json!([{"name": "SD1", "remain": 1199}])),
    );
    adapter.session().tick().await;

    assert_eq!(recorder.kinds(), vec![EventKind::StorageChanged]);
}

#[tokio::test]
async fn test_poll_failure_disconnects_and_clears_cache() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;

    mock.disconnect();
    adapter.session().tick().await;

    assert!(!adapter.is_connected());
    assert!(adapter.device_info().is_none());
    assert!(adapter.capture_settings().is_none());
    assert_eq!(
        recorder.kinds(),
        vec![EventKind::Connected, EventKind::Disconnected]
    );

    // Still down: no repeated Disconnected.
    adapter.session().tick().await;
    assert_eq!(recorder.count(EventKind::Disconnected), 1);

    mock.reconnect();
    adapter.session().tick().await;
    assert_eq!(recorder.count(EventKind::Connected), 2);
}

#[tokio::test]
async fn test_gr2_overlays_capture_params_on_cache() {
    let (adapter, mock, recorder) = gr2();
    mock.respond("/v1/props", gr2_props());
    adapter.session().tick().await;
    recorder.clear();
    mock.clear_requests();

    mock.respond(
        "/v1/params/camera",
        json!({"av": "5.6", "storages": [], "datetime": "2024-05-01T10:00:05"}),
    );
    adapter.session().tick().await;

    mock.assert_requests(&[Request::get("/v1/params/camera")]);
    assert_eq!(recorder.kinds(), vec![EventKind::CaptureSettingsChanged]);
    let differences = recorder
        .last(EventKind::CaptureSettingsChanged)
        .differences()
        .cloned()
        .unwrap();
    assert_eq!(differences.keys().collect::<Vec<_>>(), vec!["av"]);

    let info = adapter.device_info().unwrap();
    assert_eq!(info["model"], "GR II");
    assert_eq!(info["av"], "5.6");
}

#[tokio::test]
async fn test_gr2_never_reports_orientation() {
    let (adapter, _mock, _recorder) = gr2();
    let kinds = adapter.session().event_kinds();
    assert!(kinds.contains(&EventKind::FocusChanged));
    assert!(!kinds.contains(&EventKind::OrientationChanged));
    assert!(!kinds.contains(&EventKind::StorageChanged));
}

#[tokio::test(start_paused = true)]
async fn test_listening_polls_on_schedule() {
    let (adapter, mock, recorder) = gr3();
    mock.respond("/v1/props", gr3_props());

    adapter.start_listening();
    assert!(adapter.is_listening());
    advance(499).await;
    mock.assert_no_requests();

    advance(2).await;
    assert_eq!(recorder.kinds(), vec![EventKind::Connected]);

    advance(1000).await;
    assert_eq!(mock.count_for("/v1/props"), 3);

    adapter.stop_listening();
    advance(2000).await;
    assert_eq!(mock.count_for("/v1/props"), 3);
    assert!(!adapter.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_temporary_fast_polling_reverts() {
    let (adapter, mock, _recorder) = gr3();
    mock.respond("/v1/props", gr3_props());

    adapter.start_listening();
    adapter
        .set_poll_interval_temporarily(Duration::from_millis(100), 3)
        .unwrap();

    advance(301).await;
    assert_eq!(mock.count_for("/v1/props"), 3);

    // Back on the 500 ms default.
    advance(400).await;
    assert_eq!(mock.count_for("/v1/props"), 3);
    advance(101).await;
    assert_eq!(mock.count_for("/v1/props"), 4);

    adapter.stop_listening();
}

#[tokio::test]
async fn test_invalid_temporary_interval_leaves_schedule() {
    let (adapter, _mock, _recorder) = gr3();
    assert!(matches!(
        adapter.set_poll_interval_temporarily(Duration::from_millis(100), 0),
        Err(CameraError::InvalidArgument(_))
    ));
    assert!(matches!(
        adapter.set_poll_interval(Duration::ZERO),
        Err(CameraError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_focus_lock_validates_and_rounds() {
    let (adapter, mock, _recorder) = gr3();

    assert!(matches!(
        adapter.lock_focus(101.0, 50.0).await,
        Err(CameraError::InvalidArgument(_))
    ));
    assert!(matches!(
        adapter.lock_focus(50.0, -1.0).await,
        Err(CameraError::InvalidArgument(_))
    ));
    mock.assert_no_requests();

    adapter.lock_focus(50.6, 50.0).await.unwrap();
    mock.assert_requests(&[Request::post("/v1/lens/focus/lock", "pos=51,50")]);
}

#[tokio::test]
async fn test_shutter_with_and_without_point() {
    let (adapter, mock, _recorder) = gr3();

    adapter.take_photo(None).await.unwrap();
    adapter.take_photo(Some((10.0, 20.0))).await.unwrap();

    mock.assert_requests(&[
        Request::post("/v1/camera/shoot", "af=camera"),
        Request::post("/v1/camera/shoot", "af=on&pos=10,20"),
    ]);
}

#[tokio::test]
async fn test_gr3_shoot_mode_round_trip_through_cache() {
    let (adapter, mock, _recorder) = gr3();
    mock.respond("/v1/props", with(gr3_props(), "shootMode", json!("continuous_self2s")));
    adapter.session().tick().await;

    assert_eq!(adapter.get_drive_mode().unwrap(), DriveMode::Continuous);
    assert_eq!(adapter.get_self_timer_option().unwrap(), SelfTimer::TwoSeconds);

    mock.clear_requests();
    adapter
        .set_shoot_mode(DriveMode::Interval, SelfTimer::TenSeconds)
        .await
        .unwrap();
    // Interval has no timer variant, so the plain mode is written.
    mock.assert_requests(&[Request::put("/v1/params/camera", "shootMode=interval")]);
}

#[tokio::test]
async fn test_gr2_rejects_gr3_only_operations_without_requests() {
    let (adapter, mock, _recorder) = gr2();

    assert!(matches!(
        adapter.set_shoot_mode(DriveMode::Single, SelfTimer::Off).await,
        Err(CameraError::NotSupported { .. })
    ));
    assert!(matches!(
        adapter.list_drive_modes(),
        Err(CameraError::NotSupported { .. })
    ));
    assert!(matches!(
        adapter.list_photos().await,
        Err(CameraError::NotSupported { .. })
    ));
    mock.assert_no_requests();
}

#[tokio::test]
async fn test_capture_settings_write_is_form_encoded() {
    let (adapter, mock, _recorder) = gr3();

    adapter
        .set_capture_settings(&settings(&[("av", json!("4.0")), ("sv", json!(400))]))
        .await
        .unwrap();
    mock.assert_requests(&[Request::put("/v1/params/camera", "av=4.0&sv=400")]);

    mock.clear_requests();
    assert!(matches!(
        adapter.set_capture_settings(&settings(&[])).await,
        Err(CameraError::InvalidArgument(_))
    ));
    mock.assert_no_requests();
}

#[tokio::test]
async fn test_photo_urls_per_generation() {
    let (gr3, _, _) = gr3();
    let (gr2, _, _) = gr2();

    assert_eq!(
        gr3.photo_url("100RICOH", "R0000001.JPG", PhotoSize::Large),
        "http://192.168.0.1/v1/photos/100RICOH/R0000001.JPG?size=full"
    );
    assert_eq!(
        gr2.photo_url("100RICOH", "R0000001.JPG", PhotoSize::Large),
        "http://192.168.0.1/v1/photos/100RICOH/R0000001.JPG?size=view"
    );
    assert_eq!(
        gr2.photo_url("100RICOH", "R0000001.JPG", PhotoSize::Thumbnail),
        "http://192.168.0.1/v1/photos/100RICOH/R0000001.JPG?size=thumb"
    );
}

#[tokio::test]
async fn test_poll_result_discarded_after_stop_listening() {
    init_test_logging();
    let transport = Arc::new(GatedTransport::new());
    let adapter = Gr3Adapter::new(transport.clone(), POLL);
    let recorder = EventRecorder::attach(adapter.events());

    transport.mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    transport.mock.respond("/v1/props", with(gr3_props(), "av", json!("4.0")));
    transport.close();

    let control = async {
        tokio::task::yield_now().await;
        adapter.stop_listening();
        transport.release();
    };
    tokio::join!(adapter.session().tick(), control);

    assert!(recorder.events().is_empty());
    assert_eq!(adapter.device_info().unwrap()["av"], "2.8");
}

#[tokio::test]
async fn test_failure_after_stop_listening_keeps_connection() {
    init_test_logging();
    let transport = Arc::new(GatedTransport::new());
    let adapter = Gr3Adapter::new(transport.clone(), POLL);
    let recorder = EventRecorder::attach(adapter.events());

    transport.mock.respond("/v1/props", gr3_props());
    adapter.session().tick().await;
    recorder.clear();

    transport.mock.disconnect();
    transport.close();

    let control = async {
        tokio::task::yield_now().await;
        adapter.stop_listening();
        transport.release();
    };
    tokio::join!(adapter.session().tick(), control);

    assert!(recorder.events().is_empty());
    assert!(adapter.is_connected());
}
