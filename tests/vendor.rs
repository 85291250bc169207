mod common;

use std::{path::Path, time::Duration};

use common::{FULL_API, FakeCamera, Reply, files_in, info_reply, session_reply};
use osc_cam_rs::{
    OscError,
    bubl::BublCommands,
    client::{ClientConfig, OscClient},
    options::{CaptureMode, SortOrder},
    theta::{self, ThetaCommands},
};
use serde_json::json;

fn theta_client_config(camera: &FakeCamera) -> ClientConfig {
    ClientConfig {
        extra_options: theta::config().extra_options,
        ..camera.config()
    }
}

fn theta_client_config_in(camera: &FakeCamera, dir: &Path) -> ClientConfig {
    ClientConfig {
        output_dir: dir.to_owned(),
        ..theta_client_config(camera)
    }
}

#[tokio::test]
async fn live_preview_writes_numbered_frames() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let dir = tempfile::tempdir().unwrap();
    let config = theta_client_config_in(&camera, dir.path());

    let requests = camera.serve(move |req| match (req.path.as_str(), req.command().as_deref()) {
        ("/osc/info", _) => info_reply(port, FULL_API),
        (_, Some("camera.startSession")) => session_reply(),
        _ => Reply::chunked(vec![
            vec![0xAA, 0xBB, 0xFF, 0xD8, 0x01, 0x02],
            vec![0xFF, 0xD9, 0xFF, 0xD8, 0x03],
            vec![0xFF, 0xD9],
        ]),
    });

    let cam = OscClient::connect(config).await.unwrap();
    let frames = cam.get_live_preview("test", 2.0).await.unwrap();

    assert_eq!(frames, 2);
    assert_eq!(files_in(dir.path()), ["test.0000.jpg", "test.0001.jpg"]);
    assert_eq!(
        std::fs::read(dir.path().join("test.0000.jpg")).unwrap(),
        [0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]
    );
    assert_eq!(std::fs::read(dir.path().join("test.0001.jpg")).unwrap(), [0xFF, 0xD8, 0x03, 0xFF, 0xD9]);

    let requests = requests.lock().unwrap();
    let preview = requests.last().unwrap();
    assert_eq!(preview.command().as_deref(), Some("camera._getLivePreview"));
    assert_eq!(preview.json()["parameters"], json!({ "sessionId": "SID_0001" }));
}

#[tokio::test]
async fn live_preview_refused_writes_nothing() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let dir = tempfile::tempdir().unwrap();
    let config = theta_client_config_in(&camera, dir.path());

    camera.serve(move |req| match (req.path.as_str(), req.command().as_deref()) {
        ("/osc/info", _) => info_reply(port, FULL_API),
        (_, Some("camera.startSession")) => session_reply(),
        _ => Reply::json(
            503,
            json!({
                "name": "camera._getLivePreview",
                "state": "error",
                "error": { "code": "serviceUnavailable", "message": "Capture mode is video" },
            }),
        ),
    });

    let cam = OscClient::connect(config).await.unwrap();
    let res = cam.get_live_preview("test", 2.0).await;

    assert!(matches!(res, Err(OscError::Camera { status: 503, .. })));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn live_preview_without_answer_times_out() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let dir = tempfile::tempdir().unwrap();
    let config = theta_client_config_in(&camera, dir.path());

    camera.serve(move |req| match (req.path.as_str(), req.command().as_deref()) {
        ("/osc/info", _) => info_reply(port, FULL_API),
        (_, Some("camera.startSession")) => session_reply(),
        _ => Reply::stalled(),
    });

    let cam = OscClient::connect(config).await.unwrap();
    let start = std::time::Instant::now();

    let res = tokio::time::timeout(Duration::from_secs(5), cam.get_live_preview("test", 0.2))
        .await
        .expect("live preview outlived its time limit");

    assert!(matches!(res, Err(OscError::Timeout(_))));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn live_preview_requires_session() {
    let camera = FakeCamera::bind().await;
    let cam = OscClient::new(theta_client_config(&camera)).unwrap();

    assert!(matches!(cam.get_live_preview("test", 1.0).await, Err(OscError::NoSession)));
}

#[tokio::test]
async fn theta_capture_mode_and_list_all() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let config = theta_client_config(&camera);

    let requests = camera.serve(move |req| match (req.path.as_str(), req.command().as_deref()) {
        ("/osc/info", _) => info_reply(port, FULL_API),
        (_, Some("camera.startSession")) => session_reply(),
        (_, Some("camera.getOptions")) => Reply::json(
            200,
            json!({ "name": "camera.getOptions", "state": "done", "results": { "options": { "captureMode": "_video" } } }),
        ),
        (_, Some(name)) => Reply::json(200, json!({ "name": name, "state": "done", "results": {} })),
        _ => Reply::json(404, json!({})),
    });

    let cam = OscClient::connect(config).await.unwrap();

    cam.set_capture_mode(CaptureMode::Video).await.unwrap();
    assert_eq!(cam.get_capture_mode().await.unwrap(), CaptureMode::Video);
    cam.list_all(10, false, SortOrder::Oldest).await.unwrap();

    let requests = requests.lock().unwrap();
    let params: Vec<_> = requests
        .iter()
        .skip(2)
        .map(|r| (r.command().unwrap_or_default(), r.json()["parameters"].clone()))
        .collect();

    assert_eq!(params[0].0, "camera.setOptions");
    assert_eq!(params[0].1["options"], json!({ "captureMode": "_video" }));
    assert_eq!(params[1].1["optionNames"], json!(["captureMode"]));
    assert_eq!(params[2].0, "camera._listAll");
    assert_eq!(params[2].1, json!({ "entryCount": 10, "detail": false, "sort": "oldest" }));
}

#[tokio::test]
async fn bubl_stream_and_stop() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let dir = tempfile::tempdir().unwrap();
    let config = camera.config_in(dir.path());

    let requests = camera.serve(move |req| match (req.path.as_str(), req.command().as_deref()) {
        ("/osc/info", _) => info_reply(port, FULL_API),
        (_, Some("camera.startSession")) => session_reply(),
        ("/osc/commands/_bublStop", _) => Reply::json(200, json!({ "name": "camera._bublStop", "state": "done" })),
        _ => Reply::chunked(vec![vec![0xFF, 0xD8, 0x10, 0xFF, 0xD9]]),
    });

    let cam = OscClient::connect(config).await.unwrap();

    assert_eq!(cam.stream("bubl", 2.0).await.unwrap(), 1);
    assert_eq!(files_in(dir.path()), ["bubl.0000.jpg"]);

    cam.stop("42").await.unwrap();

    let requests = requests.lock().unwrap();
    assert!(requests.iter().any(|r| r.command().as_deref() == Some("camera._bublStream")));

    let stop = requests.last().unwrap();
    assert_eq!(stop.path, "/osc/commands/_bublStop");
    assert_eq!(stop.json(), json!({ "id": "42" }));
}

#[tokio::test]
async fn bubl_firmware_is_sent_with_get() {
    let camera = FakeCamera::bind().await;
    let port = camera.port();
    let dir = tempfile::tempdir().unwrap();
    let config = camera.config_in(dir.path());
    let firmware = dir.path().join("firmware.bin");
    std::fs::write(&firmware, b"\x00\x01firmware").unwrap();

    let requests = camera.serve(move |req| match req.path.as_str() {
        "/osc/info" => info_reply(port, FULL_API),
        "/osc/_bublUpdate" => Reply::json(200, json!({})),
        _ => session_reply(),
    });

    let cam = OscClient::connect(config).await.unwrap();
    cam.update_firmware(&firmware).await.unwrap();

    let requests = requests.lock().unwrap();
    let update = requests.last().unwrap();
    assert_eq!(update.method, "GET");
    assert_eq!(update.path, "/osc/_bublUpdate");
    assert_eq!(update.body, b"\x00\x01firmware");
}
