use std::time::Duration;

/// Default camera address when connected to its access point.
pub const DEFAULT_HOST: &str = "192.168.1.1";

pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default timeout for command requests. Streaming requests are bounded by their own budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for establishing the TCP connection to the camera.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between two `commands/status` requests while waiting for a command.
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of status polls done by `wait_for_processing`.
pub const DEFAULT_MAX_STATUS_POLLS: u32 = 20;

/// Read block size of the live preview stream.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// Upper bound for buffered live preview bytes that don't contain a complete frame.
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 32 << 20;

pub const DEFAULT_PREVIEW_PREFIX: &str = "livePreview";

pub const DEFAULT_PREVIEW_TIME_LIMIT: Duration = Duration::from_secs(10);

/// JPEG Start-Of-Image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG End-Of-Image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Paths below `/osc/`.
pub mod path {
    pub const INFO: &str = "info";
    pub const STATE: &str = "state";
    pub const CHECK_FOR_UPDATES: &str = "checkForUpdates";
    pub const EXECUTE: &str = "commands/execute";
    pub const STATUS: &str = "commands/status";

    pub const BUBL_UPDATE: &str = "_bublUpdate";
    pub const BUBL_GET_IMAGE: &str = "_bublGetImage";
    pub const BUBL_STOP: &str = "commands/_bublStop";
    pub const BUBL_POLL: &str = "commands/_bublPoll";
}

/// Command names for `commands/execute`.
pub mod command {
    pub const START_SESSION: &str = "camera.startSession";
    pub const UPDATE_SESSION: &str = "camera.updateSession";
    pub const CLOSE_SESSION: &str = "camera.closeSession";
    pub const TAKE_PICTURE: &str = "camera.takePicture";
    pub const LIST_IMAGES: &str = "camera.listImages";
    pub const DELETE: &str = "camera.delete";
    pub const GET_IMAGE: &str = "camera.getImage";
    pub const GET_METADATA: &str = "camera.getMetadata";
    pub const SET_OPTIONS: &str = "camera.setOptions";
    pub const GET_OPTIONS: &str = "camera.getOptions";

    pub const BUBL_CAPTURE_VIDEO: &str = "camera._bublCaptureVideo";
    pub const BUBL_SHUTDOWN: &str = "camera._bublShutdown";
    pub const BUBL_STREAM: &str = "camera._bublStream";

    pub const THETA_LIST_ALL: &str = "camera._listAll";
    pub const THETA_FINISH_WLAN: &str = "camera._finishWlan";
    pub const THETA_START_CAPTURE: &str = "camera._startCapture";
    pub const THETA_STOP_CAPTURE: &str = "camera._stopCapture";
    pub const THETA_GET_VIDEO: &str = "camera._getVideo";
    pub const THETA_GET_LIVE_PREVIEW: &str = "camera._getLivePreview";
}
