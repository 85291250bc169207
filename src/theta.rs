//! Commands specific to the Ricoh Theta S.
//!
//! Reference: <https://developers.theta360.com/en/docs/v2/api_reference/>

use std::{future::Future, path::PathBuf};

use log::*;
use serde_json::{Value, json};

use crate::{
    OscError, OscResult,
    client::{ClientConfig, OscClient, file_name_from_uri},
    consts::{self, command},
    options::{CaptureMode, RICOH_OPTIONS, SortOrder, VideoType},
    stream,
};

/// Client configuration for a Theta S with default network settings.
/// The Ricoh option names are accepted by `set_option`.
pub fn config() -> ClientConfig {
    ClientConfig {
        extra_options: RICOH_OPTIONS.iter().map(|name| (*name).to_owned()).collect(),
        ..ClientConfig::new(consts::DEFAULT_HOST, consts::DEFAULT_HTTP_PORT)
    }
}

/// This trait provides the Ricoh Theta S specific commands for the `OscClient` struct.
pub trait ThetaCommands {
    /// Switches between still image and video capture.
    fn set_capture_mode(&self, mode: CaptureMode) -> impl Future<Output = OscResult<Value>> + Send;

    fn get_capture_mode(&self) -> impl Future<Output = OscResult<CaptureMode>> + Send;

    /// Lists still images and videos (`camera._listAll`).
    ///
    /// * `entry_count` - Number of entries to return.
    /// * `detail` - If false, only `name`, `uri`, `size` and `dateTime` are returned.
    /// * `sort` - Sort order by `dateTime`.
    fn list_all(&self, entry_count: u32, detail: bool, sort: SortOrder) -> impl Future<Output = OscResult<Value>> + Send;

    /// Turns the wireless LAN off.
    fn finish_wlan(&self) -> impl Future<Output = OscResult<Value>> + Send;

    /// Starts a video capture in video mode, or interval shooting in image mode.
    fn start_capture(&self) -> impl Future<Output = OscResult<Value>> + Send;

    /// Stops a capture started with `start_capture`.
    fn stop_capture(&self) -> impl Future<Output = OscResult<Value>> + Send;

    /// Transfers a video file (or its thumbnail) into the output directory.
    ///
    /// Returns the path of the written file.
    fn get_video(&self, file_uri: &str, video_type: VideoType) -> impl Future<Output = OscResult<PathBuf>> + Send;

    /// Transfers the latest captured file as a video, if there is one.
    fn get_latest_video(&mut self, video_type: VideoType) -> impl Future<Output = OscResult<Option<PathBuf>>> + Send;

    /// Saves the live preview stream as a series of JPEG files
    /// (`<prefix>.0000.jpg`, `<prefix>.0001.jpg`, ...) in the output directory.
    /// The capture mode must be `image`.
    ///
    /// Returns the number of frames written.
    fn get_live_preview(
        &self,
        file_name_prefix: &str,
        time_limit_secs: f64,
    ) -> impl Future<Output = OscResult<u32>> + Send;
}

impl ThetaCommands for OscClient {
    async fn set_capture_mode(&self, mode: CaptureMode) -> OscResult<Value> {
        self.set_option("captureMode", mode.as_str()).await
    }

    async fn get_capture_mode(&self) -> OscResult<CaptureMode> {
        let mode = self.get_option("captureMode").await?;

        mode.as_str()
            .and_then(|mode| mode.parse().ok())
            .ok_or(OscError::InvalidResponse("captureMode"))
    }

    async fn list_all(&self, entry_count: u32, detail: bool, sort: SortOrder) -> OscResult<Value> {
        self.execute(
            command::THETA_LIST_ALL,
            json!({ "entryCount": entry_count, "detail": detail, "sort": sort.as_str() }),
        )
        .await
    }

    async fn finish_wlan(&self) -> OscResult<Value> {
        let sid = self.require_session()?;

        info!("Turning the wireless LAN off");

        self.execute(command::THETA_FINISH_WLAN, json!({ "sessionId": sid })).await
    }

    async fn start_capture(&self) -> OscResult<Value> {
        let sid = self.require_session()?;

        self.execute(command::THETA_START_CAPTURE, json!({ "sessionId": sid })).await
    }

    async fn stop_capture(&self) -> OscResult<Value> {
        let sid = self.require_session()?;

        self.execute(command::THETA_STOP_CAPTURE, json!({ "sessionId": sid })).await
    }

    async fn get_video(&self, file_uri: &str, video_type: VideoType) -> OscResult<PathBuf> {
        let file_name = file_name_from_uri(file_uri)?;

        let res = self
            .execute_stream(
                command::THETA_GET_VIDEO,
                json!({ "fileUri": file_uri, "type": video_type.as_str() }),
            )
            .await?;

        self.download_to_file(res, file_name).await
    }

    async fn get_latest_video(&mut self, video_type: VideoType) -> OscResult<Option<PathBuf>> {
        match self.latest_file_uri().await? {
            Some(uri) => Ok(Some(self.get_video(&uri, video_type).await?)),
            None => Ok(None),
        }
    }

    async fn get_live_preview(&self, file_name_prefix: &str, time_limit_secs: f64) -> OscResult<u32> {
        let config = stream::preview_config(self, file_name_prefix, time_limit_secs);

        stream::stream_live_preview(self, command::THETA_GET_LIVE_PREVIEW, &config).await
    }
}
