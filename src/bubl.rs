//! Commands specific to the Bubl camera.
//!
//! The only documentation of these commands is Bubl's JavaScript client:
//! <https://github.com/BublTechnology/osc-client/blob/master/lib/BublOscClient.js>

use std::{future::Future, path::{Path, PathBuf}};

use log::*;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use crate::{
    OscResult,
    client::{ClientConfig, CommandResponse, OscClient, file_name_from_uri},
    consts::{command, path},
    stream,
};

/// Default address of the camera when connected to its access point.
pub const DEFAULT_HOST: &str = "192.168.0.100";

/// Client configuration for a Bubl camera with default network settings.
pub fn config() -> ClientConfig {
    ClientConfig::new(DEFAULT_HOST, crate::consts::DEFAULT_HTTP_PORT)
}

/// This trait provides the Bubl specific commands for the `OscClient` struct.
pub trait BublCommands {
    /// Uploads a firmware image to the camera (`_bublUpdate`).
    ///
    /// * `firmware` - Path of the firmware file.
    fn update_firmware(&self, firmware: &Path) -> impl Future<Output = OscResult<Value>> + Send;

    /// Transfers a file through the `_bublGetImage` endpoint into the output directory.
    ///
    /// Returns the path of the written file.
    fn bubl_get_image(&self, file_uri: &str) -> impl Future<Output = OscResult<PathBuf>> + Send;

    /// Stops a running command, such as a video capture (`_bublStop`).
    fn stop(&self, command_id: &str) -> impl Future<Output = OscResult<Value>> + Send;

    /// Waits until the command's state or the camera state changes (`_bublPoll`).
    ///
    /// * `fingerprint` - The last known state fingerprint.
    /// * `wait_timeout` - Maximum time in seconds the camera holds the request.
    fn poll(
        &self,
        command_id: &str,
        fingerprint: &str,
        wait_timeout: u32,
    ) -> impl Future<Output = OscResult<Value>> + Send;

    /// Starts a video capture. Pass the returned id to `stop` to end it.
    fn capture_video(&self) -> impl Future<Output = OscResult<CommandResponse>> + Send;

    /// Turns the camera off after `shutdown_delay` seconds.
    fn shutdown(&self, shutdown_delay: u32) -> impl Future<Output = OscResult<Value>> + Send;

    /// Saves the live preview stream as a series of JPEG files
    /// (`<prefix>.0000.jpg`, `<prefix>.0001.jpg`, ...) in the output directory.
    ///
    /// Returns the number of frames written.
    fn stream(&self, file_name_prefix: &str, time_limit_secs: f64) -> impl Future<Output = OscResult<u32>> + Send;
}

impl BublCommands for OscClient {
    async fn update_firmware(&self, firmware: &Path) -> OscResult<Value> {
        let url = self.endpoint_url(path::BUBL_UPDATE, false)?;
        let body = tokio::fs::read(firmware).await?;

        info!("Uploading firmware {} ({} bytes)", firmware.display(), body.len());

        // The camera expects the firmware in the body of a GET request.
        let res = self
            .http()
            .get(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .inspect_err(|e| error!("HTTP error: {e}"))?;

        OscClient::handle_response(res).await
    }

    async fn bubl_get_image(&self, file_uri: &str) -> OscResult<PathBuf> {
        let file_name = file_name_from_uri(file_uri)?;
        let url = self.endpoint_url(&format!("{}/{file_uri}", path::BUBL_GET_IMAGE), false)?;

        let res = self
            .http()
            .post(url)
            .send()
            .await
            .inspect_err(|e| error!("HTTP error: {e}"))?;

        let res = OscClient::check_status(res).await?;

        self.download_to_file(res, file_name).await
    }

    async fn stop(&self, command_id: &str) -> OscResult<Value> {
        self.post(path::BUBL_STOP, Some(&json!({ "id": command_id }))).await
    }

    async fn poll(&self, command_id: &str, fingerprint: &str, wait_timeout: u32) -> OscResult<Value> {
        let body = json!({
            "id": command_id,
            "fingerprint": fingerprint,
            "waitTimeout": wait_timeout,
        });

        self.post(path::BUBL_POLL, Some(&body)).await
    }

    async fn capture_video(&self) -> OscResult<CommandResponse> {
        let sid = self.require_session()?;

        let res = self
            .execute(command::BUBL_CAPTURE_VIDEO, json!({ "sessionId": sid }))
            .await?;

        Ok(serde_json::from_value(res)?)
    }

    async fn shutdown(&self, shutdown_delay: u32) -> OscResult<Value> {
        let sid = self.require_session()?;

        info!("Shutting down in {shutdown_delay} s");

        self.execute(
            command::BUBL_SHUTDOWN,
            json!({ "sessionId": sid, "shutdownDelay": shutdown_delay }),
        )
        .await
    }

    async fn stream(&self, file_name_prefix: &str, time_limit_secs: f64) -> OscResult<u32> {
        let config = stream::preview_config(self, file_name_prefix, time_limit_secs);

        stream::stream_live_preview(self, command::BUBL_STREAM, &config).await
    }
}
