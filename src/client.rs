use std::{path::PathBuf, time::Duration};

use futures::TryStreamExt as _;
use log::*;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt as _;

use crate::{
    OscError, OscResult,
    consts::{self, command, path},
    options::{ImageType, OSC_OPTIONS},
};

/// Connection settings of an [`OscClient`].
///
/// Vendor modules provide presets, see [`crate::bubl::config`] and [`crate::theta::config`].
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
    /// Vendor option names accepted by `set_option` on top of the OSC ones.
    #[serde(default)]
    pub extra_options: Vec<String>,
    /// Directory where downloaded files and live preview frames are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            extra_options: Vec::new(),
            output_dir: default_output_dir(),
        }
    }
}

impl ClientConfig {
    /// Default configuration for a camera reachable at `host:port`.
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            ..Self::default()
        }
    }
}

fn default_host() -> String {
    consts::DEFAULT_HOST.into()
}
fn default_http_port() -> u16 {
    consts::DEFAULT_HTTP_PORT
}
fn default_request_timeout_secs() -> u64 {
    consts::DEFAULT_REQUEST_TIMEOUT.as_secs()
}
fn default_connect_timeout_secs() -> u64 {
    consts::DEFAULT_CONNECT_TIMEOUT.as_secs()
}
fn default_status_poll_interval_ms() -> u64 {
    consts::STATUS_POLL_INTERVAL.as_millis() as u64
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// State of a command as reported by `commands/execute` and `commands/status`.
pub enum CommandState {
    Done,
    InProgress,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// Error object of an OSC response body.
pub struct CommandError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
/// Response of a command which may complete asynchronously.
pub struct CommandResponse {
    pub name: Option<String>,
    pub state: CommandState,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub results: Option<Value>,
    pub error: Option<CommandError>,
    pub progress: Option<Value>,
}

/// Some cameras report command ids as numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(id)) => Some(id),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Client for a camera implementing the Open Spherical Camera API.
///
/// The client owns the session state (session id, state fingerprint)
/// and the endpoint list reported by the camera's `info` command.
pub struct OscClient {
    http: reqwest::Client,
    config: ClientConfig,
    sid: Option<String>,
    fingerprint: Option<String>,
    api: Option<Vec<String>>,
    http_port: u16,
    updates_port: u16,
}

impl OscClient {
    /// Creates the client without contacting the camera.
    pub fn new(config: ClientConfig) -> OscResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            http_port: config.http_port,
            updates_port: config.http_port,
            config,
            sid: None,
            fingerprint: None,
            api: None,
        })
    }

    /// Creates the client, starts a session and reads the camera info.
    ///
    /// A camera refusing the session is not fatal (the session can be started later with
    /// `start_session`), transport failures are.
    pub async fn connect(config: ClientConfig) -> OscResult<Self> {
        let mut cam = Self::new(config)?;

        if let Err(e) = cam.start_session().await {
            if !e.is_camera_error() {
                return Err(e);
            }

            warn!("Camera refused to start a session: {e}");
        }

        cam.info().await?;

        Ok(cam)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_id(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Returns the supported API paths, if `info` was called.
    pub fn api(&self) -> Option<&[String]> {
        self.api.as_deref()
    }

    /// Returns all option names accepted by `set_option`.
    pub fn option_names(&self) -> Vec<&str> {
        OSC_OPTIONS
            .iter()
            .copied()
            .chain(self.config.extra_options.iter().map(String::as_str))
            .collect()
    }

    /// Returns the session id or `OscError::NoSession`.
    pub fn require_session(&self) -> OscResult<&str> {
        self.sid.as_deref().ok_or(OscError::NoSession)
    }

    /// Builds the URL of an endpoint below `/osc/`.
    ///
    /// * `path` - Path relative to `/osc/`, e.g. `commands/execute`.
    /// * `updates` - Use the camera's `httpUpdatesPort` instead of the `httpPort`.
    pub fn endpoint_url(&self, path: &str, updates: bool) -> OscResult<String> {
        let osc_path = format!("/osc/{path}");

        if let Some(api) = &self.api {
            // Parameterised paths such as `_bublGetImage/<uri>` are checked by their first segment.
            let base = path
                .split_once('/')
                .filter(|(first, _)| first.starts_with('_'))
                .map(|(first, _)| format!("/osc/{first}"));

            let supported = api
                .iter()
                .any(|p| *p == osc_path || base.as_deref() == Some(p.as_str()));

            if !supported {
                error!("Unsupported API: {osc_path}, supported API is: {api:?}");
                return Err(OscError::UnsupportedEndpoint { path: osc_path });
            }
        }

        let port = if updates { self.updates_port } else { self.http_port };

        Ok(format!("http://{}:{port}{osc_path}", self.config.host))
    }

    /// The underlying HTTP client, for endpoints outside the command API.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Sends a POST request with an optional JSON body and returns the decoded JSON response.
    pub async fn post(&self, path: &str, body: Option<&Value>) -> OscResult<Value> {
        let url = self.endpoint_url(path, false)?;

        self.post_url(&url, body).await
    }

    async fn post_url(&self, url: &str, body: Option<&Value>) -> OscResult<Value> {
        let mut req = self.http.post(url).timeout(self.request_timeout());

        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await.inspect_err(|e| error!("HTTP error: {e}"))?;

        Self::handle_response(res).await
    }

    /// Runs a command via `commands/execute`.
    pub async fn execute(&self, name: &str, parameters: Value) -> OscResult<Value> {
        debug!("Executing {name}");

        let body = json!({ "name": name, "parameters": parameters });

        self.post(path::EXECUTE, Some(&body)).await
    }

    /// Runs a command via `commands/execute` and returns the response with its body unread.
    ///
    /// The request has no overall timeout, the caller is responsible for bounding the transfer.
    /// A non-200 status is turned into an error before the body is handed out.
    pub async fn execute_stream(&self, name: &str, parameters: Value) -> OscResult<reqwest::Response> {
        let url = self.endpoint_url(path::EXECUTE, false)?;
        let body = json!({ "name": name, "parameters": parameters });

        debug!("Executing {name} (streamed)");

        let res = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| error!("HTTP error: {e}"))?;

        Self::check_status(res).await
    }

    /// Returns the response if its status is 200, otherwise decodes the OSC error body.
    pub(crate) async fn check_status(res: reqwest::Response) -> OscResult<reqwest::Response> {
        if res.status() == reqwest::StatusCode::OK {
            return Ok(res);
        }

        Err(Self::camera_error(res).await)
    }

    /// Decodes the JSON body of a 200 response (`Null` if empty), or the OSC error of any other.
    pub(crate) async fn handle_response(res: reqwest::Response) -> OscResult<Value> {
        let res = Self::check_status(res).await?;

        let body = res.bytes().await?;

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn camera_error(res: reqwest::Response) -> OscError {
        let status = res.status().as_u16();

        let body = res
            .bytes()
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<Value>(&body).ok());

        let error = body.as_ref().and_then(|b| b.get("error"));
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        match body.as_ref().and_then(|b| b.get("name")).and_then(Value::as_str) {
            Some(name) => error!("OSC error in {name} - HTTP status: {status}, code: {code:?}, message: {message:?}"),
            None => error!("OSC error - HTTP status: {status}, code: {code:?}, message: {message:?}"),
        }

        OscError::Camera {
            status,
            code,
            message,
        }
    }

    /// Writes a streamed response body to `file_name` in the output directory.
    /// A partially written file is removed if the transfer fails.
    ///
    /// Returns the path of the written file.
    pub async fn download_to_file(&self, res: reqwest::Response, file_name: &str) -> OscResult<PathBuf> {
        let path = self.config.output_dir.join(file_name);

        info!("Writing {}", path.display());

        let mut file = tokio::fs::File::create(&path).await?;

        let written = async {
            let mut body = res.bytes_stream();

            while let Some(block) = body.try_next().await? {
                file.write_all(&block).await?;
            }

            file.flush().await?;

            Ok::<(), OscError>(())
        }
        .await;

        if let Err(e) = written {
            warn!("Download of {} failed, removing partial file", path.display());
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        Ok(path)
    }

    /// Gets basic information on the camera. This is the only GET call of the API.
    ///
    /// Also caches the supported API list and the HTTP ports reported in `endpoints`.
    pub async fn info(&mut self) -> OscResult<Value> {
        let url = self.endpoint_url(path::INFO, false)?;

        let res = self
            .http
            .get(url)
            .timeout(self.request_timeout())
            .send()
            .await
            .inspect_err(|e| error!("HTTP error: {e}"))?;

        let info = Self::handle_response(res).await?;

        if let Some(api) = info.get("api").and_then(Value::as_array) {
            self.api = Some(api.iter().filter_map(Value::as_str).map(str::to_owned).collect());
        }

        if let Some(endpoints) = info.get("endpoints") {
            let port = |key: &str| {
                endpoints
                    .get(key)
                    .and_then(Value::as_u64)
                    .and_then(|p| u16::try_from(p).ok())
            };

            if let Some(http_port) = port("httpPort") {
                self.http_port = http_port;
            }

            if let Some(updates_port) = port("httpUpdatesPort") {
                self.updates_port = updates_port;
            }
        }

        Ok(info)
    }

    /// Gets the state of the camera and caches its fingerprint.
    ///
    /// Returns the `state` object.
    pub async fn state(&mut self) -> OscResult<Value> {
        let mut res = self.post(path::STATE, None).await?;

        if let Some(fingerprint) = res.get("fingerprint").and_then(Value::as_str) {
            self.fingerprint = Some(fingerprint.to_owned());
        }

        res.get_mut("state")
            .map(Value::take)
            .ok_or(OscError::InvalidResponse("state"))
    }

    /// Returns the status of a previously started command.
    pub async fn status(&self, command_id: &str) -> OscResult<CommandResponse> {
        let res = self.post(path::STATUS, Some(&json!({ "id": command_id }))).await?;

        let status: CommandResponse = serde_json::from_value(res)?;

        debug!("Status of command {command_id}: {:?}", status.state);

        Ok(status)
    }

    /// Checks for state updates using the current fingerprint,
    /// fetching the state first if no fingerprint is known.
    ///
    /// Returns `true` if the fingerprint changed.
    pub async fn check_for_updates(&mut self) -> OscResult<bool> {
        if self.fingerprint.is_none() {
            self.state().await?;
        }

        let url = self.endpoint_url(path::CHECK_FOR_UPDATES, true)?;
        let body = json!({ "stateFingerprint": self.fingerprint });

        let res = self.post_url(&url, Some(&body)).await?;

        let new_fingerprint = res
            .get("stateFingerprint")
            .and_then(Value::as_str)
            .ok_or(OscError::InvalidResponse("stateFingerprint"))?;

        if self.fingerprint.as_deref() == Some(new_fingerprint) {
            debug!("No update, fingerprint: {new_fingerprint}");
            return Ok(false);
        }

        info!("Update - new, old fingerprint: {new_fingerprint}, {:?}", self.fingerprint);
        self.fingerprint = Some(new_fingerprint.to_owned());

        Ok(true)
    }

    /// Polls the command status until it is done, fails or `max_polls` is reached.
    ///
    /// Returns the last status, whose state is `Done` or `InProgress` (if the camera is still busy).
    /// A failed command returns `OscError::CommandFailed`.
    pub async fn wait_for_processing(&self, command_id: &str, max_polls: u32) -> OscResult<CommandResponse> {
        let interval = Duration::from_millis(self.config.status_poll_interval_ms);
        let polls = max_polls.max(1);

        info!("Waiting for processing of command {command_id}");

        let mut poll = 0;

        loop {
            let status = self.status(command_id).await?;

            match status.state {
                CommandState::Done => {
                    info!("Command {command_id} finished");
                    return Ok(status);
                }
                CommandState::Error => {
                    error!("Command {command_id} failed: {:?}", status.error);

                    let (code, message) = status
                        .error
                        .map(|e| (Some(e.code), Some(e.message)))
                        .unwrap_or_default();

                    return Err(OscError::CommandFailed {
                        id: command_id.to_owned(),
                        code,
                        message,
                    });
                }
                CommandState::InProgress => debug!("{poll} - inProgress"),
            }

            poll += 1;

            if poll >= polls {
                warn!("Command {command_id} still in progress after {polls} polls");
                return Ok(status);
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Starts a new session and stores its id, which most commands require.
    pub async fn start_session(&mut self) -> OscResult<String> {
        self.sid = None;

        let res = self.execute(command::START_SESSION, json!({})).await?;

        let sid = res
            .pointer("/results/sessionId")
            .and_then(Value::as_str)
            .ok_or(OscError::InvalidResponse("results.sessionId"))?
            .to_owned();

        info!("Started session {sid}");
        self.sid = Some(sid.clone());

        Ok(sid)
    }

    /// Refreshes the session timeout.
    pub async fn update_session(&mut self) -> OscResult<Value> {
        let sid = self.require_session()?;

        self.execute(command::UPDATE_SESSION, json!({ "sessionId": sid })).await
    }

    /// Closes the session.
    pub async fn close_session(&mut self) -> OscResult<Value> {
        let sid = self.require_session()?;

        let res = self.execute(command::CLOSE_SESSION, json!({ "sessionId": sid })).await?;

        info!("Closed session");
        self.sid = None;

        Ok(res)
    }

    /// Takes a still image. Stitching happens asynchronously,
    /// pass the returned id to `wait_for_processing`.
    pub async fn take_picture(&self) -> OscResult<CommandResponse> {
        let sid = self.require_session()?;

        let res = self.execute(command::TAKE_PICTURE, json!({ "sessionId": sid })).await?;

        Ok(serde_json::from_value(res)?)
    }

    /// Lists still images and videos.
    ///
    /// * `entry_count` - Number of entries to return.
    /// * `max_size` - Maximum thumbnail size, max(width, height).
    /// * `continuation_token` - Token returned by a previous call, to fetch the next entries.
    /// * `include_thumb` - Whether thumbnails are included.
    pub async fn list_images(
        &self,
        entry_count: u32,
        max_size: Option<u32>,
        continuation_token: Option<&str>,
        include_thumb: bool,
    ) -> OscResult<Value> {
        let mut parameters = json!({
            "entryCount": entry_count,
            "includeThumb": include_thumb,
        });

        if let Some(max_size) = max_size {
            parameters["maxSize"] = json!(max_size);
        }

        if let Some(token) = continuation_token {
            parameters["continuationToken"] = json!(token);
        }

        self.execute(command::LIST_IMAGES, parameters).await
    }

    /// Deletes a file from the camera.
    pub async fn delete(&self, file_uri: &str) -> OscResult<Value> {
        self.execute(command::DELETE, json!({ "fileUri": file_uri })).await
    }

    /// Transfers a file from the camera into the output directory.
    /// The local file name is the last segment of the file URI.
    ///
    /// Returns the path of the written file.
    pub async fn get_image(&self, file_uri: &str, image_type: ImageType) -> OscResult<PathBuf> {
        let file_name = file_name_from_uri(file_uri)?;

        let res = self
            .execute_stream(
                command::GET_IMAGE,
                json!({ "fileUri": file_uri, "_type": image_type.as_str() }),
            )
            .await?;

        self.download_to_file(res, file_name).await
    }

    /// Gets the EXIF and XMP metadata of a file.
    pub async fn get_metadata(&self, file_uri: &str) -> OscResult<Value> {
        self.execute(command::GET_METADATA, json!({ "fileUri": file_uri })).await
    }

    /// Sets an option. The option name is checked against `option_names`, the value is not.
    pub async fn set_option(&self, option: &str, value: impl Into<Value>) -> OscResult<Value> {
        let sid = self.require_session()?;

        if !self.option_names().contains(&option) {
            return Err(OscError::UnknownOption(option.to_owned()));
        }

        let value = value.into();

        info!("setOption - {option} : {value}");

        self.execute(
            command::SET_OPTIONS,
            json!({ "sessionId": sid, "options": { option: value } }),
        )
        .await
    }

    /// Gets the value of a single option. The option name is not checked.
    pub async fn get_option(&self, option: &str) -> OscResult<Value> {
        let mut res = self
            .execute(
                command::GET_OPTIONS,
                json!({ "sessionId": self.sid, "optionNames": [option] }),
            )
            .await?;

        res.pointer_mut("/results/options")
            .and_then(|options| options.get_mut(option))
            .map(Value::take)
            .ok_or(OscError::InvalidResponse("results.options"))
    }

    /// Gets the values of all options in `option_names`.
    pub async fn get_all_options(&self) -> OscResult<Value> {
        let mut res = self
            .execute(
                command::GET_OPTIONS,
                json!({ "sessionId": self.sid, "optionNames": self.option_names() }),
            )
            .await?;

        res.pointer_mut("/results/options")
            .map(Value::take)
            .ok_or(OscError::InvalidResponse("results.options"))
    }

    /// Refreshes the cached session id from the camera state.
    pub async fn get_sid(&mut self) -> OscResult<Option<String>> {
        let state = self.state().await?;

        self.sid = state
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(self.sid.clone())
    }

    /// Returns the URI of the last captured image or video from the state.
    pub async fn latest_file_uri(&mut self) -> OscResult<Option<String>> {
        let state = self.state().await?;

        Ok(state
            .get("_latestFileUri")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .map(str::to_owned))
    }

    /// Transfers the latest captured file, if there is one.
    pub async fn get_latest_image(&mut self, image_type: ImageType) -> OscResult<Option<PathBuf>> {
        match self.latest_file_uri().await? {
            Some(uri) => Ok(Some(self.get_image(&uri, image_type).await?)),
            None => Ok(None),
        }
    }

    /// Gets the metadata of the latest captured file, if there is one.
    pub async fn get_latest_image_metadata(&mut self) -> OscResult<Option<Value>> {
        match self.latest_file_uri().await? {
            Some(uri) => Ok(Some(self.get_metadata(&uri).await?)),
            None => Ok(None),
        }
    }
}

/// Returns the local file name for a camera file URI (its last path segment).
///
/// URIs whose last segment is empty, `.` or `..` have no usable file name.
pub fn file_name_from_uri(file_uri: &str) -> OscResult<&str> {
    match file_uri.rsplit('/').next() {
        Some(name) if !matches!(name, "" | "." | "..") => Ok(name),
        _ => {
            error!("No file name in URI {file_uri:?}");
            Err(OscError::InvalidResponse("file name in fileUri"))
        }
    }
}
