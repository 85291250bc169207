//! An async Rust client for cameras implementing the Open Spherical Camera (OSC) API.
//!
//! The generic OSC commands live on [`client::OscClient`]. Vendor specific commands are
//! provided as extension traits: [`bubl::BublCommands`] for the Bubl camera and
//! [`theta::ThetaCommands`] for the Ricoh Theta S.
//! Both vendors stream their live preview as MJPEG, which is split into JPEG files
//! by the [`stream`] module.
//!
//! OSC reference: <https://developers.google.com/streetview/open-spherical-camera/reference>
//!
//! ## Example
//!
//! ```no_run
//! use osc_cam_rs::{client::OscClient, theta::{self, ThetaCommands}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cam = OscClient::connect(theta::config()).await?;
//!
//!     println!("Camera info: {:#?}", cam.info().await?);
//!
//!     let frames = cam.get_live_preview("livePreview", 3.0).await?;
//!     println!("Saved {frames} preview frames");
//!
//!     cam.close_session().await?;
//!
//!     Ok(())
//! }
//! ```

/// Contains endpoint paths, command names and default values.
pub mod consts;

/// Contains option names and the known option value tables.
pub mod options;

/// Contains the generic OSC client.
pub mod client;

/// Contains the MJPEG live preview frame extractor.
pub mod stream;

/// Bubl camera extensions.
pub mod bubl;

/// Ricoh Theta S extensions.
pub mod theta;

/// Crate-specific error enum.
/// Every function interacting with the camera returns a Result enum with this error type.
#[derive(thiserror::Error, Debug)]
pub enum OscError {
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("Internal I/O error occured")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON")]
    Json(#[from] serde_json::Error),

    #[error("Timeout occured during I/O operation")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Camera returned HTTP status {status} (code: {code:?}, message: {message:?})")]
    Camera {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("Endpoint {path} is not in the camera's supported API list")]
    UnsupportedEndpoint { path: String },

    #[error("No active session, call start_session first")]
    NoSession,

    #[error("Unknown option name: {0}")]
    UnknownOption(String),

    #[error("Invalid response format: missing {0}")]
    InvalidResponse(&'static str),

    #[error("Command {id} failed (code: {code:?}, message: {message:?})")]
    CommandFailed {
        id: String,
        code: Option<String>,
        message: Option<String>,
    },
}

impl OscError {
    /// Returns `true` for errors reported by the camera itself, as opposed to transport failures.
    pub fn is_camera_error(&self) -> bool {
        matches!(self, Self::Camera { .. } | Self::CommandFailed { .. })
    }
}

pub type OscResult<T> = Result<T, OscError>;
