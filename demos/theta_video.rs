use std::time::Duration;

use osc_cam_rs::{
    client::OscClient,
    options::{CaptureMode, VideoType},
    theta::{self, ThetaCommands},
};
use tokio::time::sleep;

#[tokio::main]
/// This example records a short video on a Theta S and downloads it.
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cam = OscClient::connect(theta::config()).await?;

    cam.set_capture_mode(CaptureMode::Video).await?;

    cam.start_capture().await?;

    println!("Recording...");

    sleep(Duration::from_secs(5)).await;

    cam.stop_capture().await?;

    // The file is only listed once the camera has finished writing it.
    sleep(Duration::from_secs(2)).await;

    match cam.get_latest_video(VideoType::Full).await? {
        Some(path) => println!("Saved {}", path.display()),
        None => println!("No video on the camera"),
    }

    cam.set_capture_mode(CaptureMode::Image).await?;
    cam.close_session().await?;

    Ok(())
}
