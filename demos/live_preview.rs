use osc_cam_rs::{
    client::OscClient,
    consts::DEFAULT_PREVIEW_PREFIX,
    options::CaptureMode,
    theta::{self, ThetaCommands},
};

#[tokio::main]
/// This example saves a few seconds of the Theta S live preview as JPG images,
/// then decodes the first frame to print its resolution.
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cam = OscClient::connect(theta::config()).await?;

    cam.set_capture_mode(CaptureMode::Image).await?;

    let frames = cam.get_live_preview(DEFAULT_PREVIEW_PREFIX, 3.0).await?;

    println!("Received {frames} frames!");

    if frames > 0 {
        let first = cam
            .config()
            .output_dir
            .join(format!("{DEFAULT_PREVIEW_PREFIX}.0000.jpg"));

        let img = image::open(&first)?;

        println!("First frame is {}x{}", img.width(), img.height());
    }

    cam.close_session().await?;

    Ok(())
}
