use osc_cam_rs::{
    client::{CommandState, OscClient},
    consts::DEFAULT_MAX_STATUS_POLLS,
    options::{ExposureProgram, ImageType},
    theta,
};

#[tokio::main]
/// This example takes a photo and saves it, along with its thumbnail, in the current directory.
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cam = OscClient::connect(theta::config()).await?;

    println!("Connected to {}", cam.info().await?["model"]);

    cam.set_option("exposureProgram", ExposureProgram::Automatic).await?;

    let res = cam.take_picture().await?;

    let res = match (res.state, res.id.clone()) {
        (CommandState::InProgress, Some(id)) => cam.wait_for_processing(&id, DEFAULT_MAX_STATUS_POLLS).await?,
        _ => res,
    };

    if res.state != CommandState::Done {
        println!("The camera is still processing the picture, try again later");
        return Ok(());
    }

    let Some(uri) = res
        .results
        .as_ref()
        .and_then(|r| r["fileUri"].as_str())
        .map(str::to_owned)
    else {
        println!("No file URI in the response :(");
        return Ok(());
    };

    println!("Received an image! Saving it...");

    let image = cam.get_image(&uri, ImageType::Image).await?;
    println!("Saved {}", image.display());

    println!("Saving the thumbnail");
    cam.get_image(&uri, ImageType::Thumb).await?;

    cam.close_session().await?;

    Ok(())
}
