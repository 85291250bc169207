use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};

/// Option names defined by the OSC reference, accepted by every camera.
///
/// Reference: <https://developers.google.com/streetview/open-spherical-camera/reference/options>
pub const OSC_OPTIONS: &[&str] = &[
    // Read-only values
    "remainingPictures",
    "remainingSpace",
    "totalSpace",
    // Reference options
    "gpsInfo",
    "dateTimeZone",
    "aperture",
    "apertureSupport",
    "captureMode",
    "captureModeSupport",
    "exposureCompensation",
    "exposureCompensationSupport",
    "exposureProgram",
    "exposureProgramSupport",
    "fileFormat",
    "fileFormatSupport",
    "iso",
    "isoSupport",
    "offDelay",
    "offDelaySupport",
    "shutterSpeed",
    "shutterSpeedSupport",
    "sleepDelay",
    "sleepDelaySupport",
    "whiteBalance",
    "whiteBalanceSupport",
    "exposureDelay",
    "exposureDelaySupport",
    "hdr",
    "hdrSupport",
    "exposureBracket",
    "exposureBracketSupport",
    "gyro",
    "gyroSupport",
    "imageStabilization",
    "imageStabilizationSupport",
    "wifiPassword",
];

/// Ricoh Theta S specific option names.
///
/// Reference: <https://developers.theta360.com/en/docs/v2/api_reference/options/>
pub const RICOH_OPTIONS: &[&str] = &[
    // Custom read-only options
    "_wlanChannel",
    "_remainingVideos",
    // Custom options
    "_captureInterval",
    "_captureIntervalSupport",
    "_captureNumber",
    "_captureNumberSupport",
    "_filter",
    "_filterSupport",
    "_HDMIreso",
    "_HDMIresoSupport",
    "_shutterVolume",
    "_shutterVolumeSupport",
];

/// Known shutter speeds in seconds with their display names, fastest first.
pub const SHUTTER_SPEEDS: &[(f64, &str)] = &[
    (0.00015625, "1/6400"),
    (0.0002, "1/5000"),
    (0.00025, "1/4000"),
    (0.0003125, "1/3200"),
    (0.0004, "1/2500"),
    (0.0005, "1/2000"),
    (0.000625, "1/1600"),
    (0.0008, "1/1250"),
    (0.001, "1/1000"),
    (0.00125, "1/800"),
    (0.0015625, "1/640"),
    (0.002, "1/500"),
    (0.0025, "1/400"),
    (0.003125, "1/320"),
    (0.004, "1/250"),
    (0.005, "1/200"),
    (0.00625, "1/160"),
    (0.008, "1/125"),
    (0.01, "1/100"),
    (0.0125, "1/80"),
    (0.01666666, "1/60"),
    (0.02, "1/50"),
    (0.025, "1/40"),
    (0.03333333, "1/30"),
    (0.04, "1/25"),
    (0.05, "1/20"),
    (0.06666666, "1/15"),
    (0.07692307, "1/13"),
    (0.1, "1/10"),
    (0.125, "1/8"),
    (0.16666666, "1/6"),
    (0.2, "1/5"),
    (0.25, "1/4"),
    (0.33333333, "1/3"),
    (0.4, "1/2.5"),
    (0.5, "1/2"),
    (0.625, "1/1.6"),
    (0.76923076, "1/1.3"),
    (1.0, "1"),
    (1.3, "1.3"),
    (1.6, "1.6"),
    (2.0, "2"),
    (2.5, "2.5"),
    (3.2, "3.2"),
    (4.0, "4"),
    (5.0, "5"),
    (6.0, "6"),
    (8.0, "8"),
    (10.0, "10"),
    (13.0, "13"),
    (15.0, "15"),
    (20.0, "20"),
    (25.0, "25"),
    (30.0, "30"),
    (60.0, "60"),
];

/// Returns the display name of a shutter speed reported by the camera.
///
/// Cameras report repeating fractions with varying precision, so values are matched
/// within a relative tolerance of 0.01%.
pub fn shutter_speed_name(seconds: f64) -> Option<&'static str> {
    SHUTTER_SPEEDS
        .iter()
        .find(|(speed, _)| ((speed - seconds) / speed).abs() < 1e-4)
        .map(|(_, name)| *name)
}

/// Returns the known shutter speed closest to the given duration in seconds.
pub fn nearest_shutter_speed(seconds: f64) -> f64 {
    SHUTTER_SPEEDS
        .iter()
        .map(|(speed, _)| *speed)
        .min_by(|a, b| (a - seconds).abs().total_cmp(&(b - seconds).abs()))
        .unwrap_or(seconds)
}

/// Trait implemented by all setting enums representing a 2D resolution.
pub trait Resolution {
    /// Gets the width.
    fn w(&self) -> u32;

    /// Gets the height.
    fn h(&self) -> u32;
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, int_enum::IntEnum)]
/// Value of the `exposureProgram` option.
pub enum ExposureProgram {
    Manual = 1,
    #[default]
    Automatic = 2,
    ShutterPriority = 4,
    IsoPriority = 9,
}

impl ExposureProgram {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
            Self::ShutterPriority => "shutter priority",
            Self::IsoPriority => "iso priority",
        }
    }
}

impl From<ExposureProgram> for Value {
    fn from(program: ExposureProgram) -> Self {
        Value::from(program as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Value of the `whiteBalance` option. Underscore prefixed values are Ricoh extensions.
pub enum WhiteBalance {
    #[default]
    Auto,
    /// Outdoor
    Daylight,
    Shade,
    CloudyDaylight,
    /// Incandescent light 1
    Incandescent,
    /// Incandescent light 2
    WarmWhiteFluorescent,
    /// Fluorescent light 1 (daylight)
    DayLightFluorescent,
    /// Fluorescent light 2 (natural white)
    DayWhiteFluorescent,
    /// Fluorescent light 3 (white)
    Fluorescent,
    /// Fluorescent light 4 (light bulb color)
    BulbFluorescent,
}

impl WhiteBalance {
    pub const ALL: [WhiteBalance; 10] = [
        Self::Auto,
        Self::Daylight,
        Self::Shade,
        Self::CloudyDaylight,
        Self::Incandescent,
        Self::WarmWhiteFluorescent,
        Self::DayLightFluorescent,
        Self::DayWhiteFluorescent,
        Self::Fluorescent,
        Self::BulbFluorescent,
    ];

    /// The option value sent to the camera.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Daylight => "daylight",
            Self::Shade => "shade",
            Self::CloudyDaylight => "cloudy-daylight",
            Self::Incandescent => "incandescent",
            Self::WarmWhiteFluorescent => "_warmWhiteFluorescent",
            Self::DayLightFluorescent => "_dayLightFluorescent",
            Self::DayWhiteFluorescent => "_dayWhiteFluorescent",
            Self::Fluorescent => "fluorescent",
            Self::BulbFluorescent => "_bulbFluorescent",
        }
    }

    /// The name shown in the camera vendor's app.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Daylight => "Outdoor",
            Self::Shade => "Shade",
            Self::CloudyDaylight => "Cloudy",
            Self::Incandescent => "Incandescent light 1",
            Self::WarmWhiteFluorescent => "Incandescent light 2",
            Self::DayLightFluorescent => "Fluorescent light 1 (daylight)",
            Self::DayWhiteFluorescent => "Fluorescent light 2 (natural white)",
            Self::Fluorescent => "Fluorescent light 3 (white)",
            Self::BulbFluorescent => "Fluorescent light 4 (light bulb color)",
        }
    }
}

impl FromStr for WhiteBalance {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|wb| wb.as_str() == s).ok_or(())
    }
}

impl From<WhiteBalance> for Value {
    fn from(wb: WhiteBalance) -> Self {
        Value::from(wb.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Value of the `captureMode` option.
pub enum CaptureMode {
    #[default]
    Image,
    /// Ricoh video mode.
    Video,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "_video",
        }
    }
}

impl FromStr for CaptureMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "_video" | "video" => Ok(Self::Video),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Payload requested by `camera.getImage`.
pub enum ImageType {
    #[default]
    Image,
    Thumb,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Thumb => "thumb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Payload requested by the Ricoh `camera._getVideo` command.
pub enum VideoType {
    #[default]
    Full,
    Thumb,
}

impl VideoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Thumb => "thumb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Sort order of the Ricoh `camera._listAll` command.
pub enum SortOrder {
    /// `dateTime` descending.
    #[default]
    Newest,
    /// `dateTime` ascending.
    Oldest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// File formats supported by the Ricoh Theta S.
pub enum RicohFileFormat {
    /// 5376 x 2688 JPEG
    Image5k,
    /// 2048 x 1024 JPEG
    Image2k,
    /// 1920 x 1080 MP4
    VideoHd1080,
    /// 1280 x 720 MP4
    VideoHd720,
}

impl Resolution for RicohFileFormat {
    fn w(&self) -> u32 {
        match self {
            Self::Image5k => 5376,
            Self::Image2k => 2048,
            Self::VideoHd1080 => 1920,
            Self::VideoHd720 => 1280,
        }
    }

    fn h(&self) -> u32 {
        match self {
            Self::Image5k => 2688,
            Self::Image2k => 1024,
            Self::VideoHd1080 => 1080,
            Self::VideoHd720 => 720,
        }
    }
}

/// Value of the `fileFormat` option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFormat {
    #[serde(rename = "type")]
    pub file_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl From<RicohFileFormat> for FileFormat {
    fn from(format: RicohFileFormat) -> Self {
        let file_type = match format {
            RicohFileFormat::Image5k | RicohFileFormat::Image2k => "jpeg",
            RicohFileFormat::VideoHd1080 | RicohFileFormat::VideoHd720 => "mp4",
        };

        Self {
            file_type,
            width: format.w(),
            height: format.h(),
        }
    }
}

impl From<RicohFileFormat> for Value {
    fn from(format: RicohFileFormat) -> Self {
        let format = FileFormat::from(format);
        json!({ "type": format.file_type, "width": format.width, "height": format.height })
    }
}

/// Formats a timestamp as the `dateTimeZone` option value (`YYYY:MM:DD HH:MM:SS+HH:MM`).
pub fn date_time_zone<Tz>(date_time: &chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    date_time.format("%Y:%m:%d %H:%M:%S%:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn shutter_speed_lookup_tolerates_precision() {
        assert_eq!(shutter_speed_name(1.0 / 60.0), Some("1/60"));
        assert_eq!(shutter_speed_name(0.00015625), Some("1/6400"));
        assert_eq!(shutter_speed_name(60.0), Some("60"));
        assert_eq!(shutter_speed_name(7.0), None);
    }

    #[test]
    fn nearest_shutter_speed_snaps_to_table() {
        assert_eq!(nearest_shutter_speed(7.2), 8.0);
        assert_eq!(nearest_shutter_speed(0.0), 0.00015625);
        assert_eq!(nearest_shutter_speed(1000.0), 60.0);
    }

    #[test]
    fn exposure_program_codes() {
        assert_eq!(ExposureProgram::try_from(9u8).ok(), Some(ExposureProgram::IsoPriority));
        assert!(ExposureProgram::try_from(3u8).is_err());
        assert_eq!(Value::from(ExposureProgram::ShutterPriority), json!(4));
        assert_eq!(ExposureProgram::Manual.label(), "manual");
    }

    #[test]
    fn white_balance_parses_camera_values() {
        for wb in WhiteBalance::ALL {
            assert_eq!(wb.as_str().parse::<WhiteBalance>(), Ok(wb));
        }
        assert_eq!(
            "_bulbFluorescent".parse::<WhiteBalance>().map(|wb| wb.label()),
            Ok("Fluorescent light 4 (light bulb color)")
        );
        assert!("tungsten".parse::<WhiteBalance>().is_err());
    }

    #[test]
    fn ricoh_file_format_value() {
        assert_eq!(
            Value::from(RicohFileFormat::Image5k),
            json!({ "type": "jpeg", "width": 5376, "height": 2688 })
        );
        assert_eq!(
            serde_json::to_value(FileFormat::from(RicohFileFormat::VideoHd720)).unwrap(),
            json!({ "type": "mp4", "width": 1280, "height": 720 })
        );
    }

    #[test]
    fn date_time_zone_format() {
        let offset = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        let date_time = offset.with_ymd_and_hms(2016, 3, 7, 14, 5, 9).unwrap();

        assert_eq!(date_time_zone(&date_time), "2016:03:07 14:05:09+09:00");
    }
}
