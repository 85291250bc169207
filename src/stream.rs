use std::{future::Future, path::PathBuf, time::Duration};

use bytes::{Buf as _, Bytes, BytesMut};
use futures::{Stream, StreamExt as _, TryStreamExt as _};
use log::*;
use serde::Deserialize;
use serde_json::json;

use crate::{
    OscError, OscResult,
    client::OscClient,
    consts::{self, JPEG_EOI, JPEG_SOI},
};

/// Settings of one live preview capture.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Frames are written as `<prefix>.<index:04>.jpg`.
    #[serde(default = "default_file_name_prefix")]
    pub file_name_prefix: String,
    /// Capture duration in seconds, measured from the start of the stream.
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Upper bound for bytes buffered without a complete frame.
    #[serde(default = "default_max_buffered_bytes")]
    pub max_buffered_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            file_name_prefix: default_file_name_prefix(),
            time_limit_secs: default_time_limit_secs(),
            output_dir: default_output_dir(),
            max_buffered_bytes: default_max_buffered_bytes(),
        }
    }
}

impl StreamConfig {
    /// Negative limits and NaN are treated as zero, limits too large for a `Duration` as unbounded.
    pub fn time_limit(&self) -> Duration {
        let secs = self.time_limit_secs;

        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

fn default_file_name_prefix() -> String {
    consts::DEFAULT_PREVIEW_PREFIX.into()
}
fn default_time_limit_secs() -> f64 {
    consts::DEFAULT_PREVIEW_TIME_LIMIT.as_secs_f64()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_max_buffered_bytes() -> usize {
    consts::DEFAULT_MAX_BUFFERED_BYTES
}

/// A JPEG image cut out of the stream, from its SOI marker to its EOI marker inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Zero-based position in the stream.
    pub index: u32,
    pub data: Bytes,
}

impl Frame {
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{prefix}.{:04}.jpg", self.index)
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|window| window == marker)
}

/// Unconsumed stream bytes.
///
/// Bytes are appended as chunks arrive and removed from the front once they
/// belong to an extracted frame or are known garbage. A marker split across two
/// chunks is therefore found as soon as its second byte is appended.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    bytes: BytesMut,
    /// Offset from which the next EOI search starts; everything before it has been scanned.
    eoi_scan_from: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bytes: BytesMut::with_capacity(consts::DEFAULT_CHUNK_SIZE * 4),
            eoi_scan_from: 0,
        }
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Removes the first `n` bytes (or everything, if fewer are buffered).
    pub fn drop_prefix(&mut self, n: usize) {
        self.bytes.advance(n.min(self.bytes.len()));
        self.eoi_scan_from = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Removes and returns the next complete frame.
    ///
    /// An EOI marker without a preceding SOI marker is dropped together with
    /// everything before it, and the search continues behind it.
    pub fn take_frame(&mut self) -> Option<Bytes> {
        loop {
            let from = self.eoi_scan_from;

            let Some(end) = find_marker(&self.bytes[from..], JPEG_EOI).map(|pos| from + pos) else {
                // The last byte may be the first half of a marker.
                self.eoi_scan_from = self.bytes.len().saturating_sub(1);
                return None;
            };

            match find_marker(&self.bytes[..end], JPEG_SOI) {
                Some(start) => {
                    let mut frame = self.bytes.split_to(end + JPEG_EOI.len());
                    frame.advance(start);
                    self.eoi_scan_from = 0;

                    return Some(frame.freeze());
                }
                None => {
                    debug!("Discarding {} bytes up to an end marker without start marker", end + 2);
                    self.drop_prefix(end + JPEG_EOI.len());
                }
            }
        }
    }
}

/// Splits an MJPEG byte stream into JPEG frames.
///
/// Frames are delimited only by the JPEG SOI (`FF D8`) and EOI (`FF D9`) markers,
/// the data in between is passed through unchanged.
#[derive(Debug)]
pub struct FrameExtractor {
    buffer: FrameBuffer,
    next_index: u32,
    max_buffered_bytes: usize,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(consts::DEFAULT_MAX_BUFFERED_BYTES)
    }
}

impl FrameExtractor {
    /// * `max_buffered_bytes` - If more bytes are buffered without a complete frame,
    ///   all but the last one are dropped.
    pub fn new(max_buffered_bytes: usize) -> Self {
        Self {
            buffer: FrameBuffer::new(),
            next_index: 0,
            max_buffered_bytes,
        }
    }

    /// Number of frames emitted so far.
    pub fn frame_count(&self) -> u32 {
        self.next_index
    }

    /// Bytes received but not yet part of an emitted frame.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Appends a chunk and returns every frame completed by it, in stream order.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.append(chunk);

        let mut frames: Vec<Frame> = Vec::new();

        while let Some(data) = self.buffer.take_frame() {
            frames.push(Frame {
                index: self.next_index,
                data,
            });
            self.next_index += 1;
        }

        if self.buffer.len() > self.max_buffered_bytes {
            warn!(
                "No complete frame in {} buffered bytes (max: {}), dropping them",
                self.buffer.len(),
                self.max_buffered_bytes
            );
            self.buffer.drop_prefix(self.buffer.len() - 1);
        }

        frames
    }

    /// Feeds chunks from `chunks` to the extractor and hands every frame to `sink`
    /// until the stream ends or `time_limit` has elapsed.
    ///
    /// The time limit is checked after each chunk, and waiting for a chunk is bounded by
    /// the remaining time, so a stalled stream ends the capture once the limit is reached.
    /// A chunk that has been received is always processed completely. With a zero limit,
    /// only a chunk that is ready on the first poll is processed.
    ///
    /// Fails only if the stream fails before delivering its first chunk or if the sink fails.
    /// A stream failing later ends the capture like the end of the stream.
    ///
    /// Returns the number of frames emitted.
    pub async fn run<S, K>(&mut self, chunks: S, sink: &mut K, time_limit: Duration) -> OscResult<u32>
    where
        S: Stream<Item = OscResult<Bytes>>,
        K: FrameSink,
    {
        let mut chunks = std::pin::pin!(chunks);
        let start = tokio::time::Instant::now();
        let mut received_any = false;

        loop {
            let remaining = time_limit.saturating_sub(start.elapsed());

            let Ok(next) = tokio::time::timeout(remaining, chunks.next()).await else {
                debug!("Time limit reached while waiting for the next chunk");
                break;
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) if !received_any => return Err(e),
                Some(Err(e)) => {
                    warn!("Stream failed after {} frames: {e}", self.frame_count());
                    break;
                }
                None => {
                    debug!("Stream ended");
                    break;
                }
            };

            received_any = true;

            for frame in self.process_chunk(&chunk) {
                sink.write_frame(&frame).await?;
            }

            if start.elapsed() > time_limit {
                debug!("Time limit reached after {:?}", start.elapsed());
                break;
            }
        }

        Ok(self.frame_count())
    }
}

/// Destination of extracted frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> impl Future<Output = OscResult<()>> + Send;
}

/// Writes every frame into its own file, `<prefix>.<index:04>.jpg`.
#[derive(Debug, Clone)]
pub struct JpegFileSink {
    pub dir: PathBuf,
    pub prefix: String,
}

impl JpegFileSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path_of(&self, frame: &Frame) -> PathBuf {
        self.dir.join(frame.file_name(&self.prefix))
    }
}

impl FrameSink for JpegFileSink {
    async fn write_frame(&mut self, frame: &Frame) -> OscResult<()> {
        let path = self.path_of(frame);

        trace!("Writing frame {:04} ({} bytes) to {}", frame.index, frame.data.len(), path.display());

        // A frame only appears under its final name once it is complete.
        let partial = path.with_extension("jpg.part");

        let written = async {
            tokio::fs::write(&partial, &frame.data).await?;
            tokio::fs::rename(&partial, &path).await
        }
        .await;

        if let Err(e) = written {
            warn!("Writing {} failed: {e}", path.display());
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        Ok(())
    }
}

/// Collects frames in memory.
impl FrameSink for Vec<Frame> {
    async fn write_frame(&mut self, frame: &Frame) -> OscResult<()> {
        self.push(frame.clone());

        Ok(())
    }
}

/// Splits `chunks` into JPEG files as configured by `config`.
///
/// Returns the number of frames written.
pub async fn run<S>(chunks: S, config: &StreamConfig) -> OscResult<u32>
where
    S: Stream<Item = OscResult<Bytes>>,
{
    let mut sink = JpegFileSink::new(&config.output_dir, &config.file_name_prefix);

    FrameExtractor::new(config.max_buffered_bytes)
        .run(chunks, &mut sink, config.time_limit())
        .await
}

/// Opens a live preview stream with the given vendor command and writes its frames to disk.
///
/// The time limit counts from the request, so a camera that never answers fails
/// with `OscError::Timeout` once it is reached.
/// The connection is closed when the capture ends, whatever the reason.
///
/// * `command` - The vendor streaming command, e.g. `camera._getLivePreview`.
///
/// Returns the number of frames written.
pub async fn stream_live_preview(client: &OscClient, command: &str, config: &StreamConfig) -> OscResult<u32> {
    let sid = client.require_session()?;
    let time_limit = config.time_limit();
    let start = tokio::time::Instant::now();

    let res = tokio::time::timeout(time_limit, client.execute_stream(command, json!({ "sessionId": sid })))
        .await
        .inspect_err(|_| error!("No response to {command} within {time_limit:?}"))??;

    let remaining = time_limit.saturating_sub(start.elapsed());

    info!("Live preview started ({command}), capturing for {remaining:?}");

    let chunks = res.bytes_stream().map_err(OscError::from);
    let mut sink = JpegFileSink::new(&config.output_dir, &config.file_name_prefix);

    let frames = FrameExtractor::new(config.max_buffered_bytes)
        .run(chunks, &mut sink, remaining)
        .await?;

    info!("Live preview stopped, {frames} frames written");

    Ok(frames)
}

/// Live preview settings for `prefix` and `time_limit_secs`, writing into the client's output directory.
pub(crate) fn preview_config(client: &OscClient, prefix: &str, time_limit_secs: f64) -> StreamConfig {
    StreamConfig {
        file_name_prefix: prefix.to_owned(),
        time_limit_secs,
        output_dir: client.config().output_dir.clone(),
        ..StreamConfig::default()
    }
}
