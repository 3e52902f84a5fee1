//! Symphonia decoder backend
//!
//! Each decoder owns a worker thread that probes the file, reports the
//! duration, then decodes packets in real time once started. There is no
//! output device: decoded audio is scaled by the volume, run through the
//! software effects rack and measured, then discarded. Position and level
//! readings come from the worker through atomics.

use aria_core::AudioLocator;
use aria_effects::SoftwareEffects;
use aria_playback::{Decoder, DecoderBackend, DecoderEvents, PlaybackError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder as CodecDecoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, warn};

/// File extensions offered to the decoder when scanning directories
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a", "aac", "opus"];

const CONTROL_CAPACITY: usize = 32;

// ===== Backend =====

/// Opens a [`SymphoniaDecoder`] per local file
#[derive(Debug, Clone, Default)]
pub struct SymphoniaBackend {
    effects: Option<SoftwareEffects>,
    meter: Arc<LevelMeter>,
}

impl SymphoniaBackend {
    /// Backend that runs decoded audio through `effects`, when given
    pub fn new(effects: Option<SoftwareEffects>) -> Self {
        Self {
            effects,
            meter: Arc::new(LevelMeter::default()),
        }
    }

    /// Peak level of the most recent block, shared by every decoder
    pub fn meter(&self) -> Arc<LevelMeter> {
        Arc::clone(&self.meter)
    }
}

impl DecoderBackend for SymphoniaBackend {
    fn open(&self, locator: &AudioLocator, events: DecoderEvents) -> Result<Box<dyn Decoder>> {
        let Some(path) = locator.as_path() else {
            return Err(PlaybackError::Preparation(format!(
                "streaming is not supported: {locator}"
            )));
        };

        Ok(Box::new(SymphoniaDecoder {
            path: path.to_path_buf(),
            events,
            effects: self.effects.clone(),
            meter: Arc::clone(&self.meter),
            shared: Arc::new(Shared::default()),
            control: None,
        }))
    }
}

/// Peak level readout, 0.0 - 1.0
#[derive(Debug, Default)]
pub struct LevelMeter(AtomicU32);

impl LevelMeter {
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, peak: f32) {
        self.0.store(peak.to_bits(), Ordering::Relaxed);
    }
}

// ===== Decoder =====

#[derive(Debug)]
enum Control {
    Play,
    Pause,
    Seek(u64),
    Stop,
}

#[derive(Debug)]
struct Shared {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    volume: AtomicU32,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            volume: AtomicU32::new(1.0_f32.to_bits()),
        }
    }
}

/// Real-time decoder for one local file
pub struct SymphoniaDecoder {
    path: PathBuf,
    events: DecoderEvents,
    effects: Option<SoftwareEffects>,
    meter: Arc<LevelMeter>,
    shared: Arc<Shared>,
    control: Option<Sender<Control>>,
}

impl SymphoniaDecoder {
    fn send(&self, control: Control) -> Result<()> {
        let sender = self
            .control
            .as_ref()
            .ok_or_else(|| PlaybackError::Decoder("decoder is not prepared".to_string()))?;
        sender
            .send(control)
            .map_err(|_| PlaybackError::Decoder("decoder thread stopped".to_string()))
    }
}

impl Decoder for SymphoniaDecoder {
    fn prepare(&mut self) -> Result<()> {
        let (tx, rx) = bounded(CONTROL_CAPACITY);
        let worker = Worker {
            path: self.path.clone(),
            events: self.events.clone(),
            effects: self.effects.clone(),
            meter: Arc::clone(&self.meter),
            shared: Arc::clone(&self.shared),
            control: rx,
        };

        thread::Builder::new()
            .name(format!("aria-decode-{}", self.events.session()))
            .spawn(move || worker.run())
            .map_err(|e| PlaybackError::Preparation(format!("cannot spawn decoder: {e}")))?;

        self.control = Some(tx);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.send(Control::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(Control::Pause)
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.send(Control::Seek(position_ms))?;
        self.shared.position_ms.store(position_ms, Ordering::Relaxed);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.shared.position_ms.load(Ordering::Relaxed)
    }

    fn duration_ms(&self) -> u64 {
        self.shared.duration_ms.load(Ordering::Relaxed)
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    fn stop(&mut self) {
        let _ = self.send(Control::Stop);
    }

    fn release(&mut self) {
        self.stop();
        self.control = None;
    }
}

// ===== Worker thread =====

struct Worker {
    path: PathBuf,
    events: DecoderEvents,
    effects: Option<SoftwareEffects>,
    meter: Arc<LevelMeter>,
    shared: Arc<Shared>,
    control: Receiver<Control>,
}

impl Worker {
    fn run(self) {
        let mut stream = match Stream::open(&self.path) {
            Ok(stream) => stream,
            Err(e) => {
                self.events.error(e);
                return;
            }
        };
        self.shared
            .duration_ms
            .store(stream.duration_ms, Ordering::Relaxed);
        self.events.prepared(stream.duration_ms);

        let mut playing = false;
        let mut pacer = Pacer::new();

        loop {
            let control = if playing {
                match self.control.try_recv() {
                    Ok(control) => Some(control),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => return,
                }
            } else {
                match self.control.recv() {
                    Ok(control) => Some(control),
                    Err(_) => return,
                }
            };

            match control {
                Some(Control::Play) => {
                    playing = true;
                    pacer.reset();
                }
                Some(Control::Pause) => playing = false,
                Some(Control::Seek(position_ms)) => {
                    if let Err(e) = stream.seek(position_ms) {
                        debug!("Seek to {} ms failed: {}", position_ms, e);
                    }
                    self.shared.position_ms.store(position_ms, Ordering::Relaxed);
                    pacer.reset();
                }
                Some(Control::Stop) => return,
                None => {}
            }

            if !playing {
                continue;
            }

            match stream.next_block() {
                Ok(Some(block)) => self.render(block, &mut pacer),
                Ok(None) => {
                    playing = false;
                    self.meter.set(0.0);
                    self.events.completed();
                }
                Err(e) => {
                    warn!("Decoding {} failed: {}", self.path.display(), e);
                    self.events.error(e.to_string());
                    return;
                }
            }
        }
    }

    fn render(&self, mut block: Block, pacer: &mut Pacer) {
        let volume = f32::from_bits(self.shared.volume.load(Ordering::Relaxed));
        for sample in &mut block.samples {
            *sample *= volume;
        }
        if let Some(effects) = &self.effects {
            effects.process(&mut block.samples, block.sample_rate);
        }

        self.meter.set(peak(&block.samples));
        self.shared
            .position_ms
            .store(block.position_ms, Ordering::Relaxed);

        pacer.wait(block.samples.len() / 2, block.sample_rate);
    }
}

/// Sleeps so that rendered audio advances in real time
struct Pacer {
    started: Instant,
    rendered: Duration,
}

impl Pacer {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            rendered: Duration::ZERO,
        }
    }

    fn reset(&mut self) {
        self.started = Instant::now();
        self.rendered = Duration::ZERO;
    }

    fn wait(&mut self, frames: usize, sample_rate: u32) {
        if sample_rate == 0 {
            return;
        }
        self.rendered += Duration::from_secs_f64(frames as f64 / f64::from(sample_rate));
        let target = self.started + self.rendered;
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        }
    }
}

// ===== Stream =====

/// Decoded audio as interleaved stereo
pub struct Block {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub position_ms: u64,
}

/// Demuxer plus codec for the first audio track of a file
pub struct Stream {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn CodecDecoder>,
    track_id: u32,
    time_base: Option<TimeBase>,
    duration_ms: u64,
}

impl Stream {
    /// Open and probe a file
    pub fn open(path: &Path) -> std::result::Result<Self, String> {
        let file =
            File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions {
                    enable_gapless: true,
                    ..Default::default()
                },
                &MetadataOptions::default(),
            )
            .map_err(|e| format!("cannot probe {}: {e}", path.display()))?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| format!("no audio track in {}", path.display()))?;
        let params = track.codec_params.clone();
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| format!("unsupported codec in {}: {e}", path.display()))?;

        let duration_ms = match (params.time_base, params.n_frames) {
            (Some(time_base), Some(frames)) => time_to_ms(time_base.calc_time(frames)),
            (None, Some(frames)) => params
                .sample_rate
                .filter(|rate| *rate > 0)
                .map_or(0, |rate| frames * 1000 / u64::from(rate)),
            _ => 0,
        };

        Ok(Self {
            format,
            decoder,
            track_id,
            time_base: params.time_base,
            duration_ms,
        })
    }

    /// Track duration, 0 when the container does not say
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Jump to a position
    pub fn seek(&mut self, position_ms: u64) -> std::result::Result<(), SymphoniaError> {
        let time = Time::new(
            position_ms / 1000,
            (position_ms % 1000) as f64 / 1000.0,
        );
        self.format.seek(
            SeekMode::Coarse,
            SeekTo::Time {
                time,
                track_id: Some(self.track_id),
            },
        )?;
        self.decoder.reset();
        Ok(())
    }

    /// Decode the next block, `None` at the end of the stream
    pub fn next_block(&mut self) -> std::result::Result<Option<Block>, SymphoniaError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let position_ms = self
                .time_base
                .map_or(0, |time_base| time_to_ms(time_base.calc_time(packet.ts())));

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    return Ok(Some(Block {
                        samples: to_stereo(buffer.samples(), spec.channels.count()),
                        sample_rate: spec.rate,
                        position_ms,
                    }));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn time_to_ms(time: Time) -> u64 {
    time.seconds * 1000 + (time.frac * 1000.0) as u64
}

/// Interleaved samples with any channel count to interleaved stereo
///
/// Mono is duplicated; channels past the first two are dropped.
pub fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .fold(0.0_f32, |peak, sample| peak.max(sample.abs()))
        .min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// 16-bit PCM mono WAV of a constant level
    fn write_wav(sample_rate: u32, frames: u32, level: i16) -> tempfile::NamedTempFile {
        let data_len = frames * 2;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for _ in 0..frames {
            bytes.extend_from_slice(&level.to_le_bytes());
        }

        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn stereo_conversion() {
        assert_eq!(to_stereo(&[0.1, 0.2], 1), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(to_stereo(&[0.1, 0.2], 2), vec![0.1, 0.2]);
        assert_eq!(to_stereo(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3), vec![0.1, 0.2, 0.4, 0.5]);
        assert!(to_stereo(&[0.1], 0).is_empty());
    }

    #[test]
    fn peak_is_clamped() {
        assert_eq!(peak(&[]), 0.0);
        assert_eq!(peak(&[0.2, -0.5, 0.1]), 0.5);
        assert_eq!(peak(&[3.0]), 1.0);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let result = Stream::open(Path::new("/nonexistent/track.flac"));
        assert!(result.is_err());
    }

    #[test]
    fn probes_wav_duration() {
        let file = write_wav(8_000, 8_000, 1_000);
        let stream = Stream::open(file.path()).unwrap();
        assert_eq!(stream.duration_ms(), 1_000);
    }

    #[test]
    fn decodes_wav_to_the_end() {
        let file = write_wav(8_000, 4_000, 16_384);
        let mut stream = Stream::open(file.path()).unwrap();

        let mut frames = 0;
        while let Some(block) = stream.next_block().unwrap() {
            assert_eq!(block.sample_rate, 8_000);
            assert_eq!(block.samples.len() % 2, 0);
            assert!((peak(&block.samples) - 0.5).abs() < 0.01);
            frames += block.samples.len() / 2;
        }
        assert_eq!(frames, 4_000);
    }

    #[test]
    fn seek_rewinds() {
        let file = write_wav(8_000, 8_000, 1_000);
        let mut stream = Stream::open(file.path()).unwrap();
        while stream.next_block().unwrap().is_some() {}

        stream.seek(0).unwrap();
        let block = stream.next_block().unwrap().unwrap();
        assert_eq!(block.position_ms, 0);
    }
}
