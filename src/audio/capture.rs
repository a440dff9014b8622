use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::fft::SpectrumAnalyzer;
use super::{SpectrumSource, WindowFunction};

/// Frames read from the device per iteration of the capture loop.
pub const CHUNK_FRAMES: usize = 512;

/// Newest frames per channel published to readers.
/// Covers the largest supported FFT (8192 bins -> 16384 samples).
pub const SNAPSHOT_FRAMES: usize = 16384;

/// Latest audio published by a capture thread.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Frame offset of the next write inside the record ring
    pub write_position: usize,
    /// Newest samples of each channel, oldest first
    pub channels: Vec<Vec<f32>>,
}

/// Fixed-length per-channel record ring, fed with interleaved frames.
pub struct SampleRing {
    channels: Vec<Vec<f32>>,
    capacity: usize,
    position: usize,
    wrapped: bool,
    looping: bool,
}

impl SampleRing {
    pub fn new(channels: usize, capacity: usize, looping: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: vec![vec![0.0; capacity]; channels.max(1)],
            capacity,
            position: 0,
            wrapped: false,
            looping,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Append interleaved frames. Returns `false` once a non-looping ring is
    /// full; frames past that point are discarded.
    pub fn push_interleaved(&mut self, chunk: &[f32]) -> bool {
        let channel_count = self.channels.len();
        for frame in chunk.chunks_exact(channel_count) {
            if self.wrapped && !self.looping {
                return false;
            }
            for (channel, &sample) in self.channels.iter_mut().zip(frame) {
                channel[self.position] = sample;
            }
            self.position += 1;
            if self.position == self.capacity {
                self.position = 0;
                self.wrapped = true;
            }
        }
        self.looping || !self.wrapped
    }

    /// Copy the newest `out.len()` samples of `channel` into `out`, oldest
    /// first. Slots never recorded read as zero.
    pub fn copy_latest(&self, channel: usize, out: &mut [f32]) {
        let recorded = if self.wrapped { self.capacity } else { self.position };
        let take = out.len().min(recorded);
        let pad = out.len() - take;
        out[..pad].fill(0.0);

        let data = &self.channels[channel];
        let start = (self.position + self.capacity - take) % self.capacity;
        for (i, slot) in out[pad..].iter_mut().enumerate() {
            *slot = data[(start + i) % self.capacity];
        }
    }

    pub fn snapshot(&self, frames: usize) -> Recording {
        let frames = frames.min(self.capacity);
        let channels = (0..self.channels.len())
            .map(|channel| {
                let mut samples = vec![0.0; frames];
                self.copy_latest(channel, &mut samples);
                samples
            })
            .collect();
        Recording {
            write_position: self.position,
            channels,
        }
    }
}

/// Background thread pulling interleaved frames from a device into a ring.
pub struct CaptureThread {
    // Keep the thread handle to ensure it stays alive
    _thread: thread::JoinHandle<()>,
    stop_flag: Arc<AtomicBool>,
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

impl CaptureThread {
    /// Spawn the capture loop. `read` fills a whole chunk of interleaved
    /// frames, blocking as long as the device needs.
    pub fn spawn<R>(
        name: &str,
        mut read: R,
        mut ring: SampleRing,
        sender: watch::Sender<Arc<Recording>>,
    ) -> Result<Self>
    where
        R: FnMut(&mut [f32]) -> Result<()> + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_flag_clone = stop_flag.clone();
        let mut chunk = vec![0.0f32; CHUNK_FRAMES * ring.channel_count()];

        let thread = thread::Builder::new()
            .name(format!("capture-{}", name))
            .spawn(move || loop {
                if stop_flag_clone.load(Ordering::Relaxed) {
                    debug!("Stop flag set, ending capture loop");
                    break;
                }

                if let Err(e) = read(&mut chunk) {
                    warn!("Audio read error: {:#}", e);
                    thread::sleep(Duration::from_millis(10));
                    continue;
                }

                let recording = ring.push_interleaved(&chunk);
                let snapshot = ring.snapshot(SNAPSHOT_FRAMES);

                // Ignore errors if receiver is dropped
                if sender.send(Arc::new(snapshot)).is_err() {
                    debug!("Recording receiver dropped, stopping capture");
                    break;
                }

                if !recording {
                    info!(
                        "Record buffer full at frame {}, stopping non-looping capture",
                        ring.position()
                    );
                    break;
                }
            })?;

        Ok(Self {
            _thread: thread,
            stop_flag,
        })
    }
}

/// Spectrum source backed by a capture thread's published recordings.
pub struct RecordingSource {
    receiver: watch::Receiver<Arc<Recording>>,
    analyzer: SpectrumAnalyzer,
    channels: usize,
    _capture: CaptureThread,
}

impl RecordingSource {
    /// Start capturing with `read` into a ring of `capacity` frames.
    pub fn start<R>(
        name: &str,
        channels: usize,
        capacity: usize,
        looping: bool,
        read: R,
    ) -> Result<Self>
    where
        R: FnMut(&mut [f32]) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Arc::new(Recording::default()));
        let ring = SampleRing::new(channels, capacity, looping);
        let capture = CaptureThread::spawn(name, read, ring, tx)?;
        Ok(Self {
            receiver: rx,
            analyzer: SpectrumAnalyzer::new(),
            channels,
            _capture: capture,
        })
    }
}

impl SpectrumSource for RecordingSource {
    fn channels(&self) -> usize {
        self.channels
    }

    fn write_position(&self) -> usize {
        self.receiver.borrow().write_position
    }

    fn spectrum(&mut self, channel: usize, window: WindowFunction, out: &mut [f32]) {
        let recording = Arc::clone(&self.receiver.borrow());
        match recording
            .channels
            .get(channel)
            .or_else(|| recording.channels.last())
        {
            Some(samples) => self.analyzer.magnitudes(samples, window, out),
            None => out.fill(0.0),
        }
    }
}
