/// rodio playback backend
///
/// Each pooled channel gets its own [`Sink`] on a shared output stream.

use std::io::Cursor;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::backend::{AudioBackend, AudioClip, PlaybackSource};
use crate::error::AudioError;

/// Owns the output stream; must stay on the thread that created it
pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
}

impl RodioBackend {
    pub fn new() -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;
        tracing::info!("Audio output stream opened");
        Ok(Self {
            _stream: stream,
            stream_handle,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn create_source(&mut self) -> Box<dyn PlaybackSource> {
        let sink = match Sink::try_new(&self.stream_handle) {
            Ok(sink) => Some(sink),
            Err(e) => {
                // Retried on first play
                tracing::warn!("Failed to create audio sink: {}", e);
                None
            }
        };
        Box::new(RodioSource {
            stream_handle: self.stream_handle.clone(),
            sink,
            clip: None,
            looping: false,
            volume: 1.0,
        })
    }
}

/// Individual playback source backed by a rodio sink
pub struct RodioSource {
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    clip: Option<AudioClip>,
    looping: bool,
    volume: f32,
}

impl RodioSource {
    /// A stopped sink ignores new sources, so playback always starts on a fresh one
    fn fresh_sink(&mut self) -> Result<&Sink, AudioError> {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(Box::new(e)))?;
        Ok(self.sink.insert(sink))
    }
}

impl PlaybackSource for RodioSource {
    fn bind(&mut self, clip: AudioClip) {
        self.clip = Some(clip);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let clip = self.clip.as_ref().ok_or(AudioError::NoClip)?;
        tracing::debug!("Playing audio: {}", clip.path().display());

        // Decoder needs owned data with a 'static lifetime
        let cursor = Cursor::new((**clip.data()).clone());
        let decoder = Decoder::new(cursor).map_err(|e| AudioError::DecodeFailed(Box::new(e)))?;

        let source: Box<dyn Source<Item = i16> + Send> = if self.looping {
            Box::new(decoder.repeat_infinite())
        } else {
            Box::new(decoder)
        };

        let volume = self.volume;
        let sink = self.fresh_sink()?;
        sink.set_volume(volume);
        sink.append(source);
        sink.play();
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map(|sink| !sink.empty() && !sink.is_paused())
            .unwrap_or(false)
    }
}
