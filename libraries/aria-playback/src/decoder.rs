//! Decoder boundary
//!
//! Platform-specific audio output is provided through these traits. A
//! [`DecoderBackend`] opens one [`Decoder`] per track; the decoder reports
//! asynchronous progress (ready, finished, failed) through the
//! [`DecoderEvents`] it was opened with.
//!
//! Every `DecoderEvents` carries the session it was created for. Once the
//! engine moves on to another decoder, anything reported through an older
//! session is discarded.

use crate::engine::Inbound;
use crate::error::Result;
use aria_core::AudioLocator;
use aria_effects::SessionId;
use tokio::sync::mpsc;

/// Something a decoder reports after the call that triggered it returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEvent {
    /// Preparation finished; the decoder can start
    Prepared {
        /// Track duration, 0 when unknown
        duration_ms: u64,
    },
    /// Playback reached the end of the track
    Completed,
    /// Asynchronous failure
    Error {
        /// Error message
        message: String,
    },
}

/// Session-tagged channel back into the engine
///
/// Cheap to clone; safe to use from any thread. Sends after the engine has
/// shut down are dropped.
#[derive(Debug, Clone)]
pub struct DecoderEvents {
    session: SessionId,
    tx: mpsc::WeakUnboundedSender<Inbound>,
}

impl DecoderEvents {
    pub(crate) fn new(session: SessionId, tx: mpsc::WeakUnboundedSender<Inbound>) -> Self {
        Self { session, tx }
    }

    /// Session these events belong to
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Report that preparation finished
    pub fn prepared(&self, duration_ms: u64) {
        self.send(DecoderEvent::Prepared { duration_ms });
    }

    /// Report that playback reached the end
    pub fn completed(&self) {
        self.send(DecoderEvent::Completed);
    }

    /// Report an asynchronous failure
    pub fn error(&self, message: impl Into<String>) {
        self.send(DecoderEvent::Error {
            message: message.into(),
        });
    }

    fn send(&self, event: DecoderEvent) {
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let _ = tx.send(Inbound::Decoder {
            session: self.session,
            event,
        });
    }
}

/// One decoder instance, bound to one track
///
/// Methods are called from the engine task only and must not block for
/// long; slow work (opening files, probing streams) belongs on a separate
/// thread that reports back through [`DecoderEvents`].
pub trait Decoder: Send {
    /// Begin asynchronous preparation; completion arrives as
    /// [`DecoderEvents::prepared`] or [`DecoderEvents::error`]
    fn prepare(&mut self) -> Result<()>;

    /// Start or resume output
    fn start(&mut self) -> Result<()>;

    /// Pause output
    fn pause(&mut self) -> Result<()>;

    /// Jump to a position
    fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    /// Current position
    fn position_ms(&self) -> u64;

    /// Track duration, 0 when unknown
    fn duration_ms(&self) -> u64;

    /// Set output volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Stop output; must tolerate repeated calls
    fn stop(&mut self);

    /// Free resources; must tolerate repeated calls
    fn release(&mut self);
}

/// Opens decoders for tracks
pub trait DecoderBackend: Send + Sync {
    /// Open a decoder for `locator`
    ///
    /// Must not start preparation; the engine calls [`Decoder::prepare`]
    /// once the decoder is installed.
    fn open(&self, locator: &AudioLocator, events: DecoderEvents) -> Result<Box<dyn Decoder>>;
}
