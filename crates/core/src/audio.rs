//! Audio frame types
//!
//! Frames are transient: never persisted, consumed exactly once by the codec
//! or forwarding step that receives them.

/// Sample encoding of an audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 8-bit G.711 µ-law companded PCM at 8 kHz, one byte per sample.
    G711Ulaw,
    /// 16-bit little-endian linear PCM, two bytes per sample.
    Pcm16,
}

impl AudioEncoding {
    /// Bytes per sample in this encoding.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            AudioEncoding::G711Ulaw => 1,
            AudioEncoding::Pcm16 => 2,
        }
    }
}

/// Which peer produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChannel {
    /// The telephony media stream.
    Telephony,
    /// The speech-AI engine.
    Engine,
}

/// An immutable audio payload tagged with its encoding and origin.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw payload bytes in `encoding`.
    pub bytes: Vec<u8>,
    /// Sample encoding of `bytes`.
    pub encoding: AudioEncoding,
    /// Peer that produced the frame.
    pub source: SourceChannel,
}

impl AudioFrame {
    /// Create a frame from raw payload bytes.
    pub fn new(bytes: Vec<u8>, encoding: AudioEncoding, source: SourceChannel) -> Self {
        Self {
            bytes,
            encoding,
            source,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of samples represented by the payload.
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / self.encoding.bytes_per_sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_per_encoding() {
        let ulaw = AudioFrame::new(vec![0u8; 160], AudioEncoding::G711Ulaw, SourceChannel::Telephony);
        assert_eq!(ulaw.sample_count(), 160);

        let pcm = AudioFrame::new(vec![0u8; 320], AudioEncoding::Pcm16, SourceChannel::Engine);
        assert_eq!(pcm.sample_count(), 160);
    }
}
