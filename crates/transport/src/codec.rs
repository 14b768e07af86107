//! Audio codec support
//!
//! G.711 µ-law companding between the telephony wire format (8-bit, 8 kHz)
//! and 16-bit linear PCM. Every call is a pure, stateless transform: N 16-bit
//! samples map to exactly N wire bytes and back. Companding is lossy in
//! amplitude but lossless in sample count.

use callbridge_core::{AudioEncoding, AudioFrame, CodecError};

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;

/// Compand one 16-bit linear sample to a µ-law byte.
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut pcm = sample as i32;
    let sign: u8 = if pcm < 0 {
        pcm = -pcm;
        0x80
    } else {
        0x00
    };
    if pcm > CLIP {
        pcm = CLIP;
    }
    pcm += BIAS;

    // Segment index: position of the highest set bit above the mantissa.
    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while exponent > 0 && (pcm & mask) == 0 {
        exponent -= 1;
        mask >>= 1;
    }
    let mantissa = ((pcm >> (exponent + 3)) & 0x0F) as u8;

    !(sign | (exponent << 4) | mantissa)
}

/// Expand one µ-law byte to a 16-bit linear sample.
pub fn ulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = (byte & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;
    if sign != 0 {
        -(magnitude as i16)
    } else {
        magnitude as i16
    }
}

/// Encode 16-bit little-endian PCM bytes into µ-law wire bytes.
///
/// Fails on an empty buffer or a byte count that does not divide into whole
/// 16-bit samples.
pub fn encode(pcm: &[u8]) -> Result<Vec<u8>, CodecError> {
    if pcm.is_empty() {
        return Err(CodecError::Empty);
    }
    if pcm.len() % 2 != 0 {
        return Err(CodecError::OddLength(pcm.len()));
    }
    Ok(pcm
        .chunks_exact(2)
        .map(|c| linear_to_ulaw(i16::from_le_bytes([c[0], c[1]])))
        .collect())
}

/// Decode µ-law wire bytes into 16-bit little-endian PCM bytes.
pub fn decode(wire: &[u8]) -> Result<Vec<u8>, CodecError> {
    if wire.is_empty() {
        return Err(CodecError::Empty);
    }
    let mut pcm = Vec::with_capacity(wire.len() * 2);
    for &b in wire {
        pcm.extend_from_slice(&ulaw_to_linear(b).to_le_bytes());
    }
    Ok(pcm)
}

/// Re-encode a frame into the target encoding.
///
/// When source and target encodings match (the case for this deployment,
/// where both peers speak µ-law) the payload passes through untouched.
pub fn transcode(frame: AudioFrame, target: AudioEncoding) -> Result<AudioFrame, CodecError> {
    if frame.encoding == target {
        return Ok(frame);
    }
    let bytes = match (frame.encoding, target) {
        (AudioEncoding::Pcm16, AudioEncoding::G711Ulaw) => encode(&frame.bytes)?,
        (AudioEncoding::G711Ulaw, AudioEncoding::Pcm16) => decode(&frame.bytes)?,
        _ => frame.bytes.clone(),
    };
    Ok(AudioFrame::new(bytes, target, frame.source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbridge_core::SourceChannel;

    #[test]
    fn test_silence_round_trips_exactly() {
        assert_eq!(linear_to_ulaw(0), 0xFF);
        assert_eq!(ulaw_to_linear(0xFF), 0);
    }

    #[test]
    fn test_sample_count_preserved() {
        // 160 samples = one 20ms telephony frame at 8 kHz
        let pcm: Vec<u8> = (0..160i16)
            .flat_map(|i| (i * 97).to_le_bytes())
            .collect();
        let wire = encode(&pcm).unwrap();
        assert_eq!(wire.len(), 160);

        let back = decode(&wire).unwrap();
        assert_eq!(back.len(), pcm.len());
    }

    #[test]
    fn test_companding_is_inverse_up_to_quantization() {
        for &sample in &[0i16, 1, -1, 100, -100, 8000, -8000, 32000, -32000, i16::MAX, i16::MIN] {
            let round = ulaw_to_linear(linear_to_ulaw(sample));
            // µ-law quantization error grows with amplitude but stays within
            // one segment step
            let err = (round as i32 - sample as i32).abs();
            let bound = (sample as i32).abs() / 16 + 36;
            assert!(err <= bound, "sample {sample} decoded to {round} (err {err})");
        }
    }

    #[test]
    fn test_double_companding_is_stable() {
        // Encoding a decoded byte must give the byte back: the codec adds no
        // drift when frames are re-encoded. Negative zero (0x7F) is the one
        // code that canonicalizes, to positive zero.
        for byte in 0u8..=255 {
            let linear = ulaw_to_linear(byte);
            let expected = if byte == 0x7F { 0xFF } else { byte };
            assert_eq!(linear_to_ulaw(linear), expected);
        }
    }

    #[test]
    fn test_empty_buffer_rejected() {
        assert_eq!(encode(&[]), Err(CodecError::Empty));
        assert_eq!(decode(&[]), Err(CodecError::Empty));
    }

    #[test]
    fn test_odd_pcm_length_rejected() {
        assert_eq!(encode(&[0u8; 3]), Err(CodecError::OddLength(3)));
    }

    #[test]
    fn test_transcode_passthrough_same_encoding() {
        let frame = AudioFrame::new(vec![1, 2, 3], AudioEncoding::G711Ulaw, SourceChannel::Telephony);
        let out = transcode(frame, AudioEncoding::G711Ulaw).unwrap();
        assert_eq!(out.bytes, vec![1, 2, 3]);
        assert_eq!(out.encoding, AudioEncoding::G711Ulaw);
    }

    #[test]
    fn test_transcode_changes_width() {
        let frame = AudioFrame::new(vec![0xFF; 4], AudioEncoding::G711Ulaw, SourceChannel::Engine);
        let out = transcode(frame, AudioEncoding::Pcm16).unwrap();
        assert_eq!(out.sample_count(), 4);
        assert_eq!(out.bytes.len(), 8);
    }
}
