// Unit tests for PCM conversion between float frames and the 16-bit wire format.
//
// The encode path intentionally has no clamp: out-of-range samples wrap
// two's-complement, matching the documented capture behavior.

use compass_voice::audio::{encode_pcm16, pcm16_from_f32, CaptureFrame, PlaybackBuffer};

#[test]
fn test_encode_scales_by_32768() {
    let samples = [0.0f32, 0.5, -0.5, 0.25, -1.0];
    let pcm = pcm16_from_f32(&samples);

    assert_eq!(pcm, vec![0, 16384, -16384, 8192, -32768]);
}

#[test]
fn test_encode_smallest_step() {
    let pcm = pcm16_from_f32(&[1.0 / 32768.0, -1.0 / 32768.0]);
    assert_eq!(pcm, vec![1, -1]);
}

#[test]
fn test_encode_overflow_wraps() {
    // +1.0 is out of range for i16 and wraps to the minimum
    assert_eq!(pcm16_from_f32(&[1.0]), vec![-32768]);

    // 1.5 * 32768 = 49152, which wraps to -16384
    assert_eq!(pcm16_from_f32(&[1.5]), vec![-16384]);

    // Slightly below -1.0 wraps to large positive
    assert_eq!(pcm16_from_f32(&[-32771.0 / 32768.0]), vec![32765]);
}

#[test]
fn test_encode_is_little_endian() {
    let bytes = encode_pcm16(&[0.5]);
    assert_eq!(bytes, vec![0x00, 0x40]);
}

#[test]
fn test_encode_one_frame_two_bytes_per_sample() {
    let frame = CaptureFrame {
        samples: vec![0.1; 1600],
        sample_rate: 16000,
    };
    let bytes = encode_pcm16(&frame.samples);

    assert_eq!(bytes.len(), 3200);
    assert!((frame.duration_secs() - 0.1).abs() < 1e-9);
}

#[test]
fn test_decode_mono() {
    let mut bytes = Vec::new();
    for value in [0i16, 16384, -16384, -32768] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let buffer = PlaybackBuffer::from_pcm16(&bytes, 24000, 1).unwrap();

    assert_eq!(buffer.channels.len(), 1);
    assert_eq!(buffer.channels[0], vec![0.0, 0.5, -0.5, -1.0]);
    assert_eq!(buffer.frame_count(), 4);
}

#[test]
fn test_decode_deinterleaves_stereo() {
    // Interleaved [L0, R0, L1, R1]
    let mut bytes = Vec::new();
    for value in [100i16, 200, 300, 400] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let buffer = PlaybackBuffer::from_pcm16(&bytes, 24000, 2).unwrap();

    assert_eq!(buffer.channels.len(), 2);
    assert_eq!(buffer.channels[0], vec![100.0 / 32768.0, 300.0 / 32768.0]);
    assert_eq!(buffer.channels[1], vec![200.0 / 32768.0, 400.0 / 32768.0]);
    assert_eq!(buffer.frame_count(), 2);
}

#[test]
fn test_decode_duration() {
    let bytes = vec![0u8; 24000 * 2];
    let buffer = PlaybackBuffer::from_pcm16(&bytes, 24000, 1).unwrap();

    assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
}

#[test]
fn test_decode_rejects_unaligned_payload() {
    let result = PlaybackBuffer::from_pcm16(&[1, 2, 3], 24000, 1);
    assert!(result.is_err());
}

#[test]
fn test_roundtrip_within_one_step() {
    let samples = [0.0f32, 0.123, -0.456, 0.999];
    let bytes = encode_pcm16(&samples);
    let buffer = PlaybackBuffer::from_pcm16(&bytes, 16000, 1).unwrap();

    for (original, decoded) in samples.iter().zip(&buffer.channels[0]) {
        assert!((original - decoded).abs() <= 1.0 / 32768.0);
    }
}
