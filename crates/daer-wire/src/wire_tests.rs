use super::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Sample {
    n: u32,
    s: String,
}

#[test]
fn encode_returns_json_without_a_length_prefix() {
    let sample = Sample { n: 1, s: "hi".into() };
    let encoded = encode(&sample).unwrap();
    let text = std::str::from_utf8(&encoded).unwrap();
    assert!(text.starts_with('{'));
    assert_eq!(decode::<Sample>(&encoded).unwrap(), sample);
}

#[tokio::test]
async fn write_then_read_message_round_trips() {
    let payload = b"hello world".to_vec();
    let mut buffer = Vec::new();
    write_message(&mut buffer, &payload).await.unwrap();
    assert_eq!(buffer.len(), 4 + payload.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.unwrap();
    assert_eq!(read_back, payload);
}

#[tokio::test]
async fn write_message_prefixes_big_endian_length() {
    let payload = b"abcdef".to_vec();
    let mut buffer = Vec::new();
    write_message(&mut buffer, &payload).await.unwrap();

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, payload.len());
    assert_eq!(&buffer[4..], &payload[..]);
}

#[tokio::test]
async fn write_frame_then_read_frame_round_trips_a_typed_value() {
    let sample = Sample { n: 42, s: "frame".into() };
    let mut buffer = Vec::new();
    write_frame(&mut buffer, &sample).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back: Sample = read_frame(&mut cursor).await.unwrap();
    assert_eq!(read_back, sample);
}

#[tokio::test]
async fn oversized_frame_is_rejected_before_reading_the_body() {
    let mut buffer = Vec::new();
    let huge_len = (MAX_FRAME_BYTES as u32) + 1;
    buffer.extend_from_slice(&huge_len.to_be_bytes());

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
}
