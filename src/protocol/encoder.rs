//! SSE frame encoding
//!
//! Produces the bit-exact wire form `event: <topic>\ndata: <json>\n\n`.
//! The `id:` and `retry:` fields are understood by the decoder for forward
//! compatibility but are never emitted here.

use bytes::{BufMut, Bytes, BytesMut};

/// Encode one event into its wire frame.
///
/// `data` must already be serialized payload text (JSON). The returned
/// `Bytes` is reference-counted, so handing the same frame to many
/// subscriber queues does not copy the payload.
pub fn encode_event(topic: &str, data: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(topic.len() + data.len() + 16);

    buf.put_slice(b"event: ");
    buf.put_slice(topic.as_bytes());
    buf.put_u8(b'\n');
    buf.put_slice(b"data: ");
    buf.put_slice(data.as_bytes());
    buf.put_slice(b"\n\n");

    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_exact_frame() {
        let frame = encode_event("zen", r#"{"index": 0, "lesson": "Beautiful is better than ugly."}"#);

        assert_eq!(
            frame,
            &b"event: zen\ndata: {\"index\": 0, \"lesson\": \"Beautiful is better than ugly.\"}\n\n"[..]
        );
    }

    #[test]
    fn test_encode_is_utf8() {
        let frame = encode_event("zen", r#"{"lesson": "Schönheit ist besser als Hässlichkeit."}"#);

        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("event: zen\ndata: "));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_encode_concatenation_has_no_separator() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode_event("a", "1"));
        wire.extend_from_slice(&encode_event("b", "2"));

        assert_eq!(wire, b"event: a\ndata: 1\n\nevent: b\ndata: 2\n\n");
    }
}
