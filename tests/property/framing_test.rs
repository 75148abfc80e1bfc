// tests/property/framing_test.rs

//! Property-based tests for line framing
//! Tests that however a byte stream is chunked, the same lines come out

use bytes::BytesMut;
use ircline::core::protocol::LineFrameCodec;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_chunking_does_not_change_lines(
        lines in prop::collection::vec("[ -~]{0,40}", 1..20),
        crlf in any::<bool>(),
        chunk in 1usize..17,
    ) {
        let terminator = if crlf { "\r\n" } else { "\n" };
        let wire: String = lines.iter().map(|l| format!("{l}{terminator}")).collect();

        let mut codec = LineFrameCodec::default();
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in wire.as_bytes().chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame.into_line().unwrap());
            }
        }

        prop_assert!(buf.is_empty());
        prop_assert_eq!(decoded, lines);
    }
}
