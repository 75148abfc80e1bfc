// tests/property/roundtrip_test.rs

//! Property-based tests for message round trips
//! Tests that formatting a message and parsing the line back preserves it

use ircline::{IrcCodec, IrcMessage, LineCodec};
use proptest::prelude::*;

fn arb_message() -> impl Strategy<Value = IrcMessage> {
    let tags = prop::collection::vec(
        (
            "\\+?[a-z][a-z0-9-]{0,8}",
            prop::option::of("[ -~]{1,20}"),
        ),
        0..4,
    );
    let source = prop::option::of("[a-z]{1,9}(![a-z~]{1,9}@[a-z.]{1,20})?");
    let command = prop_oneof!["[A-Z]{1,10}", "[0-9]{3}"];
    // No spaces, never starting with ':'.
    let middles = prop::collection::vec("[!-9;-~][!-~]{0,15}", 0..5);
    let trailing = prop::option::of("[ -~]{0,30}");

    (tags, source, command, middles, trailing).prop_map(
        |(tags, source, command, middles, trailing)| {
            let mut message = IrcMessage::new(command);
            for (key, value) in tags {
                message = message.with_tag(key, value.as_deref());
            }
            if let Some(source) = source {
                message = message.with_source(source);
            }
            for param in middles {
                message = message.with_param(param);
            }
            if let Some(trailing) = trailing {
                message = message.with_param(trailing);
            }
            message
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_format_parse_roundtrip(message in arb_message()) {
        let line = IrcCodec.format_message(&message).unwrap();
        prop_assert!(!line.contains('\r') && !line.contains('\n'));
        let parsed = IrcCodec.parse_line(&line).unwrap();
        prop_assert_eq!(parsed, message);
    }

    #[test]
    fn test_formatted_line_with_args_matches_constructed_message(
        target in "[#&]?[a-z0-9]{1,20}",
        text in r"[^\r\n\x00]{0,60}",
    ) {
        // What `write_line!` puts on the wire, minus the terminator.
        let wire = format!("PRIVMSG {} :{}\n", target, text);
        let line = wire.strip_suffix('\n').unwrap();

        let parsed = IrcCodec.parse_line(line).unwrap();
        let expected = IrcMessage::new("PRIVMSG").with_param(target).with_param(text);
        prop_assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_never_panics(line in "\\PC{0,200}") {
        let _ = IrcCodec.parse_line(&line);
    }
}
