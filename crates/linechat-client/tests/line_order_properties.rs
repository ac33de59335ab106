//! Property-based tests for line delivery.
//!
//! Arbitrary line sequences, written by the peer in arbitrary chunkings,
//! must reach the consumer unchanged and in order, followed by exactly one
//! disconnect notification.

use linechat_client::{
    ChannelTarget, Connection, DisconnectReason, Endpoint, InboundEvent, validate_line,
};
use proptest::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

/// Generate a line without terminators.
fn line_strategy() -> impl Strategy<Value = String> {
    "[^\r\n]{0,40}"
}

/// Deliver `lines` through a reader, writing the wire bytes in chunks of
/// `chunk` bytes. Returns everything the target saw.
fn deliver(lines: &[String], chunk: usize) -> Vec<InboundEvent> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

    runtime.block_on(async {
        let (local, mut remote) = duplex(64);
        let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
        let (target, mut events) = ChannelTarget::channel();
        let _reader = conn.start_reader(&target).unwrap();

        let wire: Vec<u8> = lines.iter().flat_map(|l| format!("{l}\n").into_bytes()).collect();
        for piece in wire.chunks(chunk) {
            remote.write_all(piece).await.unwrap();
        }
        drop(remote);

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = matches!(event, InboundEvent::Disconnected(_));
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_lines_delivered_in_wire_order(
        lines in prop::collection::vec(line_strategy(), 0..30),
        chunk in 1usize..17,
    ) {
        let seen = deliver(&lines, chunk);

        let mut expected: Vec<InboundEvent> =
            lines.iter().cloned().map(InboundEvent::Message).collect();
        expected.push(InboundEvent::Disconnected(DisconnectReason::EndOfStream));

        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_sent_lines_arrive_verbatim(lines in prop::collection::vec(line_strategy(), 1..20)) {
        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

        let received = runtime.block_on(async {
            let (local, remote) = duplex(4096);
            let conn = Connection::from_stream(local, Endpoint::new("memory", 1));
            let sender = conn.sender();
            let mut peer = BufReader::new(remote).lines();

            let mut received = Vec::new();
            for line in &lines {
                sender.send(line).await.unwrap();
                received.push(peer.next_line().await.unwrap().unwrap());
            }
            received
        });

        prop_assert_eq!(received, lines);
    }

    #[test]
    fn prop_validate_rejects_exactly_terminators(text in "[a-z \r\n]{0,30}") {
        let has_terminator = text.contains(['\n', '\r']);
        prop_assert_eq!(validate_line(&text).is_err(), has_terminator);
    }
}
