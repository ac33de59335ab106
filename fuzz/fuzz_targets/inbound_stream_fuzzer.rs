//! Fuzz target for the inbound line reader
//!
//! # Strategy
//!
//! - Wire bytes: arbitrary, including invalid UTF-8 and bare `\r`
//! - Chunking: bytes written to the stream in pieces of 1..=64 bytes
//!
//! # Invariants
//!
//! - Exactly one `Disconnected` event, and it is the last event
//! - Invalid UTF-8 ends with `ReadError`, never a panic
//! - Valid UTF-8 without `\r` is delivered as its `\n`-separated lines, in
//!   order, followed by `EndOfStream`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linechat_client::{ChannelTarget, Connection, DisconnectReason, Endpoint, InboundEvent};
use tokio::io::{AsyncWriteExt, duplex};

#[derive(Debug, Arbitrary)]
struct Input {
    wire: Vec<u8>,
    chunk: u8,
}

fn collect(input: &Input) -> Vec<InboundEvent> {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
        return Vec::new();
    };

    runtime.block_on(async {
        let (local, mut remote) = duplex(256);
        let conn = Connection::from_stream(local, Endpoint::new("fuzz", 1));
        let (target, mut events) = ChannelTarget::channel();
        let _reader = conn.start_reader(&target).expect("fresh connection");

        let chunk = usize::from(input.chunk % 64) + 1;
        for piece in input.wire.chunks(chunk) {
            if remote.write_all(piece).await.is_err() {
                break;
            }
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

fuzz_target!(|input: Input| {
    let seen = collect(&input);
    if seen.is_empty() {
        return;
    }

    let disconnects =
        seen.iter().filter(|event| matches!(event, InboundEvent::Disconnected(_))).count();
    assert_eq!(disconnects, 1, "exactly one disconnect");
    assert!(matches!(seen.last(), Some(InboundEvent::Disconnected(_))), "disconnect is last");

    match std::str::from_utf8(&input.wire) {
        Err(_) => {
            assert_eq!(
                seen.last(),
                Some(&InboundEvent::Disconnected(DisconnectReason::ReadError)),
                "invalid UTF-8 must end the reader with a read error"
            );
        },
        Ok(text) if !text.contains('\r') => {
            let mut expected: Vec<InboundEvent> = text
                .split_terminator('\n')
                .map(|line| InboundEvent::Message(line.to_string()))
                .collect();
            expected.push(InboundEvent::Disconnected(DisconnectReason::EndOfStream));
            assert_eq!(seen, expected);
        },
        Ok(_) => {},
    }
});
