//! Fuzz target for outbound line framing
//!
//! # Invariants
//!
//! - Text containing `\n` or `\r` is refused with `SendError::InvalidLine`
//!   and nothing reaches the wire
//! - Any other text arrives as exactly `text + "\n"`

#![no_main]

use libfuzzer_sys::fuzz_target;
use linechat_client::{Connection, Endpoint, SendError};
use tokio::io::{AsyncReadExt, duplex};

fuzz_target!(|text: String| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
        return;
    };

    runtime.block_on(async {
        let (local, mut remote) = duplex(text.len() + 1);
        let conn = Connection::from_stream(local, Endpoint::new("fuzz", 1));
        let result = conn.sender().send(&text).await;
        conn.close().await;

        let mut wire = Vec::new();
        remote.read_to_end(&mut wire).await.expect("in-memory read");

        if text.contains(['\n', '\r']) {
            assert!(matches!(result, Err(SendError::InvalidLine)));
            assert!(wire.is_empty());
        } else {
            assert!(result.is_ok());
            assert_eq!(wire, format!("{text}\n").into_bytes());
        }
    });
});
