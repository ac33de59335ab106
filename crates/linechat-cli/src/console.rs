//! Interactive console loop.
//!
//! Input lines arrive on a channel fed by a dedicated stdin thread, so a
//! pending read never holds up runtime shutdown. Output goes to any
//! [`Write`] so the loop can be driven from tests.

use std::{
    io::{self, BufRead, Write},
    thread,
    time::SystemTime,
};

use linechat_client::{
    ChannelTarget, ClientConfig, InboundEvent, SendError, Session, SessionError, ShutdownOptions,
};
use tokio::sync::mpsc;

use crate::format::{self, EXIT_COMMAND, Profile};

/// Console errors.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Session could not be established.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Why the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// User typed the exit command.
    Command,
    /// Input reached end of file.
    EndOfInput,
    /// Server side went away.
    Disconnected,
}

/// Read stdin lines on a dedicated thread.
///
/// The thread stops at end of input, on a read error, or once the receiver
/// is dropped.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Ask for a display name on `out` and read it from `input`.
pub async fn prompt_name<W: Write>(
    input: &mut mpsc::UnboundedReceiver<String>,
    out: &mut W,
) -> Result<String, CliError> {
    write!(out, "Enter your name: ")?;
    out.flush()?;
    let raw = input.recv().await.unwrap_or_default();
    Ok(format::display_name(&raw))
}

/// Connect, then relay lines both ways until exit, end of input, or
/// disconnect. The farewell is sent on the way out.
pub async fn run<W: Write>(
    config: &ClientConfig,
    profile: &Profile,
    mut input: mpsc::UnboundedReceiver<String>,
    out: &mut W,
) -> Result<Exit, CliError> {
    let (target, mut events) = ChannelTarget::channel();
    let mut session = Session::connect(config, &target).await?;

    writeln!(out, "Connected to the chat server at {}", config.endpoint())?;
    writeln!(out, "Type messages and press Enter. Type '{EXIT_COMMAND}' to leave.")?;
    out.flush()?;

    let exit = loop {
        tokio::select! {
            line = input.recv() => match line {
                Some(text) if text.trim() == EXIT_COMMAND => break Exit::Command,
                Some(text) => {
                    let message = profile.compose(&text, SystemTime::now());
                    match session.send(&message).await {
                        Ok(()) => {},
                        Err(SendError::InvalidLine) => {
                            writeln!(out, "Message not sent: it contains a line break")?;
                        },
                        Err(err) => {
                            tracing::warn!(error = %err, "send failed");
                            writeln!(out, "Message not sent: {err}")?;
                            break Exit::Disconnected;
                        },
                    }
                },
                None => break Exit::EndOfInput,
            },
            event = events.recv() => match event {
                Some(InboundEvent::Message(line)) => {
                    writeln!(out, "{}", format::render_inbound(&line))?;
                },
                Some(InboundEvent::Disconnected(reason)) => {
                    writeln!(out, "Disconnected from the chat server: {reason}")?;
                    break Exit::Disconnected;
                },
                None => break Exit::Disconnected,
            },
        }
        out.flush()?;
    };

    let options = ShutdownOptions::from_config(config).with_farewell(profile.farewell());
    let report = session.close(options).await;
    tracing::debug!(?exit, ?report, "console finished");

    writeln!(out, "Goodbye.")?;
    out.flush()?;
    Ok(exit)
}
