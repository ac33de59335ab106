//! Background reader.
//!
//! One task per connection drains the read half line by line and hands each
//! line to the [`DeliveryTarget`], in wire order. The loop ends on end of
//! stream, on a read error, or on cancellation; whichever comes first is
//! reported through [`DeliveryTarget::on_disconnected`] exactly once.
//!
//! Cancellation races the pending read in `tokio::select!`, so a silent
//! peer cannot keep the reader alive. Line reads are cancel-safe: no
//! partially read line is lost to the select.

use std::{
    fmt,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader, ReadHalf},
    sync::watch,
    task::JoinHandle,
};

use crate::{Connection, DeliveryTarget, DisconnectReason, Endpoint, StartError, Transport};

/// Handle to a running reader task.
///
/// Dropping the handle cancels the reader.
pub struct ReaderHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<DisconnectReason>,
}

impl fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("cancelled", &*self.cancel.borrow())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl ReaderHandle {
    /// Request cancellation. Idempotent; returns immediately.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether the reader task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the reader to end, at most `timeout`.
    ///
    /// Returns the reason the reader stopped. On timeout the task is
    /// aborted and `None` is returned; the target then receives no
    /// disconnect notification.
    pub async fn join(mut self, timeout: Duration) -> Option<DisconnectReason> {
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(reason)) => Some(reason),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "reader task failed");
                None
            },
            Err(_) => {
                tracing::warn!(?timeout, "reader did not stop in time, aborting");
                self.task.abort();
                None
            },
        }
    }
}

impl<S: Transport> Connection<S> {
    /// Start the background reader, delivering to `target`.
    ///
    /// The reader holds `target` weakly. Must be called from within a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// - [`StartError::NotConnected`] if the connection is not connected
    /// - [`StartError::ReaderAlreadyStarted`] on a second call
    pub fn start_reader<T>(&self, target: &Arc<T>) -> Result<ReaderHandle, StartError>
    where
        T: DeliveryTarget + ?Sized + 'static,
    {
        if !self.is_connected() {
            return Err(StartError::NotConnected);
        }
        let read_half = self.take_read_half().ok_or(StartError::ReaderAlreadyStarted)?;

        let (cancel, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(read_loop(
            read_half,
            Arc::downgrade(target),
            cancel_rx,
            self.closed_signal(),
            self.endpoint().clone(),
        ));

        tracing::debug!(endpoint = %self.endpoint(), "reader started");

        Ok(ReaderHandle { cancel, task })
    }
}

async fn read_loop<S, T>(
    read_half: ReadHalf<S>,
    target: Weak<T>,
    mut cancel: watch::Receiver<bool>,
    mut closed: watch::Receiver<bool>,
    endpoint: Endpoint,
) -> DisconnectReason
where
    S: AsyncRead,
    T: DeliveryTarget + ?Sized,
{
    let mut lines = BufReader::new(read_half).lines();
    let mut delivered: u64 = 0;

    let reason = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.wait_for(|cancelled| *cancelled) => break DisconnectReason::Cancelled,
            _ = closed.wait_for(|is_closed| *is_closed) => break DisconnectReason::Cancelled,
            next = lines.next_line() => next,
        };

        match next {
            Ok(Some(line)) => {
                let Some(target) = target.upgrade() else {
                    tracing::debug!(%endpoint, "delivery target dropped");
                    return DisconnectReason::Cancelled;
                };
                target.on_message(line);
                delivered += 1;
            },
            Ok(None) => break DisconnectReason::EndOfStream,
            Err(e) => {
                tracing::warn!(%endpoint, error = %e, "read failed");
                break DisconnectReason::ReadError;
            },
        }
    };

    tracing::debug!(%endpoint, %reason, delivered, "reader stopped");

    if let Some(target) = target.upgrade() {
        target.on_disconnected(reason);
    }

    reason
}
