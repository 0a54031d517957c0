//! Streaming response body.
//!
//! Wraps the backend's body and hands it to the caller in frames no larger
//! than the configured chunk size. Oversized frames are split without copying.
//! Nothing beyond one backend frame is held at a time.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use hyper::body::{Body, Bytes, Frame, SizeHint};

use crate::observability::metrics;
use crate::relay::dial::ConnectionDriver;

/// Keeps the backend connection alive for as long as the body streams.
#[derive(Debug)]
pub(crate) struct RelayGuard {
    _driver: ConnectionDriver,
}

impl RelayGuard {
    pub(crate) fn new(driver: ConnectionDriver) -> Self {
        metrics::relay_started();
        Self { _driver: driver }
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        metrics::relay_finished();
    }
}

/// Response body relayed from a backend.
#[derive(Debug)]
pub struct RelayBody<B> {
    inner: B,
    chunk_size: usize,
    pending: Option<Bytes>,
    namespace: String,
    _guard: Option<RelayGuard>,
}

impl<B> RelayBody<B> {
    /// Relay `inner` in frames of at most `chunk_size` bytes.
    pub fn new(inner: B, chunk_size: usize, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            pending: None,
            namespace: namespace.into(),
            _guard: None,
        }
    }

    pub(crate) fn with_guard(mut self, guard: RelayGuard) -> Self {
        self._guard = Some(guard);
        self
    }

    fn next_chunk(&mut self, mut data: Bytes) -> Bytes {
        if data.len() > self.chunk_size {
            let head = data.split_to(self.chunk_size);
            self.pending = Some(data);
            head
        } else {
            data
        }
    }
}

impl<B> Body for RelayBody<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let Some(rest) = this.pending.take() {
            let chunk = this.next_chunk(rest);
            return Poll::Ready(Some(Ok(Frame::data(chunk))));
        }

        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => {
                    let chunk = this.next_chunk(data);
                    Poll::Ready(Some(Ok(Frame::data(chunk))))
                }
                // Trailers pass through untouched.
                Err(frame) => Poll::Ready(Some(Ok(frame))),
            },
            Some(Err(e)) => {
                // Status and headers are already committed; the caller sees a
                // truncated body on an aborted connection.
                tracing::warn!(
                    namespace = %this.namespace,
                    error = %e,
                    "Backend body read failed mid-stream"
                );
                Poll::Ready(Some(Err(e)))
            }
            None => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.pending.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        let pending = self.pending.as_ref().map_or(0, |b| b.len() as u64);
        let inner = self.inner.size_hint();

        let mut hint = SizeHint::new();
        hint.set_lower(inner.lower() + pending);
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper + pending);
        }
        hint
    }
}
