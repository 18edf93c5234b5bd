// Path: crates/server/src/timeouts.rs
//! Per-connection I/O deadlines.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{sleep, Sleep};

/// HTTP server timeouts. The write budget is generous on purpose: artifact
/// responses can exceed a gigabyte and slow ONIE downloaders are common.
#[derive(Debug, Clone, Copy)]
pub struct HttpTimeouts {
    /// Budget for reading the request head (enforced by hyper).
    pub read_header: Duration,
    /// Stall budget for reads while a request is in flight.
    pub read: Duration,
    /// Stall budget for response writes.
    pub write: Duration,
    /// Stall budget for reads between requests on a keep-alive connection.
    pub idle: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            read_header: Duration::from_secs(10),
            read: Duration::from_secs(30),
            write: Duration::from_secs(300),
            idle: Duration::from_secs(90),
        }
    }
}

enum DeadlineState {
    Idle,
    Armed(Pin<Box<Sleep>>),
}

/// A stream wrapper that fails reads and writes which stall past their
/// budget. A read that makes progress re-arms the deadline; the same goes
/// for writes, so a slow-but-moving artifact download is never cut off.
pub struct TimedStream<S> {
    inner: S,
    timeouts: HttpTimeouts,
    /// False between requests: the next read waits on keep-alive idle time
    /// rather than on a half-sent request.
    mid_request: bool,
    read_deadline: DeadlineState,
    write_deadline: DeadlineState,
}

impl<S> TimedStream<S> {
    /// Wraps a stream with the given budgets.
    pub fn new(inner: S, timeouts: HttpTimeouts) -> Self {
        Self {
            inner,
            timeouts,
            mid_request: false,
            read_deadline: DeadlineState::Idle,
            write_deadline: DeadlineState::Idle,
        }
    }
}

fn poll_deadline(
    state: &mut DeadlineState,
    budget: Duration,
    cx: &mut Context<'_>,
    what: &'static str,
) -> Poll<io::Result<()>> {
    let sleep_box = match state {
        DeadlineState::Armed(sleep_box) => sleep_box,
        DeadlineState::Idle => {
            *state = DeadlineState::Armed(Box::pin(sleep(budget)));
            match state {
                DeadlineState::Armed(sleep_box) => sleep_box,
                DeadlineState::Idle => unreachable!(),
            }
        }
    };
    match sleep_box.as_mut().poll(cx) {
        Poll::Ready(()) => {
            *state = DeadlineState::Idle;
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{what} stalled past its deadline"),
            )))
        }
        Poll::Pending => Poll::Pending,
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TimedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut me.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() > before {
                    me.mid_request = true;
                }
                me.read_deadline = DeadlineState::Idle;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => {
                let budget = if me.mid_request {
                    me.timeouts.read
                } else {
                    me.timeouts.idle
                };
                poll_deadline(&mut me.read_deadline, budget, cx, "read")
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TimedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let me = self.get_mut();
        match Pin::new(&mut me.inner).poll_write(cx, data) {
            Poll::Ready(res) => {
                me.write_deadline = DeadlineState::Idle;
                Poll::Ready(res)
            }
            Poll::Pending => {
                match poll_deadline(&mut me.write_deadline, me.timeouts.write, cx, "write") {
                    Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
                    _ => Poll::Pending,
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        match Pin::new(&mut me.inner).poll_flush(cx) {
            Poll::Ready(Ok(())) => {
                // The response went out; the next read is a keep-alive wait.
                me.mid_request = false;
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        Pin::new(&mut me.inner).poll_shutdown(cx)
    }
}
