use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep, sleep_until};

use crate::error::{IdleDirection, TransportError};

/// Stream wrapper with idle deadlines.
///
/// Each direction has its own deadline, armed when the connection is created.
/// A successful read pushes the read deadline to `now + read_timeout`; a
/// successful write does the same for the write deadline. Failed operations
/// leave the deadline untouched. An operation that is still pending once its
/// deadline has passed fails with [`io::ErrorKind::TimedOut`] carrying
/// [`TransportError::IdleTimeout`].
#[derive(Debug)]
pub struct TimedConnection<S> {
    inner: S,
    read_timeout: Duration,
    write_timeout: Duration,
    read_deadline: Pin<Box<Sleep>>,
    write_deadline: Pin<Box<Sleep>>,
}

impl<S> TimedConnection<S> {
    #[must_use]
    pub fn new(inner: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            inner,
            read_timeout,
            write_timeout,
            read_deadline: Box::pin(sleep_until(deadline_after(read_timeout))),
            write_deadline: Box::pin(sleep_until(deadline_after(write_timeout))),
        }
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now)
}

fn idle_timeout(direction: IdleDirection) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        TransportError::IdleTimeout { direction },
    )
}

/// Renews the deadline on success; turns a pending operation into a timeout
/// once the deadline has fired.
fn settle<T>(
    polled: Poll<io::Result<T>>,
    deadline: &mut Pin<Box<Sleep>>,
    timeout: Duration,
    direction: IdleDirection,
    cx: &mut Context<'_>,
) -> Poll<io::Result<T>> {
    match polled {
        Poll::Ready(Ok(value)) => {
            deadline.as_mut().reset(deadline_after(timeout));
            Poll::Ready(Ok(value))
        }
        Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
        Poll::Pending => match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(idle_timeout(direction))),
            Poll::Pending => Poll::Pending,
        },
    }
}

impl<S> AsyncRead for TimedConnection<S>
where
    S: AsyncRead + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_read(cx, buf);
        settle(
            polled,
            &mut this.read_deadline,
            this.read_timeout,
            IdleDirection::Read,
            cx,
        )
    }
}

impl<S> AsyncWrite for TimedConnection<S>
where
    S: AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_write(cx, buf);
        settle(
            polled,
            &mut this.write_deadline,
            this.write_timeout,
            IdleDirection::Write,
            cx,
        )
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        settle(
            polled,
            &mut this.write_deadline,
            this.write_timeout,
            IdleDirection::Write,
            cx,
        )
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_flush(cx);
        match polled {
            Poll::Pending => match this.write_deadline.as_mut().poll(cx) {
                Poll::Ready(()) => Poll::Ready(Err(idle_timeout(IdleDirection::Write))),
                Poll::Pending => Poll::Pending,
            },
            Poll::Ready(result) => Poll::Ready(result),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Finds an idle-timeout marker anywhere in an error's source chain.
pub(crate) fn idle_timeout_in(err: &(dyn std::error::Error + 'static)) -> Option<IdleDirection> {
    let mut current = Some(err);
    while let Some(candidate) = current {
        if let Some(io_err) = candidate.downcast_ref::<io::Error>()
            && let Some(TransportError::IdleTimeout { direction }) = io_err
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<TransportError>())
        {
            return Some(*direction);
        }
        current = candidate.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    const IDLE: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn stalled_read_times_out() -> AppResult<()> {
        let (client, mut server) = duplex(64);
        let mut conn = TimedConnection::new(client, IDLE, IDLE);

        server.write_all(b"hello").await?;
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await?;
        if &buf != b"hello" {
            return Err(AppError::validation("Unexpected payload"));
        }

        let started = Instant::now();
        let mut next = [0u8; 1];
        match conn.read(&mut next).await {
            Ok(read) => Err(AppError::validation(format!(
                "Expected read timeout, read {} bytes",
                read
            ))),
            Err(err) => {
                if err.kind() != io::ErrorKind::TimedOut {
                    return Err(AppError::validation(format!("Unexpected error: {}", err)));
                }
                if idle_timeout_in(&err) != Some(IdleDirection::Read) {
                    return Err(AppError::validation("Missing read idle marker"));
                }
                if started.elapsed() < IDLE.saturating_sub(Duration::from_millis(1)) {
                    return Err(AppError::validation("Timed out before the idle window"));
                }
                drop(server);
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn steady_trickle_never_times_out() -> AppResult<()> {
        let (client, mut server) = duplex(64);
        let mut conn = TimedConnection::new(client, IDLE, IDLE);

        let writer = tokio::spawn(async move {
            for byte in 0u8..6 {
                tokio::time::sleep(Duration::from_millis(80)).await;
                server.write_all(&[byte]).await?;
            }
            Ok::<_, io::Error>(())
        });

        let started = Instant::now();
        let mut buf = [0u8; 6];
        conn.read_exact(&mut buf).await?;
        writer.await??;

        if buf != [0, 1, 2, 3, 4, 5] {
            return Err(AppError::validation("Unexpected trickle payload"));
        }
        if started.elapsed() <= IDLE {
            return Err(AppError::validation(
                "Transfer should outlast a single idle window",
            ));
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_write_times_out() -> AppResult<()> {
        let (client, _server) = duplex(4);
        let mut conn = TimedConnection::new(client, IDLE, IDLE);

        match conn.write_all(b"more than four bytes").await {
            Ok(()) => Err(AppError::validation("Expected write timeout")),
            Err(err) => {
                if idle_timeout_in(&err) == Some(IdleDirection::Write) {
                    Ok(())
                } else {
                    Err(AppError::validation(format!("Unexpected error: {}", err)))
                }
            }
        }
    }
}
