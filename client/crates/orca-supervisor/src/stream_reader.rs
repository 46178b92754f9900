//! Line readers for child stdout/stderr.
//!
//! Reads bytes up to each newline and decodes lossily, so a stray non-UTF-8
//! byte from the server does not end the reader. Lines longer than
//! [`MAX_LINE_BYTES`] are forwarded in chunks of that size.

use crate::LogSink;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

pub(crate) const MAX_LINE_BYTES: usize = 64 * 1024;

pub(crate) fn spawn_line_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_name: &'static str,
    sink: Arc<dyn LogSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let mut limited = (&mut reader).take(MAX_LINE_BYTES as u64);
            match limited.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    sink.server_log(&String::from_utf8_lossy(&buf));
                }
                Err(e) => {
                    debug!(%stream_name, error = %e, "server output reader exiting on read error");
                    break;
                }
            }
        }

        debug!(%stream_name, "server output reader finished");
    })
}
