//! Async stream log readers (non-UTF8-safe).
//!
//! Inference servers can emit non-UTF8 bytes on stdout/stderr.
//! Using `BufReader::lines()` would terminate the reader task on invalid UTF-8,
//! so lines are read as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Forward every line of `stream` to `tracing` under the `local_server` target.
///
/// The task ends at EOF, which happens when the child exits.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: u32,
    stream_type: &'static str,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let line = decode_line(&buf);
                    debug!(target: "local_server", pid, stream = stream_type, "{line}");
                }
                Err(e) => {
                    debug!(target: "local_server", pid, stream = stream_type, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(target: "local_server", pid, stream = stream_type, "log stream reader task exiting");
    })
}

fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    if buf[..end].ends_with(b"\n") {
        end -= 1;
        if buf[..end].ends_with(b"\r") {
            end -= 1;
        }
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
