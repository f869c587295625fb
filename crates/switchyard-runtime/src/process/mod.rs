//! Child process helpers.
//!
//! - `shutdown_child` - SIGTERM → grace period → SIGKILL, always reaping
//! - `spawn_stream_reader` - pipe a child's output into `tracing`

mod shutdown;
mod stream;

pub use shutdown::shutdown_child;
pub use stream::spawn_stream_reader;
