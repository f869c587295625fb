//! Command builder for the local inference server.

use std::path::Path;
use std::process::Stdio;

use switchyard_core::LocalServerConfig;
use tokio::process::Command;

/// Build the launch command for serving `model_path`.
///
/// The configured program and leading arguments come first, followed by:
/// `--model <path> --n_gpu_layers <n> --n_ctx <ctx> --host <host> --port <port>`.
/// stdout and stderr are piped so they can be streamed into our logs.
pub fn build_command(config: &LocalServerConfig, model_path: &Path) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args)
        .arg("--model")
        .arg(model_path)
        .arg("--n_gpu_layers")
        .arg(config.gpu_layers.to_string())
        .arg("--n_ctx")
        .arg(config.context_size.to_string())
        .arg("--host")
        .arg(&config.host)
        .arg("--port")
        .arg(config.port.to_string());

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}
