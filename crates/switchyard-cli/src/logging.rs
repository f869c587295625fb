//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info";

/// Filter forced by `--verbose`, regardless of `RUST_LOG`.
const VERBOSE_DIRECTIVES: &str = "info,switchyard=debug,local_server=debug,tower_http=debug";

/// Added when body inspection is on so the dumps are visible.
const INSPECT_DIRECTIVE: &str = "switchyard::inspect=debug";

/// Build the log filter for the given flags.
pub fn build_filter(verbose: bool, inspect: bool) -> EnvFilter {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVES)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    };

    match (inspect, INSPECT_DIRECTIVE.parse::<Directive>()) {
        (true, Ok(directive)) => filter.add_directive(directive),
        _ => filter,
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool, inspect: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, inspect))
        .compact()
        .try_init()
        .ok();
}
