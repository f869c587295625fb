//! Target-switching reverse proxy.
//!
//! Every inbound request is forwarded to whichever backend is currently
//! selected; `POST /set_target` changes the selection and, for local
//! targets, restarts the local inference server before answering.

#![deny(unsafe_code)]

pub mod error;
pub mod forward;
pub mod inspect;
pub mod server;
pub mod target;

pub use error::HttpError;
pub use forward::{ForwardError, ForwardedResponse, build_client};
pub use server::{AppState, build_router, serve};
pub use target::{ActiveTarget, TargetState};
