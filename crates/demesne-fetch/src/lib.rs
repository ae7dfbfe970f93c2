//! Authenticated HTTP fetching with retry, cancellation, and byte progress.
//!
//! # Architecture
//!
//! - [`retry`] / [`retry_delay`] - exponential backoff, pure of I/O concerns
//! - [`HttpClient`] - one-request client abstraction with a [`ReqwestClient`]
//!   production implementation
//! - [`Transport`] - credentials, client-id header, retry, per-call timeout,
//!   cancellation, and progress layered over any [`HttpClient`]
//!
//! The split keeps policy out of the client: a mock [`HttpClient`] scripted
//! with statuses and body chunks exercises everything above it.

mod auth;
mod client;
mod error;
mod progress;
mod retry;

pub use auth::Credential;
pub use client::{
    BoxStream, CLIENT_ID_HEADER, HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient,
    Transport,
};
pub use error::FetchError;
pub use progress::{Progress, ProgressCallback};
pub use retry::{RetryPolicy, retry, retry_delay};
