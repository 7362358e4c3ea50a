/*
[INPUT]:  HTTP client configuration and verifier base URL
[OUTPUT]: Challenge transport over HTTP
[POS]:    HTTP layer - REST communication with a remote verifier
[UPDATE]: When adding endpoints or changing client behavior
*/

pub mod client;

pub use client::{ClientConfig, HttpChallengeTransport};
