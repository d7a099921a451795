//! HTTP transport for the marketmaker node.
//!
//! Implements [`RpcTransport`](super::RpcTransport) with `reqwest`: one POST
//! per call to `http://{host}:{port}`, bounded by a request timeout.

mod client;
mod connection;

pub use client::HttpTransport;
