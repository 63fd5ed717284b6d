//! HTTP storage resolver for Binstore.
//!
//! [`HttpResolver`] claims the `http` and `https` schemes and treats each
//! identifier as the full URL of its content. `exists` issues a HEAD,
//! `get_content` a GET whose body is streamed back unbuffered, and
//! `set_content` a PUT of the raw stream.
//!
//! # Consistency
//!
//! Unlike the file backend, this resolver cannot promise atomic replacement:
//! whether a concurrent reader can observe a partially written resource is
//! up to the remote server.
//!
//! # Connection limits
//!
//! Requests pass through a [`ConnectionGate`] that caps in-flight requests
//! per route (`scheme://host:port`) and in total. Callers over a cap block
//! until a permit is released. A GET holds its permit until the returned
//! stream is dropped.

pub mod config;
pub mod gate;
pub mod resolver;

pub use config::HttpResolverConfig;
pub use gate::{ConnectionGate, Permit};
pub use resolver::HttpResolver;
