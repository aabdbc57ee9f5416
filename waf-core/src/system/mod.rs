//! # System Module
//!
//! The system module provides core infrastructure components for the datapath's
//! operation: the pingora server bootstrap, graceful termination controls, and
//! the tag-based logging pipeline.
//!
//! ## Module Structure
//!
//! * `server`: builds and runs the HTTP/HTTPS pingora listeners
//! * `terminator`: signal handling and graceful shutdown mechanisms
//! * `udp_sender` / `writer`: the tag-based logging pipeline, tried before
//!   falling back to plain `env_logger`

pub mod server;
pub mod terminator;
pub mod udp_sender;
pub mod writer;
