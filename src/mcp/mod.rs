//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Envelope codec, error catalog, capability description and method dispatch.

pub mod capabilities;
pub mod codec;
pub mod rpc;
pub mod server;
