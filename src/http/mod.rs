//! HTTP transport layer for the Model Context Protocol
//!
//! Route handlers for `/mcp`, its REST mirrors and the metadata endpoints.

pub mod handlers;
