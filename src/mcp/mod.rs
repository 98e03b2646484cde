//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Protocol-level validation, negotiation, formatting and routing.

pub mod rpc;
pub mod server;
