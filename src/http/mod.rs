//! HTTP transport for the Model Context Protocol server

pub mod handlers;
