//! MCP (Model Context Protocol) server for the CV CRM tools.
//!
//! **Server** (`server`): JSON-RPC 2.0 dispatcher plus the HTTP endpoint
//! mounted at `POST /mcp`.
//!
//! **Stdio** (`stdio`): the same dispatcher over line-delimited
//! stdin/stdout, selected with `MCP_TRANSPORT=stdio`.
//!
//! Spec: <https://spec.modelcontextprotocol.io/2024-11-05/>

pub mod server;
pub mod stdio;
