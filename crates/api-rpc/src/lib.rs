//! JSON-RPC API Layer
//!
//! Manual run trigger and run inspection for the Gradeflow daemon.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
