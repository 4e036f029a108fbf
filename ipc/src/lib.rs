// This crate centralizes communication with the external game-engine process.

pub mod engine_messages; // Wire format for agent <-> engine bridge
pub mod stdio_engine; // GameEngine implementation over a child process

pub use engine_messages::{EnginePayload, EngineRequest, EngineResponse};
pub use stdio_engine::{EngineConnection, StdioEngine};
