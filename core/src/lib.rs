// Core of the Crafter agent:
// - Transport to the text-generation service, with backoff
// - Conversation normalization and answer sanitization
// - Action selection with bounded retry and idle fallback
// - Episode driver and trajectory logs
// - Configuration loading and shared error types

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export types module - Conversation and wire data structures
pub mod types;
pub use types::*;

pub mod catalog;
pub use catalog::ActionCatalog;

// Transport and retrying client
pub mod client;
pub mod transport;
pub use client::{LlmClient, ModelProfile, RetryPolicy};
pub use transport::{ChatTransport, OpenAiTransport};

pub mod normalize;
pub mod sanitize;
pub use normalize::normalize;
pub use sanitize::sanitize;

pub mod prompt;
pub mod selector;
pub use prompt::{GameSnapshot, PromptBuilder};
pub use selector::{ActionSelector, Selection};

// Game-engine boundary and the episode loop on top of it
pub mod driver;
pub mod engine;
pub mod trajectory;
pub use driver::{EpisodeDriver, EpisodeSummary, StepReport};
pub use engine::{GameEngine, Observation, PlayerStatus, StepOutcome};
