//! Language-model completion service used by the document reviewer.
//!
//! The crate owns everything that talks to a model backend:
//! - provider clients ([`services::open_ai_service`], [`services::ollama_service`]);
//! - per-purpose profiles ([`service_profiles::LlmServiceProfiles`]): `review` and `summary`;
//! - env-driven default configs ([`config::default_config`]);
//! - a unified error type ([`error_handler::AiLlmError`]);
//! - a library-scoped logging layer ([`telemetry`]).

pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, Result};
pub use service_profiles::{LlmServiceProfiles, Purpose};
