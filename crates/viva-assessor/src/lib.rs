//! viva-assessor — assessment service integrations.
//!
//! Implements the `Assessor` trait over an OpenAI-compatible chat API, plus
//! a mock backend so the lifecycle can run without network access.

pub mod config;
pub mod error;
pub mod mock;
pub mod openai;

pub use config::{create_assessor, load_config, AssessorConfig};
pub use error::AssessorError;
pub use mock::MockAssessor;
pub use openai::OpenAiAssessor;
