//! LLM Provider implementations for MedTutor.
//!
//! All providers implement the `medtutor_core::Provider` trait.
//! The router picks the hosted or local endpoint based on configuration.

pub mod openai_compat;
pub mod router;
pub mod timeout;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
pub use timeout::TimeoutProvider;
