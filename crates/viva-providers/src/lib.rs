//! viva-providers — Model backend integrations for viva.
//!
//! Implements the core `ModelInvoker` trait for the Together.ai API, plus an
//! offline backend for demo mode and a mock for tests, and owns configuration
//! loading.

pub mod config;
pub mod mock;
pub mod offline;
pub mod together;

pub use config::{create_invoker, load_config, load_config_from, ProviderConfig, VivaConfig};
pub use mock::MockInvoker;
pub use offline::OfflineInvoker;
pub use together::TogetherProvider;
