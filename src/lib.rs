//! SendGrid provider
//!
//! A provider plugin that manages SendGrid account configuration (API keys,
//! alerts, teammates, sender authentication, link branding and account
//! settings) as infrastructure-as-code resources and data sources.
//!
//! # Overview
//!
//! - **Protocol**: a gRPC service with JSON-encoded values ([`server`], [`generated`])
//! - **Schemas**: typed attribute schemas, validation and planning ([`schema`], [`validation`], [`plan`])
//! - **SendGrid client**: a `reqwest` client for the v3 REST API ([`client`])
//! - **Resources and data sources**: one adapter per SendGrid object ([`resources`], [`data_sources`])
//! - **Provider**: [`SendGridProvider`] wires configuration, client and adapters together
//! - **Testing**: [`testing::ProviderTester`] drives the provider without gRPC
//!
//! # Running
//!
//! The host spawns the `terraform-provider-sendgrid` binary, which prints a
//! handshake line to stdout and then serves gRPC:
//!
//! ```text
//! SENDGRID_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `SENDGRID_PROVIDER|<protocol_version>|<address>`. Logs go to stderr.
//!
//! # Configuration
//!
//! ```ignore
//! use terraform_provider_sendgrid::{serve, init_logging, SendGridProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), terraform_provider_sendgrid::ProviderError> {
//!     init_logging();
//!     serve(SendGridProvider::new()).await
//! }
//! ```
//!
//! The provider block accepts `api_key`, `host`, `subuser` and
//! `timeout_seconds`; see [`config`] for the environment fallbacks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::SendGridClient;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging, LogFormat};
pub use plan::plan_resource;
pub use provider::SendGridProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
