//! Remote template service client.
//!
//! `HttpTemplateGateway` talks to the template API over HTTP GET + JSON,
//! walking an ordered candidate list of base URLs with bounded per-request
//! timeouts. The `TemplateGateway` trait is the seam the engine is built
//! against, so fetch coordination can be tested without a network.

pub mod error;
pub mod gateway;

pub use error::GatewayError;
pub use gateway::{FetchOrder, HttpTemplateGateway, TemplateGateway};
