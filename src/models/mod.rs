//! Data models for template records and fetch scopes.
//!
//! - `TemplateRecord`, `TemplateMedia`, `Axis`: the normalized domain
//!   shape every component downstream of the gateway works with
//! - `Scope`, `ReligionFilter`: the (category, religion) pair that keys
//!   the serial index and batch cache
//!
//! Wire-format types (`RawTemplate` and the response envelopes) also live
//! here; they are crate-private and only the gateway touches them.

pub mod scope;
pub mod template;

pub use scope::{ReligionFilter, Scope, ALL_RELIGIONS};
pub use template::{Axis, ResourceType, TemplateMedia, TemplateRecord};

pub(crate) use template::{LatestEnvelope, ListEnvelope, RawTemplate, SingleEnvelope};
