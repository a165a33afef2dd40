//! Response specifications and response construction.
//!
//! - `spec` - What a route declares it responds with ([`ResponseSpec`])
//! - `builder` - The concrete [`MockResponse`] and how one is built from a
//!   resolved [`ResponseConfig`]

mod builder;
mod spec;

pub use builder::{MockResponse, ResponseBuilder, ResponseKind};
pub(crate) use builder::{construct_response, ResponseSettings};
pub use spec::{BodySpec, ResolverFn, ResponseConfig, ResponseSpec};
