//! Request-scoped context module.
//!
//! Provides the `RequestContext` and `CurrentUser` extractors that bundle
//! request-scoped state to complement application-scoped `AppState`.

mod extractor;
mod types;

pub use types::{CurrentUser, RequestContext, USER_ID_HEADER};
