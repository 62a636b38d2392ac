//! Generic JSON resource API layer.
//!
//! A [`Resource`] couples a [`ResourceDescriptor`] (name, projected fields,
//! filter and sort whitelists) with a [`CollectionProvider`] and reassignable
//! [`ResourceSettings`]. Requests are dispatched by method and path shape to
//! list, retrieve, create, update or delete, and answered with
//! `{ <name>: payload, meta: {...} }` envelopes.

pub mod descriptor;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod http;
pub mod memory;
pub mod problem;
pub mod projection;
pub mod provider;
pub mod query;
pub mod record;
pub mod resource;
pub mod validation;
pub mod value;

pub use descriptor::{FieldSpec, FilterSpec, OrderSpec, ResourceDescriptor};
pub use dispatcher::{ApiRequest, ApiResponse, Dispatcher, Operation, ResponseBody};
pub use envelope::{Envelope, PageMeta};
pub use error::{ApiError, ValidationFailure};
pub use http::{mount, ResourceRouter};
pub use memory::MemoryProvider;
pub use problem::{Fault, Problem, ProblemResponse};
pub use projection::project;
pub use provider::{CollectionProvider, ExecutedQuery, QueryLog};
pub use query::{FilterPredicate, Lookup, PageRequest, QueryParams, QuerySpec, SortDir, SortDirective};
pub use record::{FieldSource, MemoryRecord};
pub use resource::{Resource, ResourceEndpoint, ResourceSettings, DEFAULT_PER_PAGE};
pub use validation::{CleanedData, FieldErrors, FormField, FormFieldKind, FormValidator, IdRule, Validator};
pub use value::{json_serialize, FieldValue, RecordId, SerializeError};
