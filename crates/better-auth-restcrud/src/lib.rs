// better-auth-restcrud — storage adapter backed by a generated REST CRUD API.
//
// Lets an auth framework persist users, sessions, verification tokens and
// accounts through a codegen-produced CRUD backend (the
// `filter=field||op||value` convention) instead of a database driver. The
// adapter translates field names and record shapes in both directions,
// absorbs the backend's response-wrapper variability, and routes each
// storage operation onto the cheapest REST call that can serve it.

pub mod adapter;
pub mod client;
pub mod config;
pub mod email;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod models;
pub mod naming;
pub mod normalize;
pub mod ops;
pub mod query;

pub use adapter::{BulkFailure, BulkResult, RestCrudAdapter, StorageAdapter};
pub use client::{HttpTransport, RestClient};
pub use config::{RestCrudConfig, RetryPolicy};
pub use error::{AdapterError, AdapterResult, ErrorKind, FieldIssue};
pub use query::{Connector, FindManyQuery, Operator, SortBy, SortDirection, WhereClause};
