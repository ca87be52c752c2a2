//! Declarative API endpoint registry.
//!
//! A service describes itself with a [`ServiceDescriptor`], declares its
//! endpoints on an [`ApiBuilder`] and gets back two things: a
//! [`ReferenceDocument`] describing the public contract, and a
//! [`ServableApi`] whose router dispatches to the attached handlers.
//!
//! ```ignore
//! let descriptor = ServiceDescriptor::builder()
//!     .title("Queue API")
//!     .description("The queue service")
//!     .service_name("queue")
//!     .api_version("v1")
//!     .build()?;
//!
//! let mut api = ApiBuilder::new(descriptor);
//! api.declare(
//!     EntryOptions::get("/task/:taskId")
//!         .name("task")
//!         .title("Get Task Definition")
//!         .description("Fetch a task definition")
//!         .category("Tasks")
//!         .no_scopes()
//!         .output("task.yml")
//!         .handler(get_task),
//! )?;
//!
//! println!("{}", api.reference().to_json_pretty()?);
//! let router = api.build(ServeOptions::new("https://tc.example.com")).await?.router();
//! ```

pub mod builtin;
pub mod config;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod reference;
pub mod registry;
pub mod route;
pub mod schema_path;
pub mod scopes;
pub mod serve;
pub mod stability;
pub mod validator;
pub mod version;

pub use builtin::Builtin;
pub use config::{ApiManifest, ConfigLoadError, load_manifest, parse_manifest};
pub use descriptor::{DEFAULT_ERROR_CODES, ServiceDescriptor, ServiceDescriptorBuilder};
pub use entry::{BLOB, EndpointEntry, EntryHandler, EntryOptions, Output};
pub use error::{DeclarationErrors, Error, Result};
pub use reference::{REFERENCE_SCHEMA, ReferenceDocument, ReferenceEntry};
pub use registry::ApiBuilder;
pub use route::{CleanRoute, RouteError, clean_route_and_params};
pub use schema_path::{SchemaPathError, resolve_schema_path};
pub use scopes::{ScopeExpression, ScopeExpressionValidator, TemplateValidator};
pub use serve::{ApiContext, SchemaSet, SchemaValidator, ServableApi, ServeOptions};
pub use stability::Stability;
pub use validator::ParamValidator;
pub use version::{VersionCache, VersionError};
