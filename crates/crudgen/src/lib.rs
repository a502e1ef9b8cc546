//! # crudgen
//!
//! Schema-driven CRUD scaffolding. For every table of a database schema
//! the generator produces a set of client modules (typed assets, store,
//! api client, Vue components) and serves them to a bundler as virtual
//! modules. Server-side it writes a routes manifest, an api bundle and a
//! handler stub per table, then keeps everything in sync as templates,
//! schemas and api handler files change.
//!
//! ## Architecture
//!
//! ```text
//!  schema declarations        api handler files        templates
//!          │                         │                     │
//!          ▼                         ▼                     │
//! ┌──────────────────┐      ┌──────────────────┐           │
//! │  Table Resolver  │─────▶│ Source Analyzer  │           │
//! │ (decls → tables) │      │  (file → types)  │           │
//! └────────┬─────────┘      └────────┬─────────┘           │
//!          │                         ▼                     │
//!          │                ┌──────────────────┐           │
//!          │                │  Module Factory  │◀──────────┘
//!          │                │ (table → modules)│
//!          ▼                └────────┬─────────┘
//!  manifest, api bundle              ▼
//!                           ┌──────────────────┐
//!                           │   Module Host    │  resolve / load / transform
//!                           └──────────────────┘
//! ```
//!
//! A watch map ties every input file to the handler that regenerates from
//! it; handlers run in a fixed order (templates, schemas, api files).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crudgen::{BundlerConfig, Generator, GeneratorConfig, ModuleHost, WorkerPool};
//!
//! let config = GeneratorConfig::load_from_path("crudgen.toml".as_ref())?;
//! let base = config.base.clone();
//! let pool = WorkerPool::spawn(vec![Generator::from_config(config)?]);
//!
//! let mut host = ModuleHost::connect(pool.handle(base)).await?;
//! host.config_resolved(BundlerConfig::default()).await?;
//!
//! if let Some(id) = host.resolve_id("crud:products/store") {
//!     let loaded = host.load(&id);
//! }
//! ```

pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod frontend;
pub mod generator;
pub mod host;
pub mod paths;
pub mod render;
pub mod resolve;
pub mod schema;
pub mod templates;
pub mod watch;
pub mod worker;

pub use codegen::manifest::MetaFn;
pub use codegen::{AvModule, ModuleMap};
pub use config::{BundlerConfig, GeneratorConfig};
pub use diagnostic::GeneratorError;
pub use generator::{Generator, HandlerRun};
pub use host::{FileWatcher, LoadResult, ModuleHost, TransformResult};
pub use resolve::{Table, TableFilter};
pub use schema::{Introspector, JsonIntrospector, TableDeclaration};
pub use templates::TemplateName;
pub use watch::WatchCategory;
pub use worker::{PoolHandle, Task, WorkerPool};
