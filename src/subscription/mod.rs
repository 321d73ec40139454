//! Subscription merging subsystem.
//!
//! # Data Flow
//! ```text
//! Vec<Source> (from the store)
//!     → fetcher.rs (GET + YAML parse per source, failures → empty)
//!     → merger.rs (ordered aggregation, group synthesis)
//!     → document.rs (MergedDocument → YAML text)
//! ```
//!
//! # Design Decisions
//! - Proxies are opaque ordered mappings; only `name` is read
//! - The base template is deep-copied per merge, never mutated
//! - Merge-level failure is a typed error; per-source failure is a log line

pub mod document;
pub mod fetcher;
pub mod merger;
pub mod model;
pub mod source;
pub mod template;

pub use document::{serialize, MergedDocument, SerializeError};
pub use fetcher::{FetchOutcome, HttpClient, HttpResponse, ReqwestClient, SourceFetcher, TransportError};
pub use merger::{ConfigMerger, MergeError, MergeSettings};
pub use model::{GroupKind, Proxy, SelectionGroup};
pub use source::{Source, SourceError};
pub use template::{load_template, TemplateError};
