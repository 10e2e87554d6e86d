//! tierflow Cloud Resource Graph
//!
//! This crate provides the declarative core that tierflow components build
//! on: resource references, an order-checked resource graph, named exports,
//! and the parameter store contract exports are published through.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  tier CLI                        │
//! │          (tier synth / exports / publish)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               tierflow-aws                       │
//! │   network / security / identity / edge / ...     │
//! │   TopologyOrchestrator (component DAG)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ declare(Resource) -> ResourceRef
//! ┌─────────────────▼───────────────────────────────┐
//! │               tierflow-cloud                     │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────┐ │
//! │  │ResourceGraph │ │ExportRegistry│ │   Dag    │ │
//! │  └──────────────┘ └──────┬───────┘ └──────────┘ │
//! └──────────────────────────┼──────────────────────┘
//!                            │ publish()
//!                   ┌────────▼────────┐
//!                   │ ParameterStore  │
//!                   └─────────────────┘
//! ```

pub mod dag;
pub mod error;
pub mod export;
pub mod graph;
pub mod publish;
pub mod reference;
pub mod resource;
pub mod store;

// Re-exports
pub use dag::Dag;
pub use error::{CloudError, Result};
pub use export::{ExportRegistry, NamedExport, export_path};
pub use graph::ResourceGraph;
pub use publish::{PublishOutcome, PublishResult, publish};
pub use reference::{Accessor, Deferred, RefMap, ResourceRef, build_table, to_logical_id};
pub use resource::{RemovalPolicy, Resource};
pub use store::{FileParameterStore, ParameterStore, StoredParameter};
