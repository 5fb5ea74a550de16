pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod query;
pub mod resolve;

pub use config::Config;
pub use error::{LexigraphError, Result};
pub use graph::{Entity, KnowledgeGraph, Relation};
pub use query::{QueryEngine, QueryResponse};
