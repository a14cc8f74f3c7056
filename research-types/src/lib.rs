//! # research-types — shared data model for research-core
//!
//! This crate defines the entities described in the core specification's
//! data model (manifest, plan, search, symbols, CAS keys, budgets, tool
//! calls, claims, loop state, sandbox results) plus the two abstract
//! capability traits ([`RemoteReasoner`] and [`ScholarProvider`]) that let
//! the rest of the workspace depend on protocol boundaries rather than
//! concrete network adapters.
//!
//! Every type here is a plain data record or a narrow trait. No I/O, no
//! business logic — those live in the component crates that depend on this
//! one.

pub mod budget;
pub mod cas;
pub mod claim;
pub mod exec;
pub mod manifest;
pub mod plan;
pub mod reasoner;
pub mod scholar;
pub mod search;
pub mod state;
pub mod symbol;
pub mod tool;

pub use budget::AgentBudget;
pub use cas::{BlobKey, BlobMeta};
pub use claim::Claim;
pub use exec::ExecResult;
pub use manifest::ManifestEntry;
pub use plan::PlanStage;
pub use reasoner::{NullReasoner, ReasonerError, ReasonerReply, ReasonerToolCall, RemoteReasoner};
pub use scholar::{PaperMeta, ScholarError, ScholarProvider};
pub use search::SearchHit;
pub use state::LoopState;
pub use symbol::{SymbolDef, SymbolUse};
pub use tool::{ToolCall, ToolResult};
