//! Conversation engine - graph-driven turn orchestration
//!
//! This crate is the "brain" of the syllabus system. Each user turn runs
//! through a directed graph of nodes:
//!
//! 1. **Catalog load** - snapshot the course catalog and trim history
//! 2. **Routing** (`router`) - classify intent, model-assisted with a
//!    deterministic keyword fallback
//! 3. **Approval gate** - suspend bulk enrollments for human sign-off
//! 4. **Intent handlers** (`handlers`) - discovery, enrollment,
//!    recommendation, general Q&A
//! 5. **Orchestrator-worker** (`orchestrator`) - decompose complex queries
//!    and fan subtasks out concurrently
//! 6. **Evaluator-optimizer** (`refine`) - score the draft and refine it
//!    until acceptable or the budget runs out
//! 7. **Suggestions** - deterministic follow-up prompts
//!
//! # Key Types
//!
//! - `AgentRuntime` - the per-process entry point (see `runtime` module)
//! - `ModelGateway` - pluggable dispatch over text-generation backends
//! - `graph::Node` - the explicit state machine the turn walks through
//!
//! # Safety Principle
//!
//! The model is strictly a translator. It never decides which course a
//! message refers to, whether an enrollment happens, or whether a turn needs
//! approval. Those are deterministic decisions made in syllabus-core.

pub mod gateway;
pub mod graph;
pub mod guardrails;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod refine;
pub mod router;
pub mod runtime;

pub use gateway::{ModelBackend, ModelGateway};
pub use runtime::{AgentRuntime, TurnEvent, TurnOutcome, TurnRequest};
