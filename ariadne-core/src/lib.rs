//! Ariadne core library: the canvas store, streamed answers, and exporters.
//!
//! The main entry point is [`orchestrator::Orchestrator`], which ties the
//! [`store::CanvasStore`], the [`layout`] allocator and the
//! [`stream::StreamingPipeline`] together to grow a tree of Q&A nodes.

pub mod anchor;
pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod llm;
pub mod orchestrator;
pub mod store;
pub mod stream;
pub mod types;
