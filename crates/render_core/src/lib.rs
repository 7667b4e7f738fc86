//! # render_core
//!
//! The core of a Vulkan-style render graph: a directed acyclic graph of
//! render, inline-compute and async-compute passes, a subpass-merge analyzer,
//! a layout/barrier resolver, a render-pass/framebuffer builder, and an
//! asynchronous host↔device transfer engine.
//!
//! ## Architecture
//!
//! Six components, leaves first:
//! - Attachment Registry — describe/attach/detach/get, size resolution.
//! - Pass DAG — add/erase passes, parent/child bookkeeping, submission order.
//! - Graph Analyzer — subpass-merge scoring and chain linking.
//! - Pass Resolver — layout and barrier propagation.
//! - Pass Builder — native render-pass/framebuffer lifecycle.
//! - [`transfer`] — Transfer Engine: staged host↔device copies.
//!
//! The first five are internal to [`graph::Renderer`], which is the sole
//! entry point exposed to callers. The window abstraction, heap allocator,
//! pipeline cache, dependency objects, technique/descriptor layer, and
//! command-buffer recorder are external collaborators whose interfaces live
//! in [`backend`]; this crate consumes them and never ships a concrete
//! Vulkan implementation of its own.
//!
//! User edits (add pass, consume attachment, attach window, cull) mutate the
//! registry and DAG and mark the graph invalid. On `warmup` or `build`, the
//! analyzer runs, then the resolver, then the builder. The transfer engine
//! operates independently, interacting with the rest only through
//! attachment-backed references and dependency injections.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use render_core::prelude::*;
//!
//! // `heap` and `cache` are collaborators supplied by the embedding engine
//! // (spec §6); this crate only consumes their trait interfaces.
//! let renderer = Renderer::new(heap, cache);
//!
//! let color = AttachmentIndex::new(0);
//! renderer.describe(color, AttachmentDesc::absolute(800, 600, 1))?;
//!
//! let pass = renderer.add_pass(PassKind::RenderPass, 0, &[])?;
//! renderer.consume(pass, color, AccessMask::ATTACHMENT_WRITE, ViewParams::default())?;
//! renderer.build()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod backend;
pub mod core;
pub mod foundation;
pub mod graph;
pub mod transfer;

/// Common imports for render_core users.
pub mod prelude {
    pub use crate::core::config::{ApplicationConfig, Config, EngineConfig, RenderGraphConfig, TransferPoolConfig};
    pub use crate::graph::{
        AccessMask, AspectMask, AttachmentDesc, AttachmentIndex, BlendDesc, ClearValue, GraphError,
        GraphResult, PassId, PassKind, Rect2D, RenderState, Renderer, ViewParams,
    };
    pub use crate::transfer::{TransferEngine, TransferError, TransferFlags, TransferResult};
}
