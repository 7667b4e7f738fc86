//! # Render graph
//!
//! The render graph proper (spec §2-§4): attachment registry, pass DAG,
//! graph analyzer, pass resolver, and pass builder, coordinated by the
//! [`Renderer`] aggregate root.

mod analyzer;
mod attachment;
mod builder;
mod dag;
mod error;
mod pass;
mod renderer;
mod resolver;

pub use attachment::{Attachment, AttachmentDesc, AttachmentIndex, Backing, ImageAttachment, ResolvedExtent, SizeSpec, WindowAttachment};
pub use builder::{BuildState, RebuildFlags};
pub use error::{GraphError, GraphResult};
pub use pass::{
    AccessMask, AspectMask, BlendDesc, BuildHandle, ClearValue, Consumption, ConsumptionRef, ConsumptionState,
    DependencyCommand, DependencyObjectId, Layout, Pass, PassId, PassKind, Rect2D, RenderPassExtra, RenderState,
    ResourceRef, Swizzle, ViewDescription, ViewParams, ViewType,
};
pub use renderer::{Renderer, StaleResource};
