//! # Backend collaborator interfaces
//!
//! Everything in this module is an interface this crate *consumes*, never
//! implements (spec §1, §6): the window abstraction, the heap allocator,
//! the pipeline cache, dependency objects, and the technique/descriptor
//! reflection layer. Concrete implementations live outside this core.

pub mod commands;
pub mod dependency;
pub mod heap;
pub mod pipeline_cache;
pub mod technique;
pub mod window;

pub use commands::{CommandRecorder, CopyCommand};
pub use dependency::{DependencyObject, Injection};
pub use heap::{AllocationId, HeapAllocator, ImageDesc, MemoryFlags};
pub use pipeline_cache::{PipelineCache, RenderPassDesc, RenderPassKey, SubpassDesc};
pub use technique::TechniqueLayer;
pub use window::{SwapLock, WindowBacking};
