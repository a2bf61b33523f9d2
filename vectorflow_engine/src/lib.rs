/*!
# Vectorflow Engine

GPU vector graphics render context for atomic-coverage rasterization.

The upstream geometry emitter fills ring-buffered GPU data (paths, paints,
contours, gradient spans, tessellation spans, triangles) and hands one
`FlushDescriptor` per frame to the `RenderContext`, which records uploads,
gradient and tessellation passes, ordered draw batches and the final resolve
into a single command list.

## Architecture

- **GraphicsDevice**: Backend trait creating buffers, textures, pipelines and command lists
- **CommandList**: Backend trait recording uploads, transitions, passes and draws
- **RenderContext**: Owns the rings and frame textures, executes `flush`
- **RenderTarget**: Per-surface coverage, clip and scratch color resources
- **Engine**: Global singleton holding the live render context and the logger

Backend implementations provide concrete types that implement the device traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod render_context;
pub mod resource;

// Main vectorflow namespace module
pub mod vectorflow {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton and renderer lifecycle
    pub use crate::engine::{Engine, Lifecycle, ReadyCallback};

    // Graphics device traits
    pub use crate::graphics_device::GraphicsDevice;

    // Logging types; the engine_* macros live at the crate root
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend-facing device sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Render sub-module with the render context and flush types
    pub mod render {
        pub use crate::render_context::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }
}

// Re-export math library at crate root
pub use glam;
