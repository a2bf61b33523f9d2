/// Render context module - buffer rings, render targets and the flush algorithm

pub mod buffer_ring;
pub mod render_target;
pub mod flush_descriptor;
pub mod draw_dispatch;
pub mod gpu_data;
pub mod image_decode;
pub mod render_context;

pub use buffer_ring::{BufferRing, BufferRingKind};
pub use render_target::RenderTarget;
pub use flush_descriptor::{
    ShaderFeatures, DrawType, LoadAction, StorageBufferStructure, ImageMeshBuffers, DrawBatch,
    FlushDescriptor, FlushStats,
};
pub use draw_dispatch::{
    DrawTypeInfo, GeometrySource, Instancing, draw_type_info, permutation_for_features,
};
pub use gpu_data::{
    GradientSpan, TessVertexSpan, TriangleVertex, PatchVertex, ImageRectVertex,
    GRAD_TEXTURE_WIDTH, TESS_TEXTURE_WIDTH, BUFFER_RING_SIZE,
};
pub use image_decode::{
    EncodedImageFormat, DecodedImage, WebpDecodeOptions, ImageCodec, DefaultImageCodec,
    sniff_image_format, decode_image,
};
pub use render_context::{RenderContext, RenderContextConfig, PlatformFeatures, UNIFORM_BLOCK_SIZE};
