/// Buffer trait and buffer descriptor

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex stream source
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Structured storage buffer read through a shader resource view
    Storage,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Element stride in bytes (0 = unstructured)
    pub stride: u32,
    /// Debug label
    pub label: String,
    /// Optional immutable contents uploaded at creation time
    pub data: Option<Vec<u8>>,
}

impl BufferDesc {
    /// Dynamic buffer with no initial contents
    pub fn new(label: impl Into<String>, size: u64, usage: BufferUsage, stride: u32) -> Self {
        Self {
            size,
            usage,
            stride,
            label: label.into(),
            data: None,
        }
    }

    /// Static buffer created from `data`
    pub fn with_data(label: impl Into<String>, usage: BufferUsage, stride: u32, data: Vec<u8>) -> Self {
        Self {
            size: data.len() as u64,
            usage,
            stride,
            label: label.into(),
            data: Some(data),
        }
    }
}

/// Vertex attribute data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,
    R32G32B32A32_UINT,
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT | BufferFormat::R32_UINT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT | BufferFormat::R32G32B32A32_UINT => 16,
        }
    }
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types. Contents are written through
/// `CommandList::write_buffer`; the buffer is destroyed when the last `Arc`
/// drops.
pub trait Buffer: Send + Sync {
    /// Backend-unique identifier
    fn id(&self) -> u64;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage the buffer was created with
    fn usage(&self) -> BufferUsage;

    /// Element stride in bytes
    fn stride(&self) -> u32;

    /// Debug label
    fn label(&self) -> &str;
}

impl std::fmt::Debug for dyn Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("size", &self.size())
            .finish()
    }
}
