#![allow(dead_code)]
//! Headless graphics device for integration tests
//!
//! Implements the device traits on the CPU: buffers keep their bytes, texture
//! updates and draws are counted, and every recorded command is logged by
//! name. No GPU or window is required, so each test can build its own device.

use vectorflow_engine::vectorflow::{Error, Result};
use vectorflow_engine::vectorflow::device::{
    Binding, Buffer, BufferDesc, BufferUsage, CommandList, Config, GraphicsDevice, IndexType, IndexedDraw,
    Pipeline, PipelineDesc, RenderPassDesc, ResourceState, StorageView, Texture, TextureDesc, TextureFormat,
    TextureInfo, TextureRegion, TextureUsage, Viewport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// RESOURCES
// ============================================================================

pub struct HeadlessBuffer {
    id: u64,
    size: u64,
    usage: BufferUsage,
    stride: u32,
    label: String,
}

impl Buffer for HeadlessBuffer {
    fn id(&self) -> u64 { self.id }
    fn size(&self) -> u64 { self.size }
    fn usage(&self) -> BufferUsage { self.usage }
    fn stride(&self) -> u32 { self.stride }
    fn label(&self) -> &str { &self.label }
}

pub struct HeadlessTexture {
    id: u64,
    info: TextureInfo,
}

impl Texture for HeadlessTexture {
    fn id(&self) -> u64 { self.id }
    fn info(&self) -> &TextureInfo { &self.info }
}

pub struct HeadlessStorageView {
    id: u64,
    texture: Arc<dyn Texture>,
}

impl StorageView for HeadlessStorageView {
    fn id(&self) -> u64 { self.id }
    fn texture(&self) -> &Arc<dyn Texture> { &self.texture }
}

pub struct HeadlessPipeline {
    id: u64,
    desc: PipelineDesc,
}

impl Pipeline for HeadlessPipeline {
    fn id(&self) -> u64 { self.id }
    fn desc(&self) -> &PipelineDesc { &self.desc }
}

// ============================================================================
// COMMAND LIST
// ============================================================================

#[derive(Default)]
struct Recording {
    names: Vec<String>,
    writes: Vec<(u64, u64, Vec<u8>)>,
}

/// Records command names; `end` stages the recording on the device until `submit`
pub struct HeadlessCommandList {
    recording: Recording,
    open: bool,
    state: Arc<Mutex<DeviceState>>,
}

impl HeadlessCommandList {
    fn push(&mut self, name: impl Into<String>) -> Result<()> {
        if !self.open {
            return Err(Error::BackendError("command recorded outside begin/end".to_string()));
        }
        self.recording.names.push(name.into());
        Ok(())
    }
}

impl CommandList for HeadlessCommandList {
    fn begin(&mut self) -> Result<()> {
        self.recording = Recording::default();
        self.open = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.open = false;
        let recording = std::mem::take(&mut self.recording);
        self.state.lock().unwrap().staged.push(recording);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > buffer.size() {
            return Err(Error::BackendError(format!("write overflows '{}'", buffer.label())));
        }
        self.push(format!("write:{}", buffer.label()))?;
        self.recording.writes.push((buffer.id(), offset, data.to_vec()));
        Ok(())
    }

    fn transition(&mut self, _texture: &Arc<dyn Texture>, _from: ResourceState, _to: ResourceState) -> Result<()> {
        self.push("transition")
    }

    fn storage_barrier(&mut self, _view: &Arc<dyn StorageView>) -> Result<()> {
        self.push("barrier")
    }

    fn clear_storage_uint(&mut self, _view: &Arc<dyn StorageView>, _value: [u32; 4]) -> Result<()> {
        self.push("clear_uint")
    }

    fn clear_storage_float(&mut self, _view: &Arc<dyn StorageView>, _value: [f32; 4]) -> Result<()> {
        self.push("clear_float")
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()> {
        self.push(format!("pass:{}", desc.label))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push("end_pass")
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.push("viewport")
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(format!("pipeline:{:?}", pipeline.desc().program))
    }

    fn set_bindings(&mut self, _bindings: &[Binding]) -> Result<()> {
        self.push("bindings")
    }

    fn set_stream_source(&mut self, _stream: u32, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push("stream")
    }

    fn draw_primitive(&mut self, _base_vertex: u32, primitive_count: u32, instance_count: u32) -> Result<()> {
        self.push(format!("draw:{}x{}", primitive_count, instance_count))
    }

    fn draw_indexed_primitive(
        &mut self,
        _index_buffer: &Arc<dyn Buffer>,
        _index_type: IndexType,
        draw: IndexedDraw,
    ) -> Result<()> {
        self.push(format!("draw_indexed:{}x{}", draw.primitive_count, draw.instance_count))
    }

    fn update_texture_2d(
        &mut self,
        _texture: &Arc<dyn Texture>,
        region: TextureRegion,
        _row_pitch: u32,
        _data: &[u8],
    ) -> Result<()> {
        self.push(format!("update_texture:{}x{}", region.width, region.height))
    }
}

// ============================================================================
// DEVICE
// ============================================================================

#[derive(Default)]
struct DeviceState {
    buffers: HashMap<u64, Vec<u8>>,
    staged: Vec<Recording>,
    submitted: Vec<String>,
    textures_created: usize,
}

/// CPU-side `GraphicsDevice`
pub struct HeadlessDevice {
    next_id: AtomicU64,
    state: Arc<Mutex<DeviceState>>,
    config: Config,
}

impl HeadlessDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            state: Arc::new(Mutex::new(DeviceState::default())),
            config: Config {
                app_name: "headless".to_string(),
                ..Config::default()
            },
        })
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Names of every submitted command, in submission order
    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn clear_submitted(&self) {
        self.state.lock().unwrap().submitted.clear();
    }

    pub fn textures_created(&self) -> usize {
        self.state.lock().unwrap().textures_created
    }

    /// Create a destination surface usable as a render target
    pub fn surface(&self, width: u32, height: u32) -> Arc<dyn Texture> {
        self.create_texture(TextureDesc {
            width,
            height,
            mip_levels: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: TextureUsage::STORAGE | TextureUsage::RENDER_TARGET,
            label: "surface".to_string(),
            data: None,
        }).unwrap()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("buffer '{}' has zero size", desc.label)));
        }
        let id = self.allocate_id();
        let mut contents = vec![0u8; desc.size as usize];
        if let Some(data) = &desc.data {
            contents[..data.len()].copy_from_slice(data);
        }
        self.state.lock().unwrap().buffers.insert(id, contents);
        Ok(Arc::new(HeadlessBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            stride: desc.stride,
            label: desc.label,
        }))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        self.state.lock().unwrap().textures_created += 1;
        Ok(Arc::new(HeadlessTexture {
            id: self.allocate_id(),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                mip_levels: desc.mip_levels,
                format: desc.format,
                usage: desc.usage,
            },
        }))
    }

    fn create_storage_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn StorageView>> {
        if !texture.info().usage.contains(TextureUsage::STORAGE) {
            return Err(Error::InvalidResource("storage view over a non-storage texture".to_string()));
        }
        Ok(Arc::new(HeadlessStorageView { id: self.allocate_id(), texture: texture.clone() }))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(HeadlessPipeline { id: self.allocate_id(), desc }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(HeadlessCommandList {
            recording: Recording::default(),
            open: false,
            state: self.state.clone(),
        }))
    }

    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let staged = std::mem::take(&mut state.staged);
        if staged.len() < commands.len() {
            return Err(Error::BackendError("submitted a command list that was never ended".to_string()));
        }
        for recording in staged {
            for (id, offset, data) in recording.writes {
                if let Some(contents) = state.buffers.get_mut(&id) {
                    let start = offset as usize;
                    contents[start..start + data.len()].copy_from_slice(&data);
                }
            }
            state.submitted.extend(recording.names);
        }
        Ok(())
    }

    fn read_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<Vec<u8>> {
        self.state.lock().unwrap()
            .buffers
            .get(&buffer.id())
            .cloned()
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer '{}'", buffer.label())))
    }

    fn config(&self) -> &Config {
        &self.config
    }
}
