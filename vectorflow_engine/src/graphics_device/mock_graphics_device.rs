/// Mock graphics device for unit tests (no GPU required)
///
/// Every command recorded through a `MockCommandList` is kept in a typed log.
/// Ended lists are staged on the device and moved to the submission log by
/// `submit`, which also applies their buffer writes so tests can read them back.

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::engine_bail;
use crate::graphics_device::{
    GraphicsDevice, Config, Buffer, BufferDesc, BufferUsage, Texture, TextureDesc, TextureInfo,
    StorageView, Pipeline, PipelineDesc, CommandList, ResourceState, RenderPassDesc, LoadOp,
    Viewport, Binding, BindingSlot, IndexType, IndexedDraw, TextureRegion, ShaderProgram,
    ShaderPermutation, PrimitiveTopology, BlendMode,
};

// ============================================================================
// Recorded commands
// ============================================================================

/// One command as seen by the mock device. Resources are identified by label.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin,
    End,
    WriteBuffer { buffer: String, offset: u64, len: usize },
    Transition { texture: String, from: ResourceState, to: ResourceState },
    StorageBarrier { texture: String },
    ClearStorageUint { texture: String, value: [u32; 4] },
    ClearStorageFloat { texture: String, value: [f32; 4] },
    BeginRenderPass { label: String, color_target: Option<String>, load_op: LoadOp, width: u32, height: u32 },
    EndRenderPass,
    SetViewport(Viewport),
    BindPipeline { program: ShaderProgram, topology: PrimitiveTopology, blend: BlendMode, permutation: ShaderPermutation },
    SetBindings { slots: Vec<BindingSlot> },
    SetStreamSource { stream: u32, buffer: String, offset: u64 },
    DrawPrimitive { base_vertex: u32, primitive_count: u32, instance_count: u32 },
    DrawIndexedPrimitive { index_buffer: String, index_type: IndexType, draw: IndexedDraw },
    UpdateTexture2D { texture: String, region: TextureRegion, row_pitch: u32, len: usize },
}

impl RecordedCommand {
    /// True for both draw commands
    pub fn is_draw(&self) -> bool {
        matches!(self, RecordedCommand::DrawPrimitive { .. } | RecordedCommand::DrawIndexedPrimitive { .. })
    }
}

struct PendingWrite {
    buffer: u64,
    offset: u64,
    data: Vec<u8>,
}

struct EndedList {
    commands: Vec<RecordedCommand>,
    writes: Vec<PendingWrite>,
}

/// Shared state of a mock device
#[derive(Default)]
pub struct MockDeviceState {
    next_id: u64,
    buffer_contents: FxHashMap<u64, Vec<u8>>,
    ended: Vec<EndedList>,
    /// Labels of every buffer created, in creation order
    pub buffer_labels: Vec<String>,
    /// Label and info of every texture created, in creation order
    pub textures: Vec<(String, TextureInfo)>,
    /// Number of pipelines created
    pub pipeline_count: usize,
    /// Make `create_texture` fail with `Error::OutOfMemory`
    pub fail_texture_creation: bool,
    /// Submitted command lists, in submission order
    pub submissions: Vec<Vec<RecordedCommand>>,
}

impl MockDeviceState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

// ============================================================================
// Mock resources
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub id: u64,
    pub size: u64,
    pub usage: BufferUsage,
    pub stride: u32,
    pub label: String,
}

impl Buffer for MockBuffer {
    fn id(&self) -> u64 { self.id }
    fn size(&self) -> u64 { self.size }
    fn usage(&self) -> BufferUsage { self.usage }
    fn stride(&self) -> u32 { self.stride }
    fn label(&self) -> &str { &self.label }
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: u64,
    pub info: TextureInfo,
    pub label: String,
}

impl MockTexture {
    pub fn new(id: u64, info: TextureInfo, label: impl Into<String>) -> Self {
        Self { id, info, label: label.into() }
    }
}

impl Texture for MockTexture {
    fn id(&self) -> u64 { self.id }
    fn info(&self) -> &TextureInfo { &self.info }
}

pub struct MockStorageView {
    pub id: u64,
    pub texture: Arc<dyn Texture>,
}

impl StorageView for MockStorageView {
    fn id(&self) -> u64 { self.id }
    fn texture(&self) -> &Arc<dyn Texture> { &self.texture }
}

pub struct MockPipeline {
    pub id: u64,
    pub desc: PipelineDesc,
}

impl Pipeline for MockPipeline {
    fn id(&self) -> u64 { self.id }
    fn desc(&self) -> &PipelineDesc { &self.desc }
}

// ============================================================================
// Mock command list
// ============================================================================

pub struct MockCommandList {
    pub commands: Vec<RecordedCommand>,
    writes: Vec<PendingWrite>,
    state: Arc<Mutex<MockDeviceState>>,
    texture_labels: Arc<Mutex<FxHashMap<u64, String>>>,
    recording: bool,
}

impl MockCommandList {
    fn texture_label(&self, texture: &Arc<dyn Texture>) -> String {
        self.texture_labels.lock().unwrap()
            .get(&texture.id())
            .cloned()
            .unwrap_or_else(|| format!("texture#{}", texture.id()))
    }

    fn record(&mut self, command: RecordedCommand) -> Result<()> {
        if !self.recording {
            engine_bail!("vectorflow::MockCommandList", "command {:?} recorded outside begin/end", command);
        }
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.recording = true;
        self.commands.push(RecordedCommand::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.record(RecordedCommand::End)?;
        self.recording = false;
        let ended = EndedList {
            commands: std::mem::take(&mut self.commands),
            writes: std::mem::take(&mut self.writes),
        };
        self.state.lock().unwrap().ended.push(ended);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > buffer.size() {
            engine_bail!(
                "vectorflow::MockCommandList",
                "write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(), offset, buffer.label(), buffer.size()
            );
        }
        self.record(RecordedCommand::WriteBuffer {
            buffer: buffer.label().to_string(),
            offset,
            len: data.len(),
        })?;
        self.writes.push(PendingWrite { buffer: buffer.id(), offset, data: data.to_vec() });
        Ok(())
    }

    fn transition(&mut self, texture: &Arc<dyn Texture>, from: ResourceState, to: ResourceState) -> Result<()> {
        let texture = self.texture_label(texture);
        self.record(RecordedCommand::Transition { texture, from, to })
    }

    fn storage_barrier(&mut self, view: &Arc<dyn StorageView>) -> Result<()> {
        let texture = self.texture_label(view.texture());
        self.record(RecordedCommand::StorageBarrier { texture })
    }

    fn clear_storage_uint(&mut self, view: &Arc<dyn StorageView>, value: [u32; 4]) -> Result<()> {
        let texture = self.texture_label(view.texture());
        self.record(RecordedCommand::ClearStorageUint { texture, value })
    }

    fn clear_storage_float(&mut self, view: &Arc<dyn StorageView>, value: [f32; 4]) -> Result<()> {
        let texture = self.texture_label(view.texture());
        self.record(RecordedCommand::ClearStorageFloat { texture, value })
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()> {
        let color_target = desc.color_target.as_ref().map(|t| self.texture_label(t));
        self.record(RecordedCommand::BeginRenderPass {
            label: desc.label.clone(),
            color_target,
            load_op: desc.load_op,
            width: desc.width,
            height: desc.height,
        })
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record(RecordedCommand::EndRenderPass)
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(RecordedCommand::SetViewport(viewport))
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let desc = pipeline.desc();
        self.record(RecordedCommand::BindPipeline {
            program: desc.program,
            topology: desc.topology,
            blend: desc.blend,
            permutation: desc.permutation.clone(),
        })
    }

    fn set_bindings(&mut self, bindings: &[Binding]) -> Result<()> {
        let slots = bindings.iter().map(|b| b.slot).collect();
        self.record(RecordedCommand::SetBindings { slots })
    }

    fn set_stream_source(&mut self, stream: u32, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.record(RecordedCommand::SetStreamSource {
            stream,
            buffer: buffer.label().to_string(),
            offset,
        })
    }

    fn draw_primitive(&mut self, base_vertex: u32, primitive_count: u32, instance_count: u32) -> Result<()> {
        self.record(RecordedCommand::DrawPrimitive { base_vertex, primitive_count, instance_count })
    }

    fn draw_indexed_primitive(
        &mut self,
        index_buffer: &Arc<dyn Buffer>,
        index_type: IndexType,
        draw: IndexedDraw,
    ) -> Result<()> {
        self.record(RecordedCommand::DrawIndexedPrimitive {
            index_buffer: index_buffer.label().to_string(),
            index_type,
            draw,
        })
    }

    fn update_texture_2d(
        &mut self,
        texture: &Arc<dyn Texture>,
        region: TextureRegion,
        row_pitch: u32,
        data: &[u8],
    ) -> Result<()> {
        let texture = self.texture_label(texture);
        self.record(RecordedCommand::UpdateTexture2D { texture, region, row_pitch, len: data.len() })
    }
}

// ============================================================================
// Mock graphics device
// ============================================================================

pub struct MockGraphicsDevice {
    state: Arc<Mutex<MockDeviceState>>,
    texture_labels: Arc<Mutex<FxHashMap<u64, String>>>,
    config: Config,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDeviceState::default())),
            texture_labels: Arc::new(Mutex::new(FxHashMap::default())),
            config: Config::default(),
        }
    }

    /// Lock the shared device state
    pub fn state(&self) -> MutexGuard<'_, MockDeviceState> {
        self.state.lock().unwrap()
    }

    /// All submitted commands, flattened in submission order
    pub fn submitted_commands(&self) -> Vec<RecordedCommand> {
        self.state().submissions.iter().flatten().cloned().collect()
    }

    /// Number of `submit` calls that carried at least one list
    pub fn submission_count(&self) -> usize {
        self.state().submissions.len()
    }

    /// Drop the submission log (resource bookkeeping is kept)
    pub fn clear_submissions(&self) {
        self.state().submissions.clear();
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            engine_bail!("vectorflow::MockGraphicsDevice", "buffer '{}' has zero size", desc.label);
        }
        let mut state = self.state();
        let id = state.allocate_id();
        let mut contents = vec![0u8; desc.size as usize];
        if let Some(data) = &desc.data {
            contents[..data.len()].copy_from_slice(data);
        }
        state.buffer_contents.insert(id, contents);
        state.buffer_labels.push(desc.label.clone());

        Ok(Arc::new(MockBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            stride: desc.stride,
            label: desc.label,
        }))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        let info = TextureInfo {
            width: desc.width,
            height: desc.height,
            mip_levels: desc.mip_levels,
            format: desc.format,
            usage: desc.usage,
        };
        if let Some(data) = &desc.data {
            if (data.len() as u64) < info.byte_size() {
                engine_bail!(
                    "vectorflow::MockGraphicsDevice",
                    "texture '{}' initial data is {} bytes, expected {}",
                    desc.label, data.len(), info.byte_size()
                );
            }
        }
        let mut state = self.state();
        if state.fail_texture_creation {
            return Err(Error::OutOfMemory);
        }
        let id = state.allocate_id();
        state.textures.push((desc.label.clone(), info.clone()));
        self.texture_labels.lock().unwrap().insert(id, desc.label.clone());

        Ok(Arc::new(MockTexture::new(id, info, desc.label)))
    }

    fn create_storage_view(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn StorageView>> {
        if !texture.info().usage.contains(crate::graphics_device::TextureUsage::STORAGE) {
            engine_bail!("vectorflow::MockGraphicsDevice", "texture #{} lacks STORAGE usage", texture.id());
        }
        let id = self.state().allocate_id();
        Ok(Arc::new(MockStorageView { id, texture: texture.clone() }))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let mut state = self.state();
        let id = state.allocate_id();
        state.pipeline_count += 1;
        Ok(Arc::new(MockPipeline { id, desc }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            commands: Vec::new(),
            writes: Vec::new(),
            state: self.state.clone(),
            texture_labels: self.texture_labels.clone(),
            recording: false,
        }))
    }

    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()> {
        let mut state = self.state();
        let ended = std::mem::take(&mut state.ended);
        if ended.len() < commands.len() {
            engine_bail!(
                "vectorflow::MockGraphicsDevice",
                "{} command list(s) submitted but only {} ended",
                commands.len(), ended.len()
            );
        }
        for list in ended {
            for write in list.writes {
                if let Some(contents) = state.buffer_contents.get_mut(&write.buffer) {
                    let start = write.offset as usize;
                    contents[start..start + write.data.len()].copy_from_slice(&write.data);
                }
            }
            state.submissions.push(list.commands);
        }
        Ok(())
    }

    fn read_buffer(&self, buffer: &Arc<dyn Buffer>) -> Result<Vec<u8>> {
        match self.state().buffer_contents.get(&buffer.id()) {
            Some(contents) => Ok(contents.clone()),
            None => engine_bail!("vectorflow::MockGraphicsDevice", "unknown buffer '{}'", buffer.label()),
        }
    }

    fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
