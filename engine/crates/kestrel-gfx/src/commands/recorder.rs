//! 命令录制接口
//!
//! 资源跟踪器和 render graph 只依赖 [`GfxCommandRecorder`]，
//! 因此既可以录制到真实的 [`GfxCommandBuffer`](super::command_buffer::GfxCommandBuffer)，
//! 也可以录制到内存中的 [`GfxBarrierCapture`] 用于离线检查。

use std::cell::{Ref, RefCell};

use ash::vk;

/// 可以接收同步命令和 debug label 的命令录制对象
pub trait GfxCommandRecorder {
    /// 用于直接通过 ash 录制其他命令；内存中的 recorder 返回 null
    fn vk_handle(&self) -> vk::CommandBuffer;

    /// - command type: synchronize
    /// - supported queue types: graphics, compute, transfer
    fn cmd_pipeline_barrier2(&self, dependency_info: &vk::DependencyInfo<'_>);

    fn begin_label(&self, _label_name: &str, _label_color: glam::Vec4) {}

    fn end_label(&self) {}
}

/// 一次 `cmd_pipeline_barrier2` 的内容，拷贝为 owned 数据
#[derive(Clone, Debug, Default)]
pub struct GfxCapturedBarriers {
    pub dependency_flags: vk::DependencyFlags,
    pub image_barriers: Vec<vk::ImageMemoryBarrier2<'static>>,
    pub buffer_barriers: Vec<vk::BufferMemoryBarrier2<'static>>,
    pub memory_barriers: Vec<vk::MemoryBarrier2<'static>>,
}

impl GfxCapturedBarriers {
    #[inline]
    pub fn barrier_count(&self) -> usize {
        self.image_barriers.len() + self.buffer_barriers.len() + self.memory_barriers.len()
    }
}

#[derive(Clone, Debug)]
pub enum GfxCapturedCommand {
    PipelineBarrier(GfxCapturedBarriers),
    BeginLabel(String),
    EndLabel,
}

/// 把命令记录在内存中的 recorder
#[derive(Default)]
pub struct GfxBarrierCapture {
    commands: RefCell<Vec<GfxCapturedCommand>>,
}

impl GfxBarrierCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按录制顺序返回所有命令
    pub fn commands(&self) -> Ref<'_, Vec<GfxCapturedCommand>> {
        self.commands.borrow()
    }

    /// 只返回 barrier 命令
    pub fn barrier_batches(&self) -> Vec<GfxCapturedBarriers> {
        self.commands
            .borrow()
            .iter()
            .filter_map(|c| match c {
                GfxCapturedCommand::PipelineBarrier(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }
}

/// # Safety
/// `ptr` 和 `count` 必须来自同一个合法的 Vulkan 数组
unsafe fn raw_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if ptr.is_null() || count == 0 { &[] } else { unsafe { std::slice::from_raw_parts(ptr, count as usize) } }
}

fn own_image_barrier(b: &vk::ImageMemoryBarrier2<'_>) -> vk::ImageMemoryBarrier2<'static> {
    vk::ImageMemoryBarrier2::default()
        .src_stage_mask(b.src_stage_mask)
        .src_access_mask(b.src_access_mask)
        .dst_stage_mask(b.dst_stage_mask)
        .dst_access_mask(b.dst_access_mask)
        .old_layout(b.old_layout)
        .new_layout(b.new_layout)
        .src_queue_family_index(b.src_queue_family_index)
        .dst_queue_family_index(b.dst_queue_family_index)
        .image(b.image)
        .subresource_range(b.subresource_range)
}

fn own_buffer_barrier(b: &vk::BufferMemoryBarrier2<'_>) -> vk::BufferMemoryBarrier2<'static> {
    vk::BufferMemoryBarrier2::default()
        .src_stage_mask(b.src_stage_mask)
        .src_access_mask(b.src_access_mask)
        .dst_stage_mask(b.dst_stage_mask)
        .dst_access_mask(b.dst_access_mask)
        .src_queue_family_index(b.src_queue_family_index)
        .dst_queue_family_index(b.dst_queue_family_index)
        .buffer(b.buffer)
        .offset(b.offset)
        .size(b.size)
}

fn own_memory_barrier(b: &vk::MemoryBarrier2<'_>) -> vk::MemoryBarrier2<'static> {
    vk::MemoryBarrier2::default()
        .src_stage_mask(b.src_stage_mask)
        .src_access_mask(b.src_access_mask)
        .dst_stage_mask(b.dst_stage_mask)
        .dst_access_mask(b.dst_access_mask)
}

impl GfxCommandRecorder for GfxBarrierCapture {
    fn vk_handle(&self) -> vk::CommandBuffer {
        vk::CommandBuffer::null()
    }

    fn cmd_pipeline_barrier2(&self, dependency_info: &vk::DependencyInfo<'_>) {
        let captured = unsafe {
            GfxCapturedBarriers {
                dependency_flags: dependency_info.dependency_flags,
                image_barriers: raw_slice(
                    dependency_info.p_image_memory_barriers,
                    dependency_info.image_memory_barrier_count,
                )
                .iter()
                .map(own_image_barrier)
                .collect(),
                buffer_barriers: raw_slice(
                    dependency_info.p_buffer_memory_barriers,
                    dependency_info.buffer_memory_barrier_count,
                )
                .iter()
                .map(own_buffer_barrier)
                .collect(),
                memory_barriers: raw_slice(dependency_info.p_memory_barriers, dependency_info.memory_barrier_count)
                    .iter()
                    .map(own_memory_barrier)
                    .collect(),
            }
        };
        self.commands.borrow_mut().push(GfxCapturedCommand::PipelineBarrier(captured));
    }

    fn begin_label(&self, label_name: &str, _label_color: glam::Vec4) {
        self.commands.borrow_mut().push(GfxCapturedCommand::BeginLabel(label_name.to_string()));
    }

    fn end_label(&self) {
        self.commands.borrow_mut().push(GfxCapturedCommand::EndLabel);
    }
}
