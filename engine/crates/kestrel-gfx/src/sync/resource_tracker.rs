//! 资源状态跟踪器
//!
//! 在录制命令的过程中记录每个资源（的每个子区间）当前的 stage / access / layout，
//! 在资源被再次使用前生成最少且正确的 barrier，并在 `flush` 时一次性提交。

use std::collections::HashMap;

use ash::vk;
use itertools::Itertools;

use crate::commands::barrier::{GfxBufferBarrier, GfxImageBarrier, GfxMemoryBarrier};
use crate::commands::recorder::GfxCommandRecorder;
use crate::sync::hazard;
use crate::sync::interval::{BufferInterval, ImageInterval};
use crate::sync::interval_set::{BufferIntervalSet, ImageIntervalSet};
use crate::sync::resource_state::{GfxAccelState, GfxBufferState, GfxImageState, GfxResourceAccess};
use crate::sync::settings::GfxTrackerSettings;

/// 处于同一个状态的 image 子区间
#[derive(Clone, Debug)]
pub struct GfxImageStateGroup {
    pub state: GfxImageState,
    pub intervals: ImageIntervalSet,
}

/// 处于同一个状态的 buffer 区间
#[derive(Clone, Debug)]
pub struct GfxBufferStateGroup {
    pub state: GfxBufferState,
    pub intervals: BufferIntervalSet,
}

/// 资源状态跟踪器
///
/// 每个 handle 对应若干个状态组，不同状态组的区间互不重叠。
/// 没有记录的区间被认为处于默认状态：image 为 UNDEFINED，buffer 和加速结构由
/// [`GfxUntrackedPolicy`](crate::sync::settings::GfxUntrackedPolicy) 决定。
///
/// 跟踪器不是线程安全的，每个录制作用域（一帧、一次上传、一次 render graph 执行）使用一个实例。
#[derive(Default)]
pub struct GfxResourceTracker {
    settings: GfxTrackerSettings,

    image_states: HashMap<vk::Image, Vec<GfxImageStateGroup>>,
    buffer_states: HashMap<vk::Buffer, Vec<GfxBufferStateGroup>>,
    accel_states: HashMap<vk::AccelerationStructureKHR, GfxAccelState>,

    pending_image_barriers: Vec<GfxImageBarrier>,
    pending_buffer_barriers: Vec<GfxBufferBarrier>,
    pending_memory_barriers: Vec<GfxMemoryBarrier>,
}

// new & init
impl GfxResourceTracker {
    pub fn new(settings: GfxTrackerSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// 丢弃所有状态和未提交的 barrier，用于在新的录制作用域中复用
    pub fn reset(&mut self) {
        self.image_states.clear();
        self.buffer_states.clear();
        self.accel_states.clear();
        self.pending_image_barriers.clear();
        self.pending_buffer_barriers.clear();
        self.pending_memory_barriers.clear();
    }
}

// track & request
impl GfxResourceTracker {
    /// 直接覆盖资源状态，不产生 barrier
    ///
    /// 调用者保证资源已经处于 `state`，例如刚刚创建或者已经手动同步过。
    pub fn track(&mut self, access: GfxResourceAccess) {
        match access {
            GfxResourceAccess::Image { image, range, state } => self.track_image(image, range, state),
            GfxResourceAccess::Buffer { buffer, range, state } => self.track_buffer(buffer, range, state),
            GfxResourceAccess::AccelerationStructure { handle, state } => self.track_accel(handle, state),
        }
    }

    /// 声明接下来要以 `state` 访问资源，必要时生成 barrier，并更新状态
    pub fn request(&mut self, access: GfxResourceAccess) {
        match access {
            GfxResourceAccess::Image { image, range, state } => self.request_image(image, range, state),
            GfxResourceAccess::Buffer { buffer, range, state } => self.request_buffer(buffer, range, state),
            GfxResourceAccess::AccelerationStructure { handle, state } => self.request_accel(handle, state),
        }
    }

    pub fn track_image(&mut self, image: vk::Image, range: ImageInterval, state: GfxImageState) {
        debug_assert!(!range.is_empty(), "empty image range: {range:?}");
        log::trace!("track image {image:?} {range:?} -> {:?}", state.layout);

        let groups = self.image_states.entry(image).or_default();
        Self::store_image(groups, range, state, self.settings.merge_adjacent);
    }

    pub fn track_buffer(&mut self, buffer: vk::Buffer, range: BufferInterval, state: GfxBufferState) {
        debug_assert!(!range.is_empty(), "empty buffer range: {range:?}");
        debug_assert!(range.size != vk::WHOLE_SIZE, "buffer size must be explicit");
        log::trace!("track buffer {buffer:?} [{}, {})", range.offset, range.end());

        let groups = self.buffer_states.entry(buffer).or_default();
        Self::store_buffer(groups, range, state, self.settings.merge_adjacent);
    }

    pub fn track_accel(&mut self, handle: vk::AccelerationStructureKHR, state: GfxAccelState) {
        log::trace!("track acceleration structure {handle:?}");
        self.accel_states.insert(handle, state);
    }

    pub fn request_image(&mut self, image: vk::Image, range: ImageInterval, state: GfxImageState) {
        debug_assert!(!range.is_empty(), "empty image range: {range:?}");

        let groups = self.image_states.entry(image).or_default();

        let mut uncovered = vec![range];
        for group in groups.iter() {
            for member in group.intervals.find_overlapping(&range) {
                let Some(overlap) = member.intersect(&range) else {
                    continue;
                };
                if hazard::image_needs_barrier(&group.state, &state) {
                    log::trace!(
                        "image barrier {image:?} {overlap:?}: {:?} -> {:?}",
                        group.state.layout,
                        state.layout
                    );
                    self.pending_image_barriers.push(hazard::image_barrier(image, &overlap, &group.state, &state));
                }
                uncovered = uncovered.iter().flat_map(|u| u.difference(&overlap)).collect_vec();
            }
        }

        // 没有记录的部分从 UNDEFINED 开始，总是需要 barrier
        let mut untracked = ImageIntervalSet::new();
        uncovered.into_iter().for_each(|u| untracked.add(u));
        for piece in untracked.intervals() {
            log::trace!("image barrier {image:?} {piece:?}: UNDEFINED -> {:?}", state.layout);
            self.pending_image_barriers.push(hazard::image_barrier(image, piece, &GfxImageState::UNDEFINED, &state));
        }

        Self::store_image(groups, range, state, self.settings.merge_adjacent);
    }

    pub fn request_buffer(&mut self, buffer: vk::Buffer, range: BufferInterval, state: GfxBufferState) {
        debug_assert!(!range.is_empty(), "empty buffer range: {range:?}");
        debug_assert!(range.size != vk::WHOLE_SIZE, "buffer size must be explicit");

        let groups = self.buffer_states.entry(buffer).or_default();

        let mut uncovered = vec![range];
        // 跳过 barrier 的读后读区间，保留之前的读者
        let mut shared_reads = Vec::new();
        for group in groups.iter() {
            for member in group.intervals.find_overlapping(&range) {
                let Some(overlap) = member.intersect(&range) else {
                    continue;
                };
                if hazard::buffer_needs_barrier(&group.state, &state) {
                    log::trace!("buffer barrier {buffer:?} [{}, {})", overlap.offset, overlap.end());
                    self.pending_buffer_barriers.push(hazard::buffer_barrier(buffer, &overlap, &group.state, &state));
                } else if group.state != state {
                    shared_reads.push((overlap, group.state.with_reader(&state)));
                }
                uncovered = uncovered.iter().flat_map(|u| u.difference(&overlap)).collect_vec();
            }
        }

        let default_state = self.settings.untracked_policy.buffer_state();
        if hazard::buffer_needs_barrier(&default_state, &state) {
            let mut untracked = BufferIntervalSet::new();
            uncovered.into_iter().for_each(|u| untracked.add(u));
            for piece in untracked.intervals() {
                log::trace!("buffer barrier {buffer:?} [{}, {}) from untracked", piece.offset, piece.end());
                self.pending_buffer_barriers.push(hazard::buffer_barrier(buffer, piece, &default_state, &state));
            }
        }

        let merge = self.settings.merge_adjacent;
        Self::store_buffer(groups, range, state, merge);
        for (overlap, readers) in shared_reads {
            Self::store_buffer(groups, overlap, readers, merge);
        }
    }

    pub fn request_accel(&mut self, handle: vk::AccelerationStructureKHR, state: GfxAccelState) {
        let old = self.accel_states.get(&handle).copied().unwrap_or_else(|| self.settings.untracked_policy.accel_state());
        let new_state = if hazard::accel_needs_barrier(&old, &state) {
            log::trace!("memory barrier for acceleration structure {handle:?}");
            self.pending_memory_barriers.push(hazard::accel_barrier(&old, &state));
            state
        } else {
            old.with_reader(&state)
        };
        self.accel_states.insert(handle, new_state);
    }

    fn store_image(groups: &mut Vec<GfxImageStateGroup>, range: ImageInterval, state: GfxImageState, merge: bool) {
        groups.iter_mut().for_each(|g| g.intervals.remove(&range));
        groups.retain(|g| !g.intervals.is_empty());

        match groups.iter_mut().find(|g| g.state == state) {
            Some(group) if merge => group.intervals.add(range),
            Some(group) => group.intervals.insert(range),
            None => {
                let mut intervals = ImageIntervalSet::new();
                intervals.insert(range);
                groups.push(GfxImageStateGroup { state, intervals });
            }
        }
    }

    fn store_buffer(groups: &mut Vec<GfxBufferStateGroup>, range: BufferInterval, state: GfxBufferState, merge: bool) {
        groups.iter_mut().for_each(|g| g.intervals.remove(&range));
        groups.retain(|g| !g.intervals.is_empty());

        match groups.iter_mut().find(|g| g.state == state) {
            Some(group) if merge => group.intervals.add(range),
            Some(group) => group.intervals.insert(range),
            None => {
                let mut intervals = BufferIntervalSet::new();
                intervals.insert(range);
                groups.push(GfxBufferStateGroup { state, intervals });
            }
        }
    }
}

// flush
impl GfxResourceTracker {
    /// 把所有未提交的 barrier 合并为一次 `cmd_pipeline_barrier2`
    ///
    /// 没有待提交的 barrier 时不录制任何命令。只清空待提交列表，不影响已记录的状态。
    pub fn flush<R: GfxCommandRecorder + ?Sized>(&mut self, cmd: &R) {
        if !self.has_pending_barriers() {
            return;
        }

        let image_barriers = self.pending_image_barriers.drain(..).map(|b| *b.inner()).collect_vec();
        let buffer_barriers = self.pending_buffer_barriers.drain(..).map(|b| *b.inner()).collect_vec();
        let memory_barriers = self.pending_memory_barriers.drain(..).map(|b| *b.inner()).collect_vec();
        log::debug!(
            "flush barriers: {} image, {} buffer, {} memory",
            image_barriers.len(),
            buffer_barriers.len(),
            memory_barriers.len()
        );

        let dependency_info = vk::DependencyInfo::default()
            .image_memory_barriers(&image_barriers)
            .buffer_memory_barriers(&buffer_barriers)
            .memory_barriers(&memory_barriers);
        cmd.cmd_pipeline_barrier2(&dependency_info);
    }
}

// getter
impl GfxResourceTracker {
    #[inline]
    pub fn settings(&self) -> &GfxTrackerSettings {
        &self.settings
    }

    #[inline]
    pub fn has_pending_barriers(&self) -> bool {
        !(self.pending_image_barriers.is_empty()
            && self.pending_buffer_barriers.is_empty()
            && self.pending_memory_barriers.is_empty())
    }

    #[inline]
    pub fn pending_image_barriers(&self) -> &[GfxImageBarrier] {
        &self.pending_image_barriers
    }

    #[inline]
    pub fn pending_buffer_barriers(&self) -> &[GfxBufferBarrier] {
        &self.pending_buffer_barriers
    }

    #[inline]
    pub fn pending_memory_barriers(&self) -> &[GfxMemoryBarrier] {
        &self.pending_memory_barriers
    }

    pub fn image_states(&self, image: vk::Image) -> &[GfxImageStateGroup] {
        self.image_states.get(&image).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn buffer_states(&self, buffer: vk::Buffer) -> &[GfxBufferStateGroup] {
        self.buffer_states.get(&buffer).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn accel_state(&self, handle: vk::AccelerationStructureKHR) -> Option<GfxAccelState> {
        self.accel_states.get(&handle).copied()
    }

    /// 单个子资源 (aspect, mip, layer) 的状态，没有记录时返回 None
    pub fn image_state_at(
        &self,
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        mip: u32,
        layer: u32,
    ) -> Option<GfxImageState> {
        let point = ImageInterval::new(aspect, (mip, 1), (layer, 1));
        self.image_states(image).iter().find(|g| g.intervals.has_overlap(&point)).map(|g| g.state)
    }

    /// 单个字节的状态，没有记录时返回 None
    pub fn buffer_state_at(&self, buffer: vk::Buffer, offset: vk::DeviceSize) -> Option<GfxBufferState> {
        let point = BufferInterval::new(offset, 1);
        self.buffer_states(buffer).iter().find(|g| g.intervals.has_overlap(&point)).map(|g| g.state)
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;
    use crate::commands::recorder::GfxBarrierCapture;
    use crate::sync::settings::GfxUntrackedPolicy;

    const COLOR: vk::ImageAspectFlags = vk::ImageAspectFlags::COLOR;

    fn image(raw: u64) -> vk::Image {
        vk::Image::from_raw(raw)
    }

    fn buffer(raw: u64) -> vk::Buffer {
        vk::Buffer::from_raw(raw)
    }

    fn color_mips(base: u32, count: u32) -> ImageInterval {
        ImageInterval::new(COLOR, (base, count), (0, 1))
    }

    fn tracker() -> GfxResourceTracker {
        kestrel_crate_tools::init_log::init_test_log();
        GfxResourceTracker::new(GfxTrackerSettings::default())
    }

    #[test]
    fn test_request_twice_is_noop() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::SHADER_READ_FRAGMENT);
        assert_eq!(tracker.pending_image_barriers().len(), 1);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::SHADER_READ_FRAGMENT);
        assert_eq!(tracker.pending_image_barriers().len(), 1);

        let buf = buffer(2);
        tracker.request_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::TRANSFER_DST);
        tracker.request_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::UNIFORM_FRAGMENT);
        let count = tracker.pending_buffer_barriers().len();
        tracker.request_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::UNIFORM_FRAGMENT);
        assert_eq!(tracker.pending_buffer_barriers().len(), count);
    }

    #[test]
    fn test_first_image_use_barriers_from_undefined() {
        for state in [GfxImageState::UNDEFINED, GfxImageState::GENERAL, GfxImageState::SHADER_READ_COMPUTE] {
            let mut tracker = tracker();
            tracker.request_image(image(1), color_mips(0, 4), state);

            let barriers = tracker.pending_image_barriers();
            assert_eq!(barriers.len(), 1);
            assert_eq!(barriers[0].inner().old_layout, vk::ImageLayout::UNDEFINED);
            assert_eq!(barriers[0].inner().new_layout, state.layout);
            assert_eq!(barriers[0].inner().subresource_range.level_count, 4);
        }
    }

    #[test]
    fn test_buffer_read_after_read_is_free() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::VERTEX_BUFFER);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::UNIFORM_FRAGMENT);
        assert!(tracker.pending_buffer_barriers().is_empty());
    }

    #[test]
    fn test_buffer_write_waits_for_all_readers() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::VERTEX_BUFFER);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::UNIFORM_COMPUTE);
        assert!(tracker.pending_buffer_barriers().is_empty());

        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(
            barriers[0].inner().src_stage_mask,
            vk::PipelineStageFlags2::VERTEX_INPUT | vk::PipelineStageFlags2::COMPUTE_SHADER
        );
        assert_eq!(
            barriers[0].inner().src_access_mask,
            vk::AccessFlags2::VERTEX_ATTRIBUTE_READ | vk::AccessFlags2::UNIFORM_READ
        );
        assert_eq!(tracker.buffer_state_at(buf, 0), Some(GfxBufferState::TRANSFER_DST));
    }

    #[test]
    fn test_buffer_shared_read_only_on_overlap() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 128), GfxBufferState::VERTEX_BUFFER);
        tracker.request_buffer(buf, BufferInterval::new(64, 128), GfxBufferState::UNIFORM_COMPUTE);

        let readers = GfxBufferState::VERTEX_BUFFER.with_reader(&GfxBufferState::UNIFORM_COMPUTE);
        assert_eq!(tracker.buffer_state_at(buf, 0), Some(GfxBufferState::VERTEX_BUFFER));
        assert_eq!(tracker.buffer_state_at(buf, 100), Some(readers));
        assert_eq!(tracker.buffer_state_at(buf, 150), Some(GfxBufferState::UNIFORM_COMPUTE));
    }

    #[test]
    fn test_buffer_read_after_write() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::VERTEX_BUFFER);

        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(barriers[0].inner().dst_access_mask, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);
    }

    #[test]
    fn test_buffer_write_after_read() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::UNIFORM_COMPUTE);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        assert_eq!(tracker.pending_buffer_barriers().len(), 1);
    }

    #[test]
    fn test_buffer_write_after_write() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        assert_eq!(tracker.pending_buffer_barriers().len(), 1);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::STORAGE_READ_WRITE_COMPUTE);
        assert_eq!(tracker.pending_buffer_barriers().len(), 2);
    }

    #[test]
    fn test_disjoint_buffer_ranges_are_independent() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        tracker.request_buffer(buf, BufferInterval::new(64, 64), GfxBufferState::TRANSFER_DST);

        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 2);
        assert_eq!((barriers[0].inner().offset, barriers[0].inner().size), (0, 64));
        assert_eq!((barriers[1].inner().offset, barriers[1].inner().size), (64, 64));
        // 第二次 request 的 src 不受第一段写入影响
        assert_eq!(barriers[1].inner().src_access_mask, vk::AccessFlags2::NONE);
    }

    #[test]
    fn test_buffer_partial_overlap_splits_state() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 1024), GfxBufferState::STORAGE_READ_WRITE_COMPUTE);
        tracker.request_buffer(buf, BufferInterval::new(0, 512), GfxBufferState::UNIFORM_FRAGMENT);

        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!((barriers[0].inner().offset, barriers[0].inner().size), (0, 512));

        assert_eq!(tracker.buffer_states(buf).len(), 2);
        assert_eq!(tracker.buffer_state_at(buf, 0), Some(GfxBufferState::UNIFORM_FRAGMENT));
        assert_eq!(tracker.buffer_state_at(buf, 700), Some(GfxBufferState::STORAGE_READ_WRITE_COMPUTE));
    }

    #[test]
    fn test_buffer_request_straddling_tracked_and_untracked() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::TRANSFER_DST);
        tracker.request_buffer(buf, BufferInterval::new(128, 256), GfxBufferState::STORAGE_READ_WRITE_COMPUTE);

        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 2);
        assert_eq!((barriers[0].inner().offset, barriers[0].inner().size), (128, 128));
        assert_eq!(barriers[0].inner().src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!((barriers[1].inner().offset, barriers[1].inner().size), (256, 128));
        assert_eq!(barriers[1].inner().src_stage_mask, vk::PipelineStageFlags2::NONE);
    }

    #[test]
    fn test_buffer_adjacent_states_merge() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::VERTEX_BUFFER);
        tracker.track_buffer(buf, BufferInterval::new(256, 256), GfxBufferState::VERTEX_BUFFER);

        let groups = tracker.buffer_states(buf);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].intervals.intervals(), &[BufferInterval::new(0, 512)]);
    }

    #[test]
    fn test_buffer_adjacent_states_kept_apart_without_merge() {
        kestrel_crate_tools::init_log::init_test_log();
        let mut tracker = GfxResourceTracker::new(GfxTrackerSettings {
            merge_adjacent: false,
            ..Default::default()
        });
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 256), GfxBufferState::VERTEX_BUFFER);
        tracker.track_buffer(buf, BufferInterval::new(256, 256), GfxBufferState::VERTEX_BUFFER);
        assert_eq!(tracker.buffer_states(buf)[0].intervals.len(), 2);
    }

    #[test]
    fn test_track_overwrites_inner_range() {
        let mut tracker = tracker();
        let buf = buffer(1);
        tracker.track_buffer(buf, BufferInterval::new(0, 1024), GfxBufferState::TRANSFER_DST);
        tracker.track_buffer(buf, BufferInterval::new(256, 256), GfxBufferState::UNIFORM_COMPUTE);

        assert!(!tracker.has_pending_barriers());
        assert_eq!(tracker.buffer_state_at(buf, 0), Some(GfxBufferState::TRANSFER_DST));
        assert_eq!(tracker.buffer_state_at(buf, 300), Some(GfxBufferState::UNIFORM_COMPUTE));
        assert_eq!(tracker.buffer_state_at(buf, 600), Some(GfxBufferState::TRANSFER_DST));
        assert_eq!(tracker.buffer_state_at(buf, 2000), None);
    }

    #[test]
    fn test_image_layout_transition() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.track_image(img, color_mips(0, 1), GfxImageState::TRANSFER_DST);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::SHADER_READ_FRAGMENT);

        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(barriers[0].inner().new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    #[test]
    fn test_image_same_layout_different_access() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.track_image(img, color_mips(0, 1), GfxImageState::STORAGE_WRITE_COMPUTE);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::STORAGE_READ_WRITE_COMPUTE);

        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().old_layout, vk::ImageLayout::GENERAL);
        assert_eq!(barriers[0].inner().new_layout, vk::ImageLayout::GENERAL);
    }

    #[test]
    fn test_image_mip_request_splits_state() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.track_image(img, color_mips(0, 3), GfxImageState::TRANSFER_DST);
        tracker.request_image(img, color_mips(1, 1), GfxImageState::TRANSFER_SRC);

        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 1);
        let range = barriers[0].inner().subresource_range;
        assert_eq!((range.base_mip_level, range.level_count), (1, 1));

        assert_eq!(tracker.image_state_at(img, COLOR, 0, 0), Some(GfxImageState::TRANSFER_DST));
        assert_eq!(tracker.image_state_at(img, COLOR, 1, 0), Some(GfxImageState::TRANSFER_SRC));
        assert_eq!(tracker.image_state_at(img, COLOR, 2, 0), Some(GfxImageState::TRANSFER_DST));
    }

    #[test]
    fn test_image_partially_untracked() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.track_image(img, color_mips(0, 1), GfxImageState::TRANSFER_DST);
        tracker.request_image(img, color_mips(0, 2), GfxImageState::SHADER_READ_FRAGMENT);

        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 2);
        assert_eq!(barriers[0].inner().old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(barriers[0].inner().subresource_range.base_mip_level, 0);
        assert_eq!(barriers[1].inner().old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barriers[1].inner().subresource_range.base_mip_level, 1);

        // 两个 mip 都进入同一个状态，合并为一个区间
        let groups = tracker.image_states(img);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].intervals.intervals(), &[color_mips(0, 2)]);
    }

    #[test]
    fn test_image_untracked_array_layer() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.track_image(img, ImageInterval::new(COLOR, (0, 1), (0, 1)), GfxImageState::SHADER_READ_FRAGMENT);
        tracker.request_image(img, ImageInterval::new(COLOR, (0, 1), (1, 1)), GfxImageState::TRANSFER_DST);

        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(barriers[0].inner().subresource_range.base_array_layer, 1);
        assert_eq!(tracker.image_state_at(img, COLOR, 0, 0), Some(GfxImageState::SHADER_READ_FRAGMENT));
    }

    #[test]
    fn test_image_depth_and_stencil_tracked_separately() {
        let mut tracker = tracker();
        let img = image(1);
        let depth = ImageInterval::new(vk::ImageAspectFlags::DEPTH, (0, 1), (0, 1));
        let stencil = ImageInterval::new(vk::ImageAspectFlags::STENCIL, (0, 1), (0, 1));
        tracker.track_image(img, depth, GfxImageState::DEPTH_ATTACHMENT_WRITE);
        tracker.track_image(img, stencil, GfxImageState::DEPTH_ATTACHMENT_WRITE);
        assert_eq!(tracker.image_states(img)[0].intervals.len(), 1);

        tracker.request_image(img, stencil, GfxImageState::DEPTH_READ_ONLY);
        let barriers = tracker.pending_image_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().subresource_range.aspect_mask, vk::ImageAspectFlags::STENCIL);
        assert_eq!(
            tracker.image_state_at(img, vk::ImageAspectFlags::DEPTH, 0, 0),
            Some(GfxImageState::DEPTH_ATTACHMENT_WRITE)
        );
    }

    #[test]
    fn test_accel_build_then_trace() {
        let mut tracker = tracker();
        let tlas = vk::AccelerationStructureKHR::from_raw(7);
        tracker.request_accel(tlas, GfxAccelState::BUILD_WRITE);
        tracker.request_accel(tlas, GfxAccelState::RAY_TRACING_READ);

        let barriers = tracker.pending_memory_barriers();
        assert_eq!(barriers.len(), 2);
        assert_eq!(barriers[1].inner().src_access_mask, vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR);
        assert_eq!(barriers[1].inner().dst_stage_mask, vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR);
        assert_eq!(tracker.accel_state(tlas), Some(GfxAccelState::RAY_TRACING_READ));
    }

    #[test]
    fn test_accel_update_after_build() {
        let mut tracker = tracker();
        let blas = vk::AccelerationStructureKHR::from_raw(3);
        tracker.track_accel(blas, GfxAccelState::BUILD_WRITE);
        tracker.request_accel(blas, GfxAccelState::BUILD_WRITE);
        assert_eq!(tracker.pending_memory_barriers().len(), 1);
    }

    #[test]
    fn test_accel_read_after_read_is_free() {
        let mut tracker = tracker();
        let tlas = vk::AccelerationStructureKHR::from_raw(7);
        tracker.request_accel(tlas, GfxAccelState::RAY_TRACING_READ);
        tracker.request_accel(tlas, GfxAccelState::RAY_QUERY_COMPUTE);
        assert!(tracker.pending_memory_barriers().is_empty());

        tracker.request_accel(tlas, GfxAccelState::BUILD_WRITE);
        let barriers = tracker.pending_memory_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(
            barriers[0].inner().src_stage_mask,
            vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR | vk::PipelineStageFlags2::COMPUTE_SHADER
        );
    }

    #[test]
    fn test_full_barrier_policy_for_untracked_buffer() {
        kestrel_crate_tools::init_log::init_test_log();
        let mut tracker = GfxResourceTracker::new(GfxTrackerSettings {
            untracked_policy: GfxUntrackedPolicy::FullBarrier,
            ..Default::default()
        });
        let buf = buffer(1);
        tracker.request_buffer(buf, BufferInterval::new(0, 64), GfxBufferState::VERTEX_BUFFER);

        let barriers = tracker.pending_buffer_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].inner().src_stage_mask, vk::PipelineStageFlags2::ALL_COMMANDS);
        assert_eq!(
            barriers[0].inner().src_access_mask,
            vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE
        );

        tracker.request_accel(vk::AccelerationStructureKHR::from_raw(9), GfxAccelState::RAY_TRACING_READ);
        assert_eq!(tracker.pending_memory_barriers().len(), 1);
    }

    #[test]
    fn test_flush_batches_into_one_call() {
        let mut tracker = tracker();
        let capture = GfxBarrierCapture::new();

        tracker.request_image(image(1), color_mips(0, 1), GfxImageState::COLOR_ATTACHMENT_WRITE);
        tracker.request_buffer(buffer(2), BufferInterval::new(0, 64), GfxBufferState::TRANSFER_DST);
        tracker.request_accel(vk::AccelerationStructureKHR::from_raw(3), GfxAccelState::BUILD_WRITE);
        tracker.flush(&capture);

        let batches = capture.barrier_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].image_barriers.len(), 1);
        assert_eq!(batches[0].buffer_barriers.len(), 1);
        assert_eq!(batches[0].memory_barriers.len(), 1);
        assert!(!tracker.has_pending_barriers());

        // 没有待提交的 barrier 时 flush 不录制命令
        tracker.flush(&capture);
        assert_eq!(capture.commands().len(), 1);
    }

    #[test]
    fn test_track_does_not_barrier() {
        let mut tracker = tracker();
        let capture = GfxBarrierCapture::new();
        tracker.track(GfxResourceAccess::Image {
            image: image(1),
            range: color_mips(0, 1),
            state: GfxImageState::GENERAL,
        });
        tracker.track(GfxResourceAccess::buffer(buffer(2), 0, 64, GfxBufferState::TRANSFER_DST));
        tracker.track(GfxResourceAccess::acceleration_structure(
            vk::AccelerationStructureKHR::from_raw(3),
            GfxAccelState::BUILD_WRITE,
        ));
        tracker.flush(&capture);
        assert!(capture.commands().is_empty());
    }

    #[test]
    fn test_flush_keeps_state() {
        let mut tracker = tracker();
        let capture = GfxBarrierCapture::new();
        let img = image(1);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::SHADER_READ_COMPUTE);
        tracker.flush(&capture);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::SHADER_READ_COMPUTE);
        assert!(!tracker.has_pending_barriers());
    }

    #[test]
    fn test_end_to_end_upload_then_sample() {
        let mut tracker = tracker();
        let capture = GfxBarrierCapture::new();
        let img = image(42);
        let range = vk::ImageSubresourceRange {
            aspect_mask: COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };

        tracker.request(GfxResourceAccess::image(img, range, GfxImageState::TRANSFER_DST));
        assert_eq!(tracker.pending_image_barriers().len(), 1);
        tracker.flush(&capture);
        assert!(!tracker.has_pending_barriers());

        tracker.request(GfxResourceAccess::image(img, range, GfxImageState::SHADER_READ_FRAGMENT));
        assert_eq!(tracker.pending_image_barriers().len(), 1);
        tracker.flush(&capture);

        let batches = capture.barrier_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].image_barriers[0].old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(batches[0].image_barriers[0].new_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(batches[1].image_barriers[0].old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(batches[1].image_barriers[0].new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(batches[1].image_barriers[0].image, img);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut tracker = tracker();
        let img = image(1);
        tracker.request_image(img, color_mips(0, 1), GfxImageState::GENERAL);
        tracker.reset();
        assert!(!tracker.has_pending_barriers());
        assert!(tracker.image_states(img).is_empty());
    }
}
