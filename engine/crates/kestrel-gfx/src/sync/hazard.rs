//! 判断两次访问之间是否需要 barrier，以及生成 barrier
//!
//! - image：layout、stage、access 任意一个不同，或者旧 layout 为 UNDEFINED 时需要 barrier
//! - buffer / 加速结构：没有 layout，只有读后读（RAR）可以跳过

use ash::vk;

use crate::commands::barrier::{GfxBarrierMask, GfxBufferBarrier, GfxImageBarrier, GfxMemoryBarrier};
use crate::sync::interval::{BufferInterval, ImageInterval};
use crate::sync::resource_state::{GfxAccelState, GfxBufferState, GfxImageState};

#[inline]
pub fn image_needs_barrier(old: &GfxImageState, new: &GfxImageState) -> bool {
    old.layout == vk::ImageLayout::UNDEFINED || old != new
}

#[inline]
pub fn buffer_needs_barrier(old: &GfxBufferState, new: &GfxBufferState) -> bool {
    old.is_write() || new.is_write()
}

#[inline]
pub fn accel_needs_barrier(old: &GfxAccelState, new: &GfxAccelState) -> bool {
    old.is_write() || new.is_write()
}

#[inline]
fn mask(
    src: (vk::PipelineStageFlags2, vk::AccessFlags2),
    dst: (vk::PipelineStageFlags2, vk::AccessFlags2),
) -> GfxBarrierMask {
    GfxBarrierMask {
        src_stage: src.0,
        dst_stage: dst.0,
        src_access: src.1,
        dst_access: dst.1,
    }
}

pub fn image_barrier(
    image: vk::Image,
    range: &ImageInterval,
    old: &GfxImageState,
    new: &GfxImageState,
) -> GfxImageBarrier {
    GfxImageBarrier::new()
        .image(image)
        .subresource_range(range.to_range())
        .layout_transfer(old.layout, new.layout)
        .mask(mask((old.stage, old.access), (new.stage, new.access)))
}

pub fn buffer_barrier(
    buffer: vk::Buffer,
    range: &BufferInterval,
    old: &GfxBufferState,
    new: &GfxBufferState,
) -> GfxBufferBarrier {
    GfxBufferBarrier::new()
        .buffer(buffer, range.offset, range.size)
        .mask(mask((old.stage, old.access), (new.stage, new.access)))
}

/// 加速结构使用全局 memory barrier
pub fn accel_barrier(old: &GfxAccelState, new: &GfxAccelState) -> GfxMemoryBarrier {
    GfxMemoryBarrier::new().mask(mask((old.stage, old.access), (new.stage, new.access)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_undefined_always_barriers() {
        assert!(image_needs_barrier(&GfxImageState::UNDEFINED, &GfxImageState::UNDEFINED));
        assert!(image_needs_barrier(&GfxImageState::UNDEFINED, &GfxImageState::TRANSFER_DST));
    }

    #[test]
    fn test_image_same_state_is_noop() {
        assert!(!image_needs_barrier(&GfxImageState::SHADER_READ_FRAGMENT, &GfxImageState::SHADER_READ_FRAGMENT));
    }

    #[test]
    fn test_image_read_to_read_different_stage() {
        // layout 相同，但 stage 不同，仍然需要 barrier
        assert!(image_needs_barrier(&GfxImageState::SHADER_READ_FRAGMENT, &GfxImageState::SHADER_READ_COMPUTE));
    }

    #[test]
    fn test_image_same_layout_different_access() {
        assert!(image_needs_barrier(
            &GfxImageState::STORAGE_WRITE_COMPUTE,
            &GfxImageState::STORAGE_READ_WRITE_COMPUTE
        ));
    }

    #[test]
    fn test_buffer_hazards() {
        let read = GfxBufferState::UNIFORM_FRAGMENT;
        let write = GfxBufferState::TRANSFER_DST;
        assert!(!buffer_needs_barrier(&read, &GfxBufferState::VERTEX_BUFFER));
        assert!(buffer_needs_barrier(&write, &read));
        assert!(buffer_needs_barrier(&read, &write));
        assert!(buffer_needs_barrier(&write, &write));
        assert!(!buffer_needs_barrier(&GfxBufferState::NONE, &read));
        assert!(buffer_needs_barrier(&GfxBufferState::NONE, &GfxBufferState::HOST_WRITE));
    }

    #[test]
    fn test_accel_write_bit() {
        assert!(accel_needs_barrier(&GfxAccelState::BUILD_WRITE, &GfxAccelState::RAY_TRACING_READ));
        assert!(!accel_needs_barrier(&GfxAccelState::RAY_TRACING_READ, &GfxAccelState::RAY_QUERY_COMPUTE));
        // 加速结构写入位对 buffer 不算写
        let buffer_state = GfxBufferState::new(
            vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
            vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR,
        );
        assert!(!buffer_state.is_write());
    }

    #[test]
    fn test_image_barrier_fields() {
        let range = ImageInterval::new(vk::ImageAspectFlags::COLOR, (1, 1), (0, 1));
        let barrier = image_barrier(
            vk::Image::null(),
            &range,
            &GfxImageState::TRANSFER_DST,
            &GfxImageState::SHADER_READ_FRAGMENT,
        );
        let inner = barrier.inner();
        assert_eq!(inner.old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(inner.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(inner.src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(inner.dst_stage_mask, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(inner.subresource_range.base_mip_level, 1);
        assert_eq!(inner.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }
}
