use ash::vk;

use crate::sync::resource_state::{GfxAccelState, GfxBufferState};

/// 从未被 track / request 过的 buffer 区间和加速结构，被认为处于什么状态
///
/// image 不受影响，未知区间总是从 UNDEFINED 开始。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GfxUntrackedPolicy {
    /// stage 和 access 都是 NONE，第一次读取不会产生 barrier
    #[default]
    AssumeIdle,
    /// 认为之前被 ALL_COMMANDS 以 MEMORY_READ | MEMORY_WRITE 访问过，第一次访问总会产生 barrier
    FullBarrier,
}

impl GfxUntrackedPolicy {
    const FULL_STAGE: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::ALL_COMMANDS;
    const FULL_ACCESS: vk::AccessFlags2 =
        vk::AccessFlags2::from_raw(vk::AccessFlags2::MEMORY_READ.as_raw() | vk::AccessFlags2::MEMORY_WRITE.as_raw());

    #[inline]
    pub fn buffer_state(&self) -> GfxBufferState {
        match self {
            Self::AssumeIdle => GfxBufferState::NONE,
            Self::FullBarrier => GfxBufferState::new(Self::FULL_STAGE, Self::FULL_ACCESS),
        }
    }

    #[inline]
    pub fn accel_state(&self) -> GfxAccelState {
        match self {
            Self::AssumeIdle => GfxAccelState::NONE,
            Self::FullBarrier => GfxAccelState::new(Self::FULL_STAGE, Self::FULL_ACCESS),
        }
    }
}

/// 资源跟踪器的配置
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxTrackerSettings {
    pub untracked_policy: GfxUntrackedPolicy,
    /// 同一状态下相邻的区间是否合并
    pub merge_adjacent: bool,
}

impl Default for GfxTrackerSettings {
    fn default() -> Self {
        Self {
            untracked_policy: GfxUntrackedPolicy::AssumeIdle,
            merge_adjacent: true,
        }
    }
}
