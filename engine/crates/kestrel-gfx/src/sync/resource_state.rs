//! 资源状态定义
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 提供预定义的常用状态组合。

use ash::vk;

use crate::sync::interval::{BufferInterval, ImageInterval};

const fn access(a: vk::AccessFlags2, b: vk::AccessFlags2) -> vk::AccessFlags2 {
    vk::AccessFlags2::from_raw(a.as_raw() | b.as_raw())
}

const fn stage(a: vk::PipelineStageFlags2, b: vk::PipelineStageFlags2) -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::from_raw(a.as_raw() | b.as_raw())
}

/// buffer 的写操作 access flags
pub const BUFFER_WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_WRITE.as_raw()
        | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
        | vk::AccessFlags2::MEMORY_WRITE.as_raw()
        | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
        | vk::AccessFlags2::HOST_WRITE.as_raw(),
);

/// 加速结构的写操作 access flags
pub const ACCEL_WRITE_ACCESS: vk::AccessFlags2 =
    access(BUFFER_WRITE_ACCESS, vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR);

/// 图像资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
    /// Image layout
    pub layout: vk::ImageLayout,
}

impl Default for GfxImageState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl GfxImageState {
    /// 创建自定义状态
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    // ============ 预定义状态常量 ============

    /// 从未使用过的图像
    pub const UNDEFINED: Self = Self::new(vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// 通用布局（可用于任何操作，但性能可能不是最优）
    pub const GENERAL: Self = Self::new(
        vk::PipelineStageFlags2::ALL_COMMANDS,
        access(vk::AccessFlags2::MEMORY_READ, vk::AccessFlags2::MEMORY_WRITE),
        vk::ImageLayout::GENERAL,
    );

    /// 颜色附件输出（图形管线写入）
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 颜色附件读写（图形管线读写，如 blend）
    pub const COLOR_ATTACHMENT_READ_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        access(vk::AccessFlags2::COLOR_ATTACHMENT_READ, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 深度附件写入
    pub const DEPTH_ATTACHMENT_WRITE: Self = Self::new(
        stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
        vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    );

    /// 深度附件只读（深度测试但不写入，同时可以被采样）
    pub const DEPTH_READ_ONLY: Self = Self::new(
        stage(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags2::FRAGMENT_SHADER),
        access(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags2::SHADER_SAMPLED_READ),
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
    );

    /// 着色器只读采样（片段着色器）
    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 着色器只读采样（计算着色器）
    pub const SHADER_READ_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 着色器只读采样（光追着色器）
    pub const SHADER_READ_RAY_TRACING: Self = Self::new(
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        vk::AccessFlags2::SHADER_SAMPLED_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 存储图像写入（计算着色器）
    pub const STORAGE_WRITE_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::ImageLayout::GENERAL,
    );

    /// 存储图像读写（计算着色器）
    pub const STORAGE_READ_WRITE_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        access(vk::AccessFlags2::SHADER_STORAGE_READ, vk::AccessFlags2::SHADER_STORAGE_WRITE),
        vk::ImageLayout::GENERAL,
    );

    /// 存储图像写入（光追着色器）
    pub const STORAGE_WRITE_RAY_TRACING: Self = Self::new(
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        vk::AccessFlags2::SHADER_STORAGE_WRITE,
        vk::ImageLayout::GENERAL,
    );

    /// 存储图像读写（光追着色器）
    pub const STORAGE_READ_WRITE_RAY_TRACING: Self = Self::new(
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        access(vk::AccessFlags2::SHADER_STORAGE_READ, vk::AccessFlags2::SHADER_STORAGE_WRITE),
        vk::ImageLayout::GENERAL,
    );

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现（swapchain image）
    pub const PRESENT: Self =
        Self::new(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);
}

/// 缓冲区资源状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
}

impl Default for GfxBufferState {
    fn default() -> Self {
        Self::NONE
    }
}

// new & 常量定义
impl GfxBufferState {
    /// 创建自定义状态
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self { stage, access }
    }

    // ============ 预定义状态常量 ============

    /// 从未使用过的缓冲区
    pub const NONE: Self = Self::new(vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE);

    /// 顶点缓冲区读取
    pub const VERTEX_BUFFER: Self =
        Self::new(vk::PipelineStageFlags2::VERTEX_INPUT, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ);

    /// 索引缓冲区读取
    pub const INDEX_BUFFER: Self = Self::new(vk::PipelineStageFlags2::INDEX_INPUT, vk::AccessFlags2::INDEX_READ);

    /// Uniform 缓冲区读取（片段着色器）
    pub const UNIFORM_FRAGMENT: Self =
        Self::new(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::UNIFORM_READ);

    /// Uniform 缓冲区读取（计算着色器）
    pub const UNIFORM_COMPUTE: Self =
        Self::new(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::UNIFORM_READ);

    /// 存储缓冲区读取（计算着色器）
    pub const STORAGE_READ_COMPUTE: Self =
        Self::new(vk::PipelineStageFlags2::COMPUTE_SHADER, vk::AccessFlags2::SHADER_STORAGE_READ);

    /// 存储缓冲区读写（计算着色器）
    pub const STORAGE_READ_WRITE_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        access(vk::AccessFlags2::SHADER_STORAGE_READ, vk::AccessFlags2::SHADER_STORAGE_WRITE),
    );

    /// 间接命令缓冲区
    pub const INDIRECT_BUFFER: Self =
        Self::new(vk::PipelineStageFlags2::DRAW_INDIRECT, vk::AccessFlags2::INDIRECT_COMMAND_READ);

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_READ);

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(vk::PipelineStageFlags2::TRANSFER, vk::AccessFlags2::TRANSFER_WRITE);

    /// CPU 写入（mapped memory）
    pub const HOST_WRITE: Self = Self::new(vk::PipelineStageFlags2::HOST, vk::AccessFlags2::HOST_WRITE);

    /// 加速结构构建输入（顶点、索引、instance）
    pub const ACCELERATION_STRUCTURE_BUILD_INPUT: Self = Self::new(
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        vk::AccessFlags2::SHADER_READ,
    );

    /// 加速结构构建时的 scratch buffer
    pub const ACCELERATION_STRUCTURE_SCRATCH: Self = Self::new(
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        access(vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR, vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR),
    );

    /// 是否包含写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(BUFFER_WRITE_ACCESS)
    }

    /// 合并两次读取的 stage 和 access，之后的写操作需要等待所有读者
    #[inline]
    pub fn with_reader(&self, other: &Self) -> Self {
        Self::new(self.stage | other.stage, self.access | other.access)
    }
}

/// 加速结构状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxAccelState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

impl Default for GfxAccelState {
    fn default() -> Self {
        Self::NONE
    }
}

impl GfxAccelState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self { stage, access }
    }

    pub const NONE: Self = Self::new(vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE);

    /// 构建或者更新加速结构
    pub const BUILD_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR,
    );

    /// 构建 TLAS 时读取 BLAS
    pub const BUILD_READ: Self = Self::new(
        vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    );

    /// 光追着色器中 trace ray
    pub const RAY_TRACING_READ: Self = Self::new(
        vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    );

    /// 计算着色器中 ray query
    pub const RAY_QUERY_COMPUTE: Self = Self::new(
        vk::PipelineStageFlags2::COMPUTE_SHADER,
        vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    );

    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(ACCEL_WRITE_ACCESS)
    }

    /// 合并两次读取的 stage 和 access
    #[inline]
    pub fn with_reader(&self, other: &Self) -> Self {
        Self::new(self.stage | other.stage, self.access | other.access)
    }
}

/// 一次资源访问：资源 + 子区间 + 目标状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxResourceAccess {
    Image {
        image: vk::Image,
        range: ImageInterval,
        state: GfxImageState,
    },
    Buffer {
        buffer: vk::Buffer,
        range: BufferInterval,
        state: GfxBufferState,
    },
    AccelerationStructure {
        handle: vk::AccelerationStructureKHR,
        state: GfxAccelState,
    },
}

// 便捷构造
impl GfxResourceAccess {
    #[inline]
    pub fn image(image: vk::Image, range: vk::ImageSubresourceRange, state: GfxImageState) -> Self {
        Self::Image {
            image,
            range: ImageInterval::from_range(&range),
            state,
        }
    }

    #[inline]
    pub fn buffer(buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, state: GfxBufferState) -> Self {
        Self::Buffer {
            buffer,
            range: BufferInterval::new(offset, size),
            state,
        }
    }

    #[inline]
    pub fn acceleration_structure(handle: vk::AccelerationStructureKHR, state: GfxAccelState) -> Self {
        Self::AccelerationStructure { handle, state }
    }
}
