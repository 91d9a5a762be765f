//! 导入到 RenderGraph 中的资源
//!
//! RenderGraph 不创建资源，只记录外部资源的 Vulkan 句柄、子区间范围，
//! 以及执行开始时的已知状态和执行结束时需要到达的状态。

use ash::vk;
use kestrel_gfx::sync::{BufferInterval, GfxAccelState, GfxBufferState, GfxImageState, ImageInterval};

/// 图像资源条目
#[derive(Clone, Debug)]
pub struct RgImageResource {
    /// 调试名称
    pub name: String,
    pub image: vk::Image,
    pub format: vk::Format,
    pub mip_levels: u32,
    pub array_layers: u32,
    /// 执行开始时的已知状态，None 表示未知（从 UNDEFINED 开始）
    pub initial_state: Option<GfxImageState>,
    /// 执行结束时需要到达的状态
    pub final_state: Option<GfxImageState>,
}

// new & init
impl RgImageResource {
    pub fn imported(
        name: impl Into<String>,
        image: vk::Image,
        format: vk::Format,
        mip_levels: u32,
        array_layers: u32,
        initial_state: Option<GfxImageState>,
    ) -> Self {
        debug_assert!(mip_levels > 0 && array_layers > 0);
        Self {
            name: name.into(),
            image,
            format,
            mip_levels,
            array_layers,
            initial_state,
            final_state: None,
        }
    }
}

// getter
impl RgImageResource {
    /// 覆盖整个图像的子资源区间
    #[inline]
    pub fn full_range(&self) -> ImageInterval {
        ImageInterval::new(Self::infer_aspect(self.format), (0, self.mip_levels), (0, self.array_layers))
    }

    /// 根据格式推断 aspect
    pub fn infer_aspect(format: vk::Format) -> vk::ImageAspectFlags {
        match format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }

            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,

            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }

            _ => vk::ImageAspectFlags::COLOR,
        }
    }
}

/// 缓冲区资源条目
#[derive(Clone, Debug)]
pub struct RgBufferResource {
    /// 调试名称
    pub name: String,
    pub buffer: vk::Buffer,
    /// 缓冲区大小（字节）
    pub size: vk::DeviceSize,
    pub initial_state: Option<GfxBufferState>,
    pub final_state: Option<GfxBufferState>,
}

impl RgBufferResource {
    pub fn imported(
        name: impl Into<String>,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
        initial_state: Option<GfxBufferState>,
    ) -> Self {
        debug_assert!(size > 0 && size != vk::WHOLE_SIZE, "buffer size must be explicit");
        Self {
            name: name.into(),
            buffer,
            size,
            initial_state,
            final_state: None,
        }
    }

    #[inline]
    pub fn full_range(&self) -> BufferInterval {
        BufferInterval::new(0, self.size)
    }
}

/// 加速结构资源条目
#[derive(Clone, Debug)]
pub struct RgAccelResource {
    pub name: String,
    pub handle: vk::AccelerationStructureKHR,
    pub initial_state: Option<GfxAccelState>,
    pub final_state: Option<GfxAccelState>,
}

impl RgAccelResource {
    pub fn imported(
        name: impl Into<String>,
        handle: vk::AccelerationStructureKHR,
        initial_state: Option<GfxAccelState>,
    ) -> Self {
        Self {
            name: name.into(),
            handle,
            initial_state,
            final_state: None,
        }
    }
}
