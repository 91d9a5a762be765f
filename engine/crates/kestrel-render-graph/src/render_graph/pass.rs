//! Pass 定义和构建器
//!
//! 提供 `RgPass` trait 用于声明式定义渲染 Pass，
//! 以及 `RgPassBuilder` 用于在 setup 阶段声明资源的使用方式。

use ash::vk;
use kestrel_gfx::commands::recorder::GfxCommandRecorder;
use kestrel_gfx::sync::{BufferInterval, GfxAccelState, GfxBufferState, GfxImageState, GfxResourceAccess, ImageInterval};

use crate::render_graph::executor::RgPassExecutor;
use crate::render_graph::handle::{RgAccelHandle, RgBufferHandle, RgImageHandle};
use crate::render_graph::resource::{RgBufferResource, RgImageResource};
use crate::render_graph::resource_registry::RgResourceRegistry;

/// 读写方式，只用于调试输出
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgAccessMode {
    Read,
    Write,
    ReadWrite,
}

/// 被访问的资源以及目标状态
///
/// range 为 None 时表示整个资源
#[derive(Clone, Copy, Debug)]
pub enum RgAccessTarget {
    Image {
        handle: RgImageHandle,
        range: Option<ImageInterval>,
        state: GfxImageState,
    },
    Buffer {
        handle: RgBufferHandle,
        range: Option<BufferInterval>,
        state: GfxBufferState,
    },
    Accel {
        handle: RgAccelHandle,
        state: GfxAccelState,
    },
}

/// Pass 在 setup 中声明的一次资源访问
#[derive(Clone, Copy, Debug)]
pub struct RgAccessDecl {
    pub mode: RgAccessMode,
    pub target: RgAccessTarget,
}

/// Pass 执行时的上下文
///
/// 提供 Pass 执行所需的资源访问和命令录制对象。
pub struct RgPassContext<'a> {
    /// 命令录制对象，barrier 已经在 execute 之前提交
    pub cmd: &'a dyn GfxCommandRecorder,

    pub(crate) resources: &'a RgResourceRegistry,
}

impl<'a> RgPassContext<'a> {
    /// 获取图像的 Vulkan 句柄
    #[inline]
    pub fn get_image(&self, handle: RgImageHandle) -> Option<vk::Image> {
        self.resources.get_image(handle).map(|r| r.image)
    }

    #[inline]
    pub fn get_image_resource(&self, handle: RgImageHandle) -> Option<&'a RgImageResource> {
        self.resources.get_image(handle)
    }

    /// 获取缓冲区的 Vulkan 句柄
    #[inline]
    pub fn get_buffer(&self, handle: RgBufferHandle) -> Option<vk::Buffer> {
        self.resources.get_buffer(handle).map(|r| r.buffer)
    }

    #[inline]
    pub fn get_buffer_resource(&self, handle: RgBufferHandle) -> Option<&'a RgBufferResource> {
        self.resources.get_buffer(handle)
    }

    /// 获取加速结构的 Vulkan 句柄
    #[inline]
    pub fn get_accel(&self, handle: RgAccelHandle) -> Option<vk::AccelerationStructureKHR> {
        self.resources.get_accel(handle).map(|r| r.handle)
    }
}

/// Pass 构建器
///
/// 在 `RgPass::setup()` 中使用，声明 Pass 的资源访问。
/// 声明的顺序就是执行时 request 的顺序。
pub struct RgPassBuilder {
    /// Pass 名称
    #[allow(dead_code)]
    pub(crate) name: String,

    pub(crate) accesses: Vec<RgAccessDecl>,
}

impl RgPassBuilder {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            accesses: Vec::new(),
        }
    }

    fn push(&mut self, mode: RgAccessMode, target: RgAccessTarget) {
        self.accesses.push(RgAccessDecl { mode, target });
    }

    fn image(&mut self, mode: RgAccessMode, handle: RgImageHandle, range: Option<ImageInterval>, state: GfxImageState) {
        self.push(mode, RgAccessTarget::Image { handle, range, state });
    }

    fn buffer(
        &mut self,
        mode: RgAccessMode,
        handle: RgBufferHandle,
        range: Option<BufferInterval>,
        state: GfxBufferState,
    ) {
        self.push(mode, RgAccessTarget::Buffer { handle, range, state });
    }
}

// image
impl RgPassBuilder {
    /// 声明读取图像
    ///
    /// # 参数
    /// - `handle`: 要读取的图像句柄
    /// - `state`: 期望的图像状态（用于自动生成 barrier）
    #[inline]
    pub fn read_image(&mut self, handle: RgImageHandle, state: GfxImageState) -> RgImageHandle {
        self.image(RgAccessMode::Read, handle, None, state);
        handle
    }

    /// 声明写入图像
    pub fn write_image(&mut self, handle: RgImageHandle, state: GfxImageState) -> RgImageHandle {
        self.image(RgAccessMode::Write, handle, None, state);
        handle
    }

    /// 声明读写图像（同时读取和写入）
    ///
    /// 常用于累积操作（如 RT 累积、后处理）
    pub fn read_write_image(&mut self, handle: RgImageHandle, state: GfxImageState) -> RgImageHandle {
        self.image(RgAccessMode::ReadWrite, handle, None, state);
        handle
    }

    /// 只读取图像的一部分子资源，例如生成 mipmap 时读取上一级 mip
    pub fn read_image_range(
        &mut self,
        handle: RgImageHandle,
        range: ImageInterval,
        state: GfxImageState,
    ) -> RgImageHandle {
        self.image(RgAccessMode::Read, handle, Some(range), state);
        handle
    }

    /// 只写入图像的一部分子资源
    pub fn write_image_range(
        &mut self,
        handle: RgImageHandle,
        range: ImageInterval,
        state: GfxImageState,
    ) -> RgImageHandle {
        self.image(RgAccessMode::Write, handle, Some(range), state);
        handle
    }
}

// buffer
impl RgPassBuilder {
    /// 声明读取缓冲区
    #[inline]
    pub fn read_buffer(&mut self, handle: RgBufferHandle, state: GfxBufferState) -> RgBufferHandle {
        self.buffer(RgAccessMode::Read, handle, None, state);
        handle
    }

    /// 声明写入缓冲区
    pub fn write_buffer(&mut self, handle: RgBufferHandle, state: GfxBufferState) -> RgBufferHandle {
        self.buffer(RgAccessMode::Write, handle, None, state);
        handle
    }

    pub fn read_write_buffer(&mut self, handle: RgBufferHandle, state: GfxBufferState) -> RgBufferHandle {
        self.buffer(RgAccessMode::ReadWrite, handle, None, state);
        handle
    }

    /// 读取 `[offset, offset + size)`
    pub fn read_buffer_range(
        &mut self,
        handle: RgBufferHandle,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        state: GfxBufferState,
    ) -> RgBufferHandle {
        self.buffer(RgAccessMode::Read, handle, Some(BufferInterval::new(offset, size)), state);
        handle
    }

    /// 写入 `[offset, offset + size)`
    pub fn write_buffer_range(
        &mut self,
        handle: RgBufferHandle,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        state: GfxBufferState,
    ) -> RgBufferHandle {
        self.buffer(RgAccessMode::Write, handle, Some(BufferInterval::new(offset, size)), state);
        handle
    }
}

// acceleration structure
impl RgPassBuilder {
    pub fn read_accel(&mut self, handle: RgAccelHandle, state: GfxAccelState) -> RgAccelHandle {
        self.push(RgAccessMode::Read, RgAccessTarget::Accel { handle, state });
        handle
    }

    /// 构建或者更新加速结构
    pub fn write_accel(&mut self, handle: RgAccelHandle, state: GfxAccelState) -> RgAccelHandle {
        self.push(RgAccessMode::Write, RgAccessTarget::Accel { handle, state });
        handle
    }
}

/// Pass 节点数据（编译后使用）
pub struct RgPassNode<'a> {
    /// Pass 名称
    pub name: String,

    /// setup 中声明的访问
    pub accesses: Vec<RgAccessDecl>,
    /// 编译后交给资源跟踪器的 request，已经合并过
    pub requests: Vec<GfxResourceAccess>,

    /// 执行回调（类型擦除的 Pass 实现）
    pub(crate) executor: Box<dyn RgPassExecutor + 'a>,
}

/// RgPass trait
///
/// 定义渲染图中的一个 Pass。用户需要实现此 trait 来创建自定义 Pass。
///
/// # 示例
///
/// ```ignore
/// struct BlurPass {
///     input: RgImageHandle,
///     output: RgImageHandle,
/// }
///
/// impl RgPass for BlurPass {
///     fn setup(&mut self, builder: &mut RgPassBuilder) {
///         builder.read_image(self.input, GfxImageState::SHADER_READ_COMPUTE);
///         builder.write_image(self.output, GfxImageState::STORAGE_WRITE_COMPUTE);
///     }
///
///     fn execute(&self, ctx: &RgPassContext<'_>) {
///         let input = ctx.get_image(self.input);
///         // 绑定 pipeline, dispatch...
///     }
/// }
/// ```
///
/// # 线程安全
///
/// Pass 不需要是 Send + Sync，因为 RenderGraph 在录制线程中单线程使用。
pub trait RgPass {
    /// 声明 Pass 的资源访问
    fn setup(&mut self, builder: &mut RgPassBuilder);

    /// 执行 Pass 的渲染逻辑
    ///
    /// 命令缓冲区已经开始录制，所需的 barrier 也已经提交，直接录制命令即可。
    fn execute(&self, ctx: &RgPassContext<'_>);
}
