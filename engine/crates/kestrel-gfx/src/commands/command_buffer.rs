use std::ffi::CString;
use std::rc::Rc;

use anyhow::Context;
use ash::vk;

use crate::{
    basic::color::LabelColor,
    commands::recorder::GfxCommandRecorder,
    foundation::device::GfxDevice,
};

/// 命令缓冲封装
///
/// 只封装同步和调试相关的命令。绘制、dispatch 等命令由调用者通过
/// [`GfxCommandBuffer::vk_handle`] 直接使用 ash 录制。
///
/// # 使用示例
/// ```ignore
/// let cmd = GfxCommandBuffer::allocate(device.clone(), command_pool, "frame")?;
/// cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "frame")?;
/// tracker.request(...);
/// tracker.flush(&cmd);
/// // 绘制命令...
/// cmd.end()?;
/// ```
#[derive(Clone)]
pub struct GfxCommandBuffer {
    vk_handle: vk::CommandBuffer,
    device: Rc<GfxDevice>,

    #[cfg(debug_assertions)]
    name: String,
}
// new & init
impl GfxCommandBuffer {
    /// 从 command pool 中分配一个 primary command buffer
    pub fn allocate(device: Rc<GfxDevice>, command_pool: vk::CommandPool, debug_name: &str) -> anyhow::Result<Self> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe { device.allocate_command_buffers(&info) }
            .with_context(|| format!("failed to allocate command buffer: {debug_name}"))?;
        let vk_handle = command_buffers.into_iter().next().context("driver returned no command buffer")?;

        Ok(Self::from_raw(device, vk_handle, debug_name))
    }

    /// 包装一个外部分配的 command buffer
    #[cfg_attr(not(debug_assertions), allow(unused_variables))]
    pub fn from_raw(device: Rc<GfxDevice>, vk_handle: vk::CommandBuffer, debug_name: &str) -> Self {
        Self {
            vk_handle,
            device,

            #[cfg(debug_assertions)]
            name: debug_name.to_string(),
        }
    }
}
// getter
impl GfxCommandBuffer {
    #[inline]
    pub fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }

    #[inline]
    pub fn device(&self) -> &GfxDevice {
        &self.device
    }
}
// Basic 命令
impl GfxCommandBuffer {
    /// 开始录制 command
    ///
    /// 自动设置 debug label
    pub fn begin(&self, usage_flag: vk::CommandBufferUsageFlags, debug_label_name: &str) -> anyhow::Result<()> {
        unsafe {
            self.device
                .begin_command_buffer(self.vk_handle, &vk::CommandBufferBeginInfo::default().flags(usage_flag))
                .with_context(|| format!("failed to begin command buffer: {debug_label_name}"))?;
        }
        self.begin_label(debug_label_name, LabelColor::COLOR_CMD);
        Ok(())
    }

    /// 结束录制 command
    ///
    /// 结束 debug label
    pub fn end(&self) -> anyhow::Result<()> {
        self.end_label();
        unsafe { self.device.end_command_buffer(self.vk_handle) }.context("failed to end command buffer")?;

        #[cfg(debug_assertions)]
        log::trace!("command buffer {} recorded", self.name);
        Ok(())
    }
}

impl GfxCommandRecorder for GfxCommandBuffer {
    #[inline]
    fn vk_handle(&self) -> vk::CommandBuffer {
        self.vk_handle
    }

    #[inline]
    fn cmd_pipeline_barrier2(&self, dependency_info: &vk::DependencyInfo<'_>) {
        unsafe {
            self.device.cmd_pipeline_barrier2(self.vk_handle, dependency_info);
        }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    fn begin_label(&self, label_name: &str, label_color: glam::Vec4) {
        let Some(debug_utils) = self.device.debug_utils() else {
            return;
        };
        let name = CString::new(label_name).unwrap_or_default();
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(
                self.vk_handle,
                &vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into()),
            );
        }
    }

    /// - command type: state, action
    /// - supported queue type: graphics, compute
    fn end_label(&self) {
        if let Some(debug_utils) = self.device.debug_utils() {
            unsafe {
                debug_utils.cmd_end_debug_utils_label(self.vk_handle);
            }
        }
    }
}
