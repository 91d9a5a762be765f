use std::ops::Deref;

use ash::vk;

/// Vulkan 逻辑设备的函数表
///
/// 设备本身由外部创建和销毁，这里只持有核心 API 和调试扩展的函数指针。
/// 需要录制命令的对象通过 `Rc<GfxDevice>` 共享同一份函数表。
///
/// # 扩展要求
/// - Synchronization2（core 1.3），`cmd_pipeline_barrier2` 依赖它
/// - Debug Utils (EXT)，可选，用于 debug label
pub struct GfxDevice {
    /// 核心 Vulkan 设备 API
    device: ash::Device,
    /// 调试工具扩展 API
    debug_utils: Option<ash::ext::debug_utils::Device>,
}

// 构造
impl GfxDevice {
    /// 包装一个已经创建好的设备
    ///
    /// `enable_debug_utils` 为 true 时要求 instance 启用了 `VK_EXT_debug_utils`
    pub fn new(instance: &ash::Instance, device: ash::Device, enable_debug_utils: bool) -> Self {
        let debug_utils = enable_debug_utils.then(|| ash::ext::debug_utils::Device::new(instance, &device));
        log::info!("wrap device {:?}, debug utils: {}", device.handle(), enable_debug_utils);

        Self { device, debug_utils }
    }
}

// getter
impl GfxDevice {
    #[inline]
    pub fn handle(&self) -> vk::Device {
        self.device.handle()
    }

    #[inline]
    pub fn debug_utils(&self) -> Option<&ash::ext::debug_utils::Device> {
        self.debug_utils.as_ref()
    }
}

impl Deref for GfxDevice {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        &self.device
    }
}
