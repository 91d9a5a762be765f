use slotmap::SlotMap;

use crate::render_graph::handle::{RgAccelHandle, RgBufferHandle, RgImageHandle};
use crate::render_graph::resource::{RgAccelResource, RgBufferResource, RgImageResource};

/// 资源注册表
///
/// 管理 RenderGraph 中所有导入的资源，提供虚拟句柄到资源信息的映射。
#[derive(Default)]
pub struct RgResourceRegistry {
    images: SlotMap<RgImageHandle, RgImageResource>,
    buffers: SlotMap<RgBufferHandle, RgBufferResource>,
    accels: SlotMap<RgAccelHandle, RgAccelResource>,
}

// new & init
impl RgResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

// register
impl RgResourceRegistry {
    pub fn register_image(&mut self, rg_image_resource: RgImageResource) -> RgImageHandle {
        self.images.insert(rg_image_resource)
    }
    pub fn register_buffer(&mut self, rg_buffer_resource: RgBufferResource) -> RgBufferHandle {
        self.buffers.insert(rg_buffer_resource)
    }
    pub fn register_accel(&mut self, rg_accel_resource: RgAccelResource) -> RgAccelHandle {
        self.accels.insert(rg_accel_resource)
    }
}

// getter & iter
impl RgResourceRegistry {
    #[inline]
    pub fn get_image(&self, handle: RgImageHandle) -> Option<&RgImageResource> {
        self.images.get(handle)
    }

    #[inline]
    pub fn get_image_mut(&mut self, handle: RgImageHandle) -> Option<&mut RgImageResource> {
        self.images.get_mut(handle)
    }

    #[inline]
    pub fn get_buffer(&self, handle: RgBufferHandle) -> Option<&RgBufferResource> {
        self.buffers.get(handle)
    }

    #[inline]
    pub fn get_buffer_mut(&mut self, handle: RgBufferHandle) -> Option<&mut RgBufferResource> {
        self.buffers.get_mut(handle)
    }

    #[inline]
    pub fn get_accel(&self, handle: RgAccelHandle) -> Option<&RgAccelResource> {
        self.accels.get(handle)
    }

    #[inline]
    pub fn get_accel_mut(&mut self, handle: RgAccelHandle) -> Option<&mut RgAccelResource> {
        self.accels.get_mut(handle)
    }

    #[inline]
    pub fn iter_images(&self) -> impl Iterator<Item = (RgImageHandle, &RgImageResource)> {
        self.images.iter()
    }

    #[inline]
    pub fn iter_buffers(&self) -> impl Iterator<Item = (RgBufferHandle, &RgBufferResource)> {
        self.buffers.iter()
    }

    #[inline]
    pub fn iter_accels(&self) -> impl Iterator<Item = (RgAccelHandle, &RgAccelResource)> {
        self.accels.iter()
    }
}
