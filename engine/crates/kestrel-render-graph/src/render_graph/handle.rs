//! RenderGraph 资源句柄定义
//!
//! 这些句柄是 graph 内部的虚拟引用，在 [`RgResourceRegistry`](super::RgResourceRegistry) 中解析为 Vulkan 句柄。

use slotmap::new_key_type;

new_key_type! { pub struct RgImageHandle; }
new_key_type! { pub struct RgBufferHandle; }
new_key_type! { pub struct RgAccelHandle; }
