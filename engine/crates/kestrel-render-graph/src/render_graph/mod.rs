//! RenderGraph - 按声明顺序执行的渲染图
//!
//! 每个 Pass 声明自己要访问的资源和目标状态，执行时交给
//! [`GfxResourceTracker`](kestrel_gfx::sync::GfxResourceTracker) 生成并批量提交 barrier。
//!
//! # 核心概念
//!
//! - **RgImageHandle / RgBufferHandle / RgAccelHandle**: 虚拟资源句柄，在 graph 内部标识资源
//! - **GfxImageState / GfxBufferState / GfxAccelState**: 资源状态描述，包含 stage、access、layout
//! - **RgPass**: 渲染 Pass trait，声明资源依赖和执行逻辑
//! - **RenderGraphBuilder**: 构建器，用于注册资源和 Pass
//! - **CompiledGraph**: 编译结果，包含每个 Pass 合并后的 request
//!
//! # 使用示例
//!
//! ```ignore
//! use kestrel_render_graph::render_graph::*;
//!
//! // 1. 定义 Pass
//! struct BloomPass {
//!     input: RgImageHandle,
//!     output: RgImageHandle,
//! }
//!
//! impl RgPass for BloomPass {
//!     fn setup(&mut self, builder: &mut RgPassBuilder) {
//!         builder.read_image(self.input, GfxImageState::SHADER_READ_COMPUTE);
//!         builder.write_image(self.output, GfxImageState::STORAGE_WRITE_COMPUTE);
//!     }
//!
//!     fn execute(&self, ctx: &RgPassContext<'_>) {
//!         let cmd = ctx.cmd.vk_handle();
//!         // 绑定 descriptor sets, dispatch...
//!     }
//! }
//!
//! // 2. 构建渲染图
//! let mut builder = RenderGraphBuilder::new();
//! let input = builder.import_image("hdr", hdr_image, vk::Format::R16G16B16A16_SFLOAT, 1, 1, None);
//! let output = builder.import_image("bloom", bloom_image, vk::Format::R16G16B16A16_SFLOAT, 1, 1, None);
//! builder.add_pass("bloom", BloomPass { input, output });
//!
//! // 3. 编译
//! let graph = builder.compile();
//!
//! // 4. 执行
//! cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, "render-graph")?;
//! graph.execute(&cmd, &mut tracker);
//! cmd.end()?;
//! ```

mod executor;
mod handle;
mod pass;
mod resource;
mod resource_registry;

pub use executor::{CompiledGraph, RenderGraphBuilder, RgPlannedBarriers};
pub use handle::{RgAccelHandle, RgBufferHandle, RgImageHandle};
pub use pass::{RgAccessDecl, RgAccessMode, RgAccessTarget, RgPass, RgPassBuilder, RgPassContext, RgPassNode};
pub use resource::{RgAccelResource, RgBufferResource, RgImageResource};
pub use resource_registry::RgResourceRegistry;

// 重新导出常用的状态类型
pub use kestrel_gfx::sync::{BufferInterval, GfxAccelState, GfxBufferState, GfxImageState, ImageInterval};
