//! RenderGraph 构建器和执行器
//!
//! 提供 `RenderGraphBuilder` 用于构建渲染图，
//! `CompiledGraph` 用于缓存编译结果，并在执行时通过资源跟踪器插入 barrier。

use ash::vk;
use itertools::Itertools;
use kestrel_gfx::basic::color::LabelColor;
use kestrel_gfx::commands::recorder::{GfxBarrierCapture, GfxCapturedBarriers, GfxCommandRecorder};
use kestrel_gfx::sync::{
    GfxAccelState, GfxBufferState, GfxImageState, GfxResourceAccess, GfxResourceTracker, GfxTrackerSettings,
};

use crate::render_graph::handle::{RgAccelHandle, RgBufferHandle, RgImageHandle};
use crate::render_graph::pass::{RgAccessDecl, RgAccessMode, RgAccessTarget, RgPass, RgPassBuilder, RgPassContext, RgPassNode};
use crate::render_graph::resource::{RgAccelResource, RgBufferResource, RgImageResource};
use crate::render_graph::resource_registry::RgResourceRegistry;

/// 类型擦除的 Pass 执行器 trait
pub(crate) trait RgPassExecutor {
    /// 执行 Pass
    fn execute(&self, ctx: &RgPassContext<'_>);
}

/// 包装用户 Pass 实现的执行器
pub(crate) struct RgPassExecutorWrapper<P: RgPass> {
    pub pass: P,
}

impl<P: RgPass> RgPassExecutor for RgPassExecutorWrapper<P> {
    fn execute(&self, ctx: &RgPassContext<'_>) {
        self.pass.execute(ctx);
    }
}

/// RenderGraph 构建器
///
/// # 使用流程
///
/// 1. 创建 builder: `RenderGraphBuilder::new()`
/// 2. 导入外部资源: `builder.import_image(...)`
/// 3. 添加 Pass: `builder.add_pass("name", pass)`
/// 4. 声明导出状态: `builder.export_image(swapchain, GfxImageState::PRESENT)`
/// 5. 编译: `builder.compile()`
/// 6. 执行: `compiled.execute(&cmd, &mut tracker)`
///
/// Pass 按照添加的顺序执行，不做重排。
///
/// # 生命周期
///
/// `'a` 是 Pass 可以借用的外部资源的生命周期。
pub struct RenderGraphBuilder<'a> {
    /// 资源注册表
    resources: RgResourceRegistry,

    /// Pass 节点列表（按添加顺序）
    passes: Vec<RgPassNode<'a>>,
}

impl Default for RenderGraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

// import & export
impl<'a> RenderGraphBuilder<'a> {
    pub fn new() -> Self {
        Self {
            resources: RgResourceRegistry::new(),
            passes: Vec::new(),
        }
    }

    /// 导入外部图像资源
    ///
    /// # 参数
    /// - `name`: 资源调试名称
    /// - `image`: Vulkan 图像句柄
    /// - `format`: 图像格式（用于推断 barrier aspect）
    /// - `mip_levels` / `array_layers`: 子资源范围
    /// - `initial_state`: 已知的初始状态，None 表示内容未知
    pub fn import_image(
        &mut self,
        name: impl Into<String>,
        image: vk::Image,
        format: vk::Format,
        mip_levels: u32,
        array_layers: u32,
        initial_state: Option<GfxImageState>,
    ) -> RgImageHandle {
        self.resources.register_image(RgImageResource::imported(
            name,
            image,
            format,
            mip_levels,
            array_layers,
            initial_state,
        ))
    }

    /// 导入外部缓冲区资源
    pub fn import_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: vk::Buffer,
        size: vk::DeviceSize,
        initial_state: Option<GfxBufferState>,
    ) -> RgBufferHandle {
        self.resources.register_buffer(RgBufferResource::imported(name, buffer, size, initial_state))
    }

    /// 导入外部加速结构
    pub fn import_accel(
        &mut self,
        name: impl Into<String>,
        handle: vk::AccelerationStructureKHR,
        initial_state: Option<GfxAccelState>,
    ) -> RgAccelHandle {
        self.resources.register_accel(RgAccelResource::imported(name, handle, initial_state))
    }

    /// 声明图像在所有 Pass 执行完之后需要到达的状态，例如 swapchain image 的 PRESENT
    pub fn export_image(&mut self, handle: RgImageHandle, final_state: GfxImageState) -> &mut Self {
        match self.resources.get_image_mut(handle) {
            Some(res) => res.final_state = Some(final_state),
            None => log::warn!("export unknown image {:?}", handle),
        }
        self
    }

    pub fn export_buffer(&mut self, handle: RgBufferHandle, final_state: GfxBufferState) -> &mut Self {
        match self.resources.get_buffer_mut(handle) {
            Some(res) => res.final_state = Some(final_state),
            None => log::warn!("export unknown buffer {:?}", handle),
        }
        self
    }

    pub fn export_accel(&mut self, handle: RgAccelHandle, final_state: GfxAccelState) -> &mut Self {
        match self.resources.get_accel_mut(handle) {
            Some(res) => res.final_state = Some(final_state),
            None => log::warn!("export unknown acceleration structure {:?}", handle),
        }
        self
    }
}

// pass & compile
impl<'a> RenderGraphBuilder<'a> {
    /// 添加 Pass
    ///
    /// # 参数
    /// - `name`: Pass 名称（用于调试 label）
    /// - `pass`: 实现了 `RgPass` trait 的 Pass 对象
    ///
    /// # 返回
    /// 返回 `&mut Self` 以支持链式调用
    pub fn add_pass<P: RgPass + 'a>(&mut self, name: impl Into<String>, mut pass: P) -> &mut Self {
        let name = name.into();

        let mut builder = RgPassBuilder::new(name.clone());
        pass.setup(&mut builder);

        self.passes.push(RgPassNode {
            name,
            accesses: builder.accesses,
            requests: Vec::new(),
            executor: Box::new(RgPassExecutorWrapper { pass }),
        });
        self
    }

    /// 编译渲染图
    ///
    /// 把每个 Pass 声明的访问解析为资源跟踪器的 request，并合并同一资源的访问。
    ///
    /// # Panics
    /// Pass 引用了没有导入的资源
    pub fn compile(self) -> CompiledGraph<'a> {
        let Self { resources, mut passes } = self;

        for pass in &mut passes {
            let requests = pass.accesses.iter().map(|decl| Self::resolve(&resources, &pass.name, decl)).collect_vec();
            pass.requests = Self::coalesce(requests);
        }

        let mut initial_tracks = Vec::new();
        let mut export_requests = Vec::new();
        for (_, res) in resources.iter_images() {
            let image_access = |state| GfxResourceAccess::Image {
                image: res.image,
                range: res.full_range(),
                state,
            };
            initial_tracks.extend(res.initial_state.map(image_access));
            export_requests.extend(res.final_state.map(image_access));
        }
        for (_, res) in resources.iter_buffers() {
            let buffer_access = |state| GfxResourceAccess::Buffer {
                buffer: res.buffer,
                range: res.full_range(),
                state,
            };
            initial_tracks.extend(res.initial_state.map(buffer_access));
            export_requests.extend(res.final_state.map(buffer_access));
        }
        for (_, res) in resources.iter_accels() {
            let accel_access = |state| GfxResourceAccess::acceleration_structure(res.handle, state);
            initial_tracks.extend(res.initial_state.map(accel_access));
            export_requests.extend(res.final_state.map(accel_access));
        }

        CompiledGraph {
            resources,
            passes,
            initial_tracks,
            export_requests,
        }
    }

    fn resolve(resources: &RgResourceRegistry, pass_name: &str, decl: &RgAccessDecl) -> GfxResourceAccess {
        match decl.target {
            RgAccessTarget::Image { handle, range, state } => {
                let res = resources
                    .get_image(handle)
                    .unwrap_or_else(|| panic!("RenderGraph: pass \"{pass_name}\" uses unknown image {handle:?}"));
                GfxResourceAccess::Image {
                    image: res.image,
                    range: range.unwrap_or_else(|| res.full_range()),
                    state,
                }
            }
            RgAccessTarget::Buffer { handle, range, state } => {
                let res = resources
                    .get_buffer(handle)
                    .unwrap_or_else(|| panic!("RenderGraph: pass \"{pass_name}\" uses unknown buffer {handle:?}"));
                GfxResourceAccess::Buffer {
                    buffer: res.buffer,
                    range: range.unwrap_or_else(|| res.full_range()),
                    state,
                }
            }
            RgAccessTarget::Accel { handle, state } => {
                let res = resources.get_accel(handle).unwrap_or_else(|| {
                    panic!("RenderGraph: pass \"{pass_name}\" uses unknown acceleration structure {handle:?}")
                });
                GfxResourceAccess::acceleration_structure(res.handle, state)
            }
        }
    }

    /// 同一个 Pass 内对同一资源同一区间的访问：
    /// 与该资源上一次访问的 layout 相同时合并 stage 和 access，否则保留为单独的 request。
    ///
    /// 只看最近一个与之重叠的 request，不能越过中间重叠的访问，否则会打乱声明顺序
    fn coalesce(requests: Vec<GfxResourceAccess>) -> Vec<GfxResourceAccess> {
        let mut merged: Vec<GfxResourceAccess> = Vec::with_capacity(requests.len());
        for request in requests {
            let last_same_target = merged
                .iter_mut()
                .rev()
                .find(|existing| Self::overlaps(existing, &request))
                .filter(|existing| Self::same_target(existing, &request));
            match (last_same_target, request) {
                (
                    Some(GfxResourceAccess::Image { state: prev, .. }),
                    GfxResourceAccess::Image { state, .. },
                ) if prev.layout == state.layout => {
                    prev.stage |= state.stage;
                    prev.access |= state.access;
                }
                (Some(GfxResourceAccess::Buffer { state: prev, .. }), GfxResourceAccess::Buffer { state, .. }) => {
                    prev.stage |= state.stage;
                    prev.access |= state.access;
                }
                (
                    Some(GfxResourceAccess::AccelerationStructure { state: prev, .. }),
                    GfxResourceAccess::AccelerationStructure { state, .. },
                ) => {
                    prev.stage |= state.stage;
                    prev.access |= state.access;
                }
                _ => merged.push(request),
            }
        }
        merged
    }

    fn overlaps(a: &GfxResourceAccess, b: &GfxResourceAccess) -> bool {
        match (a, b) {
            (
                GfxResourceAccess::Image { image: ia, range: ra, .. },
                GfxResourceAccess::Image { image: ib, range: rb, .. },
            ) => ia == ib && ra.overlaps(rb),
            (
                GfxResourceAccess::Buffer { buffer: ba, range: ra, .. },
                GfxResourceAccess::Buffer { buffer: bb, range: rb, .. },
            ) => ba == bb && ra.overlaps(rb),
            (
                GfxResourceAccess::AccelerationStructure { handle: ha, .. },
                GfxResourceAccess::AccelerationStructure { handle: hb, .. },
            ) => ha == hb,
            _ => false,
        }
    }

    fn same_target(a: &GfxResourceAccess, b: &GfxResourceAccess) -> bool {
        match (a, b) {
            (
                GfxResourceAccess::Image { image: ia, range: ra, .. },
                GfxResourceAccess::Image { image: ib, range: rb, .. },
            ) => ia == ib && ra == rb,
            (
                GfxResourceAccess::Buffer { buffer: ba, range: ra, .. },
                GfxResourceAccess::Buffer { buffer: bb, range: rb, .. },
            ) => ba == bb && ra == rb,
            (
                GfxResourceAccess::AccelerationStructure { handle: ha, .. },
                GfxResourceAccess::AccelerationStructure { handle: hb, .. },
            ) => ha == hb,
            _ => false,
        }
    }
}

/// 一个阶段（Pass 或者最后的 export）需要提交的 barrier
#[derive(Clone, Debug)]
pub struct RgPlannedBarriers {
    pub stage_name: String,
    pub barriers: Option<GfxCapturedBarriers>,
}

/// 编译后的渲染图，可以多次执行
///
/// # 生命周期
///
/// `'a` 是 Pass 借用的外部资源的生命周期。
pub struct CompiledGraph<'a> {
    /// 资源注册表
    resources: RgResourceRegistry,
    /// Pass 节点列表，也是执行顺序
    passes: Vec<RgPassNode<'a>>,
    /// 执行开始时 track 的已知状态
    initial_tracks: Vec<GfxResourceAccess>,
    /// 执行结束时 request 的导出状态
    export_requests: Vec<GfxResourceAccess>,
}

impl CompiledGraph<'_> {
    const EXPORT_STAGE_NAME: &'static str = "export";

    /// 获取 Pass 数量
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// 获取 Pass 名称
    pub fn pass_name(&self, index: usize) -> &str {
        &self.passes[index].name
    }

    /// 获取 Pass 合并后的 request
    pub fn pass_requests(&self, index: usize) -> &[GfxResourceAccess] {
        &self.passes[index].requests
    }

    pub fn resources(&self) -> &RgResourceRegistry {
        &self.resources
    }

    /// 执行渲染图
    ///
    /// # 参数
    /// - `cmd`: 命令录制对象（已经 begin）
    /// - `tracker`: 当前录制作用域的资源跟踪器，执行后保留所有资源的最新状态
    pub fn execute(&self, cmd: &dyn GfxCommandRecorder, tracker: &mut GfxResourceTracker) {
        for access in &self.initial_tracks {
            tracker.track(*access);
        }

        for pass in &self.passes {
            for access in &pass.requests {
                tracker.request(*access);
            }
            tracker.flush(cmd);

            cmd.begin_label(&pass.name, LabelColor::COLOR_PASS);
            let ctx = RgPassContext {
                cmd,
                resources: &self.resources,
            };
            pass.executor.execute(&ctx);
            cmd.end_label();
        }

        if !self.export_requests.is_empty() {
            cmd.begin_label(Self::EXPORT_STAGE_NAME, LabelColor::COLOR_STAGE);
            for access in &self.export_requests {
                tracker.request(*access);
            }
            tracker.flush(cmd);
            cmd.end_label();
        }
    }

    /// 只模拟 request 和 flush，不执行 Pass，得到每个阶段的 barrier
    pub fn plan_barriers(&self, settings: GfxTrackerSettings) -> Vec<RgPlannedBarriers> {
        let mut tracker = GfxResourceTracker::new(settings);
        let capture = GfxBarrierCapture::new();

        for access in &self.initial_tracks {
            tracker.track(*access);
        }

        let stage = |name: &str, requests: &[GfxResourceAccess], tracker: &mut GfxResourceTracker| {
            capture.clear();
            requests.iter().for_each(|access| tracker.request(*access));
            tracker.flush(&capture);
            RgPlannedBarriers {
                stage_name: name.to_string(),
                barriers: capture.barrier_batches().pop(),
            }
        };

        let mut plan = self.passes.iter().map(|pass| stage(&pass.name, &pass.requests, &mut tracker)).collect_vec();
        if !self.export_requests.is_empty() {
            plan.push(stage(Self::EXPORT_STAGE_NAME, &self.export_requests, &mut tracker));
        }
        plan
    }
}

// 调试方法
impl CompiledGraph<'_> {
    /// 打印执行计划（用于调试）
    ///
    /// 输出每个 Pass 声明的访问，以及使用默认配置模拟得到的 barrier。
    pub fn print_execution_plan(&self) {
        let plan = self.plan_barriers(GfxTrackerSettings::default());

        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Total Passes: {}  |  Execution Order: [{}]",
            self.passes.len(),
            self.passes.iter().map(|p| p.name.as_str()).join(" → ")
        );
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for (order, (pass, planned)) in self.passes.iter().zip(&plan).enumerate() {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] Pass: \"{}\"", order + 1, self.passes.len(), pass.name);
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            for decl in &pass.accesses {
                log::info!("│   {}", self.format_access(decl));
            }

            self.print_barriers(planned);
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        if let Some(export) = plan.get(self.passes.len()) {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ Export");
            log::info!("├─────────────────────────────────────────────────────────────────┤");
            self.print_barriers(export);
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    fn print_barriers(&self, planned: &RgPlannedBarriers) {
        let Some(barriers) = &planned.barriers else {
            log::info!("│ No barriers required");
            return;
        };

        log::info!(
            "│ Barriers: {} image, {} buffer, {} memory",
            barriers.image_barriers.len(),
            barriers.buffer_barriers.len(),
            barriers.memory_barriers.len()
        );
        for barrier in &barriers.image_barriers {
            let name = self.image_name(barrier.image);
            let range = barrier.subresource_range;
            log::info!(
                "│   🔒 Image \"{}\" mip [{}, +{}) layer [{}, +{}):",
                name,
                range.base_mip_level,
                range.level_count,
                range.base_array_layer,
                range.layer_count
            );
            log::info!("│       Layout: {:?} → {:?}", barrier.old_layout, barrier.new_layout);
            log::info!("│       Stage:  {:?} → {:?}", barrier.src_stage_mask, barrier.dst_stage_mask);
            log::info!("│       Access: {:?} → {:?}", barrier.src_access_mask, barrier.dst_access_mask);
        }
        for barrier in &barriers.buffer_barriers {
            let name = self.buffer_name(barrier.buffer);
            log::info!("│   🔒 Buffer \"{}\" [{}, +{}):", name, barrier.offset, barrier.size);
            log::info!("│       Stage:  {:?} → {:?}", barrier.src_stage_mask, barrier.dst_stage_mask);
            log::info!("│       Access: {:?} → {:?}", barrier.src_access_mask, barrier.dst_access_mask);
        }
        for barrier in &barriers.memory_barriers {
            log::info!("│   🔒 Memory:");
            log::info!("│       Stage:  {:?} → {:?}", barrier.src_stage_mask, barrier.dst_stage_mask);
            log::info!("│       Access: {:?} → {:?}", barrier.src_access_mask, barrier.dst_access_mask);
        }
    }

    fn format_access(&self, decl: &RgAccessDecl) -> String {
        let icon = match decl.mode {
            RgAccessMode::Read => "📖",
            RgAccessMode::Write => "✏️ ",
            RgAccessMode::ReadWrite => "🔁",
        };
        match decl.target {
            RgAccessTarget::Image { handle, range, state } => {
                let name = self.resources.get_image(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                let range = range.map(|r| format!(" {r:?}")).unwrap_or_default();
                format!(
                    "{icon} Image \"{name}\"{range} @ {:?} (stage: {:?}, access: {:?})",
                    state.layout, state.stage, state.access
                )
            }
            RgAccessTarget::Buffer { handle, range, state } => {
                let name = self.resources.get_buffer(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                let range = range.map(|r| format!(" [{}, {})", r.offset, r.end())).unwrap_or_default();
                format!("{icon} Buffer \"{name}\"{range} (stage: {:?}, access: {:?})", state.stage, state.access)
            }
            RgAccessTarget::Accel { handle, state } => {
                let name = self.resources.get_accel(handle).map(|r| r.name.as_str()).unwrap_or("<unknown>");
                format!("{icon} Accel \"{name}\" (stage: {:?}, access: {:?})", state.stage, state.access)
            }
        }
    }

    fn image_name(&self, image: vk::Image) -> &str {
        self.resources.iter_images().find(|(_, r)| r.image == image).map(|(_, r)| r.name.as_str()).unwrap_or("<unknown>")
    }

    fn buffer_name(&self, buffer: vk::Buffer) -> &str {
        self.resources
            .iter_buffers()
            .find(|(_, r)| r.buffer == buffer)
            .map(|(_, r)| r.name.as_str())
            .unwrap_or("<unknown>")
    }
}
