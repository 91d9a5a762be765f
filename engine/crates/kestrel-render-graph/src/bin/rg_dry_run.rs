//! RenderGraph dry run
//!
//! 构建一个延迟渲染帧（G-Buffer、光追阴影、光照、天空、tonemap、present），
//! 录制到内存中的 `GfxBarrierCapture`，打印执行计划以及每一批 barrier。
//!
//! 参数：
//! - `--full-barrier`: 从未跟踪过的 buffer 和加速结构按照 `GfxUntrackedPolicy::FullBarrier` 处理
//! - `--frames <n>`: 使用同一个 tracker 连续执行 n 帧，默认 2

use ash::vk;
use ash::vk::Handle;
use clap::Parser;
use kestrel_crate_tools::init_log::init_log;
use kestrel_gfx::commands::recorder::{GfxBarrierCapture, GfxCapturedCommand};
use kestrel_gfx::sync::{GfxResourceTracker, GfxTrackerSettings, GfxUntrackedPolicy};
use kestrel_render_graph::render_graph::*;

/// 只声明资源访问的 Pass，execute 时记录一条日志
struct DryRunPass<S: FnMut(&mut RgPassBuilder)> {
    label: &'static str,
    setup: S,
}

impl<S: FnMut(&mut RgPassBuilder)> RgPass for DryRunPass<S> {
    fn setup(&mut self, builder: &mut RgPassBuilder) {
        (self.setup)(builder);
    }

    fn execute(&self, ctx: &RgPassContext<'_>) {
        log::debug!("execute {} on {:?}", self.label, ctx.cmd.vk_handle());
    }
}

fn dry_pass<S: FnMut(&mut RgPassBuilder)>(label: &'static str, setup: S) -> DryRunPass<S> {
    DryRunPass { label, setup }
}

/// 伪造的 Vulkan 句柄，只用于区分资源
struct FrameHandles {
    albedo: vk::Image,
    normal: vk::Image,
    depth: vk::Image,
    shadow_mask: vk::Image,
    hdr: vk::Image,
    swapchain: vk::Image,
    vertices: vk::Buffer,
    frame_uniform: vk::Buffer,
    instances: vk::Buffer,
    scratch: vk::Buffer,
    tlas: vk::AccelerationStructureKHR,
}

impl FrameHandles {
    fn fake() -> Self {
        Self {
            albedo: vk::Image::from_raw(0x10),
            normal: vk::Image::from_raw(0x11),
            depth: vk::Image::from_raw(0x12),
            shadow_mask: vk::Image::from_raw(0x13),
            hdr: vk::Image::from_raw(0x14),
            swapchain: vk::Image::from_raw(0x15),
            vertices: vk::Buffer::from_raw(0x20),
            frame_uniform: vk::Buffer::from_raw(0x21),
            instances: vk::Buffer::from_raw(0x22),
            scratch: vk::Buffer::from_raw(0x23),
            tlas: vk::AccelerationStructureKHR::from_raw(0x30),
        }
    }
}

fn build_frame(handles: &FrameHandles) -> CompiledGraph<'static> {
    let mut builder = RenderGraphBuilder::new();

    let albedo = builder.import_image("gbuffer-albedo", handles.albedo, vk::Format::R8G8B8A8_UNORM, 1, 1, None);
    let normal = builder.import_image("gbuffer-normal", handles.normal, vk::Format::R16G16B16A16_SFLOAT, 1, 1, None);
    let depth = builder.import_image("depth", handles.depth, vk::Format::D32_SFLOAT, 1, 1, None);
    let shadow_mask = builder.import_image("shadow-mask", handles.shadow_mask, vk::Format::R8_UNORM, 1, 1, None);
    let hdr = builder.import_image("hdr", handles.hdr, vk::Format::R16G16B16A16_SFLOAT, 1, 1, None);
    let swapchain = builder.import_image("swapchain", handles.swapchain, vk::Format::B8G8R8A8_UNORM, 1, 1, None);

    let vertices = builder.import_buffer("vertices", handles.vertices, 4 << 20, Some(GfxBufferState::VERTEX_BUFFER));
    let frame_uniform =
        builder.import_buffer("frame-uniform", handles.frame_uniform, 256, Some(GfxBufferState::HOST_WRITE));
    let instances =
        builder.import_buffer("tlas-instances", handles.instances, 64 << 10, Some(GfxBufferState::HOST_WRITE));
    let scratch = builder.import_buffer("tlas-scratch", handles.scratch, 1 << 20, None);
    let tlas = builder.import_accel("tlas", handles.tlas, None);

    builder
        .add_pass(
            "build-tlas",
            dry_pass("build-tlas", move |b| {
                b.read_buffer(instances, GfxBufferState::ACCELERATION_STRUCTURE_BUILD_INPUT);
                b.read_write_buffer(scratch, GfxBufferState::ACCELERATION_STRUCTURE_SCRATCH);
                b.write_accel(tlas, GfxAccelState::BUILD_WRITE);
            }),
        )
        .add_pass(
            "gbuffer",
            dry_pass("gbuffer", move |b| {
                b.read_buffer(vertices, GfxBufferState::VERTEX_BUFFER);
                b.read_buffer(frame_uniform, GfxBufferState::UNIFORM_FRAGMENT);
                b.write_image(albedo, GfxImageState::COLOR_ATTACHMENT_WRITE);
                b.write_image(normal, GfxImageState::COLOR_ATTACHMENT_WRITE);
                b.write_image(depth, GfxImageState::DEPTH_ATTACHMENT_WRITE);
            }),
        )
        .add_pass(
            "rt-shadow",
            dry_pass("rt-shadow", move |b| {
                b.read_accel(tlas, GfxAccelState::RAY_TRACING_READ);
                b.read_image(depth, GfxImageState::SHADER_READ_RAY_TRACING);
                b.write_image(shadow_mask, GfxImageState::STORAGE_WRITE_RAY_TRACING);
            }),
        )
        .add_pass(
            "lighting",
            dry_pass("lighting", move |b| {
                b.read_image(albedo, GfxImageState::SHADER_READ_COMPUTE);
                b.read_image(normal, GfxImageState::SHADER_READ_COMPUTE);
                b.read_image(depth, GfxImageState::SHADER_READ_COMPUTE);
                b.read_image(shadow_mask, GfxImageState::SHADER_READ_COMPUTE);
                b.write_image(hdr, GfxImageState::STORAGE_WRITE_COMPUTE);
            }),
        )
        .add_pass(
            "sky",
            dry_pass("sky", move |b| {
                b.read_image(depth, GfxImageState::DEPTH_READ_ONLY);
                b.read_write_image(hdr, GfxImageState::COLOR_ATTACHMENT_READ_WRITE);
            }),
        )
        .add_pass(
            "tonemap",
            dry_pass("tonemap", move |b| {
                b.read_image(hdr, GfxImageState::SHADER_READ_FRAGMENT);
                b.write_image(swapchain, GfxImageState::COLOR_ATTACHMENT_WRITE);
            }),
        );

    builder.export_image(swapchain, GfxImageState::PRESENT);
    builder.compile()
}

/// RenderGraph dry run 参数
#[derive(Parser, Debug)]
#[command(name = "rg-dry-run", about = "打印延迟渲染帧的 barrier 计划")]
struct Args {
    /// 从未跟踪过的 buffer 和加速结构按照 FullBarrier 处理
    #[arg(long)]
    full_barrier: bool,

    /// 使用同一个 tracker 连续执行的帧数
    #[arg(long, default_value_t = 2)]
    frames: usize,
}

impl Args {
    fn tracker_settings(&self) -> GfxTrackerSettings {
        let mut settings = GfxTrackerSettings::default();
        if self.full_barrier {
            settings.untracked_policy = GfxUntrackedPolicy::FullBarrier;
        }
        settings
    }
}

fn log_commands(capture: &GfxBarrierCapture) {
    let mut batch_index = 0;
    for command in capture.commands().iter() {
        match command {
            GfxCapturedCommand::BeginLabel(name) => log::info!("begin \"{}\"", name),
            GfxCapturedCommand::EndLabel => log::info!("end"),
            GfxCapturedCommand::PipelineBarrier(batch) => {
                log::info!("  barrier batch #{} ({} barriers)", batch_index, batch.barrier_count());
                for b in &batch.image_barriers {
                    log::info!(
                        "    image {:?} mip {} layer {}: {:?} -> {:?} | {:?} -> {:?}",
                        b.image,
                        b.subresource_range.base_mip_level,
                        b.subresource_range.base_array_layer,
                        b.old_layout,
                        b.new_layout,
                        b.src_stage_mask,
                        b.dst_stage_mask
                    );
                }
                for b in &batch.buffer_barriers {
                    log::info!(
                        "    buffer {:?} [{}, +{}): {:?} -> {:?}",
                        b.buffer,
                        b.offset,
                        b.size,
                        b.src_access_mask,
                        b.dst_access_mask
                    );
                }
                for b in &batch.memory_barriers {
                    log::info!("    memory: {:?} -> {:?}", b.src_access_mask, b.dst_access_mask);
                }
                batch_index += 1;
            }
        }
    }
}

fn main() {
    init_log();

    let args = Args::parse();
    let settings = args.tracker_settings();
    log::info!("tracker settings: {:?}", settings);

    let handles = FrameHandles::fake();
    let graph = build_frame(&handles);
    graph.print_execution_plan();

    let mut tracker = GfxResourceTracker::new(settings);
    let capture = GfxBarrierCapture::new();
    for frame in 0..args.frames {
        capture.clear();
        graph.execute(&capture, &mut tracker);

        let batches = capture.barrier_batches();
        log::info!(
            "frame {}: {} barrier batches, {} barriers",
            frame,
            batches.len(),
            batches.iter().map(|b| b.barrier_count()).sum::<usize>()
        );
        log_commands(&capture);
    }
}
