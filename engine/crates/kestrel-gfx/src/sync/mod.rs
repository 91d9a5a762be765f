//! 资源状态跟踪与自动 barrier
//!
//! - `interval` / `interval_set`: buffer 字节区间和 image 子资源区间
//! - `resource_state`: 被跟踪的状态以及 [`GfxResourceAccess`]
//! - `hazard`: 判断两次访问之间是否需要 barrier
//! - `resource_tracker`: 状态存储、track / request 以及 barrier 的批量提交
//!
//! 典型用法：pass 在录制命令之前对每个要访问的资源调用 `request`，
//! 然后调用一次 `flush`，再录制自己的命令。
//!
//! ```ignore
//! let mut tracker = GfxResourceTracker::new(GfxTrackerSettings::default());
//! tracker.track(GfxResourceAccess::image(swapchain_image, full_range, GfxImageState::UNDEFINED));
//!
//! tracker.request(GfxResourceAccess::image(swapchain_image, full_range, GfxImageState::COLOR_ATTACHMENT_WRITE));
//! tracker.request(GfxResourceAccess::buffer(vertex_buffer, 0, size, GfxBufferState::VERTEX_BUFFER));
//! tracker.flush(&cmd);
//! // draw...
//! ```

pub mod hazard;
pub mod interval;
pub mod interval_set;
pub mod resource_state;
pub mod resource_tracker;
pub mod settings;

pub use interval::{BufferInterval, ImageInterval};
pub use interval_set::{BufferIntervalSet, ImageIntervalSet};
pub use resource_state::{GfxAccelState, GfxBufferState, GfxImageState, GfxResourceAccess};
pub use resource_tracker::GfxResourceTracker;
pub use settings::{GfxTrackerSettings, GfxUntrackedPolicy};
