//! Vulkan 封装层
//!
//! 提供命令录制、barrier 构建，以及资源状态跟踪与自动 barrier 插入。
//! 设备由外部创建后通过 [`foundation::device::GfxDevice`] 显式传入。

pub mod basic;
pub mod commands;
pub mod foundation;
pub mod sync;
