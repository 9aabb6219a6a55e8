//! ### English
//! Buffer allocator seam plus a software allocator for CPU-backed buffers.
//!
//! Platform allocators (gralloc, GBM, ...) implement [`GraphicBufferAllocator`] outside this
//! crate; strategies only ever see the trait.
//!
//! ### 中文
//! 缓冲分配器接口，以及一个用于 CPU 缓冲的软件分配器。
//!
//! 平台分配器（gralloc、GBM 等）在本 crate 之外实现 [`GraphicBufferAllocator`]；
//! 分配策略只依赖该 trait。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thiserror::Error;

use super::buffer::{Buffer, BufferProperties, NativeHandle};

/// ### English
/// Row alignment used by [`SoftwareBufferAllocator`] (bytes).
///
/// ### 中文
/// [`SoftwareBufferAllocator`] 使用的行对齐（字节）。
pub const SOFTWARE_STRIDE_ALIGNMENT: u32 = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("cannot allocate a zero-sized buffer")]
    ZeroSize,
    #[error("allocator exhausted after {allocated} buffers")]
    Exhausted { allocated: usize },
    #[error("platform allocation failed: {0}")]
    Platform(String),
}

/// ### English
/// Produces buffers on request. Must be callable synchronously from any thread.
///
/// ### 中文
/// 按请求创建缓冲。必须可以在任意线程同步调用。
pub trait GraphicBufferAllocator: Send + Sync {
    fn alloc_buffer(&self, properties: &BufferProperties) -> Result<Arc<Buffer>, AllocationError>;
}

/// ### English
/// CPU allocator: computes an aligned stride and issues sequential handles.
///
/// An optional budget caps the number of live allocations, which is how hosts bound the
/// memory a single session may pin.
///
/// ### 中文
/// CPU 分配器：计算对齐后的行跨度并按序发放句柄。
///
/// 可选的预算限制分配总数，宿主借此限制单个会话可占用的内存。
pub struct SoftwareBufferAllocator {
    next_handle: AtomicU64,
    allocated: AtomicUsize,
    budget: Option<usize>,
}

impl SoftwareBufferAllocator {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            allocated: AtomicUsize::new(0),
            budget: None,
        }
    }

    /// ### English
    /// Creates an allocator that fails once `budget` buffers have been handed out.
    ///
    /// ### 中文
    /// 创建一个分配满 `budget` 个缓冲后即失败的分配器。
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Self::new()
        }
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    fn aligned_stride(properties: &BufferProperties) -> u32 {
        let min = properties.min_stride();
        let rem = min % SOFTWARE_STRIDE_ALIGNMENT;
        if rem == 0 {
            min
        } else {
            min + (SOFTWARE_STRIDE_ALIGNMENT - rem)
        }
    }
}

impl Default for SoftwareBufferAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicBufferAllocator for SoftwareBufferAllocator {
    fn alloc_buffer(&self, properties: &BufferProperties) -> Result<Arc<Buffer>, AllocationError> {
        if properties.size.width == 0 || properties.size.height == 0 {
            return Err(AllocationError::ZeroSize);
        }

        let reserved = self.allocated.fetch_add(1, Ordering::AcqRel);
        if let Some(budget) = self.budget
            && reserved >= budget
        {
            self.allocated.fetch_sub(1, Ordering::AcqRel);
            return Err(AllocationError::Exhausted { allocated: budget });
        }

        let handle = NativeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let buffer = Buffer::new(*properties, Self::aligned_stride(properties), handle);
        log::debug!(
            "allocated software buffer {} ({}x{} {:?}, stride {})",
            buffer.id(),
            properties.size.width,
            properties.size.height,
            properties.format,
            buffer.stride()
        );
        Ok(Arc::new(buffer))
    }
}
