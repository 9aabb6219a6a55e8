//! ### English
//! RAII buffer handles: the matching release runs on every exit path.
//!
//! ### 中文
//! RAII 缓冲句柄：所有退出路径上都会执行对应的 release。
use std::ops::Deref;
use std::sync::Arc;

use crate::compositor::buffer::Buffer;
use crate::compositor::error::SwapperError;
use crate::compositor::swapper::BufferSwapper;

/// ### English
/// Which side of the swapper a handle returns its buffer to.
///
/// ### 中文
/// 句柄将缓冲归还到 swapper 的哪一侧。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Client,
    Compositor,
    Snapshot,
}

struct Lease {
    swapper: Arc<dyn BufferSwapper>,
    buffer: Arc<Buffer>,
    side: Side,
    released: bool,
}

impl Lease {
    fn new(swapper: Arc<dyn BufferSwapper>, buffer: Arc<Buffer>, side: Side) -> Self {
        Self {
            swapper,
            buffer,
            side,
            released: false,
        }
    }

    fn release(&mut self) -> Result<(), SwapperError> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        match self.side {
            Side::Client => self.swapper.client_release(&self.buffer),
            Side::Compositor => self.swapper.compositor_release(&self.buffer),
            Side::Snapshot => self.swapper.snapshot_release(&self.buffer),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!("{:?} handle failed to release its buffer: {err}", self.side);
        }
    }
}

/// ### English
/// A buffer lent to the client for rendering. Dropping it posts the frame.
///
/// ### 中文
/// 借给客户端用于渲染的缓冲。drop 时发布该帧。
pub struct ClientBuffer {
    lease: Lease,
}

impl ClientBuffer {
    pub(super) fn new(swapper: Arc<dyn BufferSwapper>, buffer: Arc<Buffer>) -> Self {
        Self {
            lease: Lease::new(swapper, buffer, Side::Client),
        }
    }

    /// ### English
    /// Posts the frame now and reports protocol errors instead of logging them.
    ///
    /// ### 中文
    /// 立即发布该帧，并返回（而非仅记录）协议错误。
    pub fn release(mut self) -> Result<(), SwapperError> {
        self.lease.release()
    }
}

impl Deref for ClientBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.lease.buffer
    }
}

/// ### English
/// A buffer lent to the compositor for display. Dropping it returns the buffer to the pool.
///
/// ### 中文
/// 借给合成器用于显示的缓冲。drop 时归还到缓冲池。
pub struct CompositorBuffer {
    lease: Lease,
}

impl CompositorBuffer {
    pub(super) fn new(swapper: Arc<dyn BufferSwapper>, buffer: Arc<Buffer>) -> Self {
        Self {
            lease: Lease::new(swapper, buffer, Side::Compositor),
        }
    }

    pub fn release(mut self) -> Result<(), SwapperError> {
        self.lease.release()
    }
}

impl Deref for CompositorBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.lease.buffer
    }
}

/// ### English
/// A read-only share of the displayed frame. Dropping it lets the buffer return to the pool.
///
/// ### 中文
/// 对当前显示帧的只读共享。drop 后缓冲可回到缓冲池。
pub struct SnapshotBuffer {
    lease: Lease,
}

impl SnapshotBuffer {
    pub(super) fn new(swapper: Arc<dyn BufferSwapper>, buffer: Arc<Buffer>) -> Self {
        Self {
            lease: Lease::new(swapper, buffer, Side::Snapshot),
        }
    }

    pub fn release(mut self) -> Result<(), SwapperError> {
        self.lease.release()
    }
}

impl Deref for SnapshotBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.lease.buffer
    }
}
