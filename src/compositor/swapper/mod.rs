//! ### English
//! Buffer swapper contract: the ownership hand-off between one client (producer) and the
//! compositor (consumer).
//!
//! Every buffer is always in exactly one of three places: free (including "ready for the
//! compositor"), lent to the client, or lent to the compositor. Swappers are the only code
//! allowed to move a buffer between them.
//!
//! ### 中文
//! 缓冲 swapper 约定：客户端（生产者）与合成器（消费者）之间的所有权交接。
//!
//! 每个缓冲在任意时刻恰好处于以下之一：空闲（包括“等待合成器取用”）、借给客户端、借给合成器。
//! 只有 swapper 可以在这三者之间移动缓冲。
use std::sync::Arc;

use super::buffer::Buffer;
use super::error::SwapperError;

mod double;
mod multi;

pub use double::DoubleBufferSwapper;
pub use multi::MultiBufferSwapper;

/// ### English
/// Ownership counts at one instant. `free + client + compositor` always equals the buffer
/// count.
///
/// ### 中文
/// 某一时刻的所有权计数。`free + client + compositor` 恒等于缓冲总数。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Census {
    pub free: usize,
    pub client: usize,
    pub compositor: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.free + self.client + self.compositor
    }
}

/// ### English
/// Thread-safe buffer hand-off between a client and the compositor.
///
/// Acquires return `None` only after [`BufferSwapper::shutdown`]. Releases reject buffers the
/// caller does not hold with a [`SwapperError`]; they keep working after shutdown so that
/// outstanding handles can still be returned.
///
/// ### 中文
/// 客户端与合成器之间线程安全的缓冲交接。
///
/// acquire 仅在 [`BufferSwapper::shutdown`] 之后返回 `None`。release 会以 [`SwapperError`]
/// 拒绝调用方未持有的缓冲；shutdown 之后 release 仍然可用，以便归还未完成的句柄。
pub trait BufferSwapper: Send + Sync {
    /// ### English
    /// Takes a buffer for the client to render into, blocking while none is free.
    ///
    /// ### 中文
    /// 为客户端取得一个可写缓冲；没有空闲缓冲时阻塞。
    fn client_acquire(&self) -> Option<Arc<Buffer>>;

    /// ### English
    /// Hands a fully rendered buffer back; it becomes the newest frame.
    ///
    /// ### 中文
    /// 归还一个已渲染完成的缓冲；它成为最新帧。
    fn client_release(&self, buffer: &Buffer) -> Result<(), SwapperError>;

    /// ### English
    /// Takes the newest completed frame, or the previous one again if nothing new is ready.
    ///
    /// Acquiring again before releasing is legal (for example once per output): the frame on
    /// screen is shared and each acquire needs its own release.
    ///
    /// ### 中文
    /// 取得最新完成的帧；若没有新帧，则再次返回上一帧。
    ///
    /// 在 release 之前再次 acquire 是合法的（例如每个输出各一次）：正在显示的帧会被共享，
    /// 每次 acquire 都需要对应一次 release。
    fn compositor_acquire(&self) -> Option<Arc<Buffer>>;

    fn compositor_release(&self, buffer: &Buffer) -> Result<(), SwapperError>;

    /// ### English
    /// Shares the displayed frame for reading (screenshots, recording) without consuming it.
    /// The client cannot get the buffer back until the snapshot is released.
    ///
    /// ### 中文
    /// 共享当前显示的帧用于读取（截图、录制），不消费该帧。快照释放之前客户端无法取回该缓冲。
    fn snapshot_acquire(&self) -> Option<Arc<Buffer>>;

    fn snapshot_release(&self, buffer: &Buffer) -> Result<(), SwapperError>;

    /// ### English
    /// Lets a client that finds no free buffer reuse the oldest ready frame instead of waiting.
    /// Swappers whose client never waits on ready frames ignore it.
    ///
    /// ### 中文
    /// 允许找不到空闲缓冲的客户端复用最早的就绪帧而不是等待。客户端从不等待就绪帧的 swapper
    /// 会忽略该设置。
    fn allow_framedropping(&self, allow: bool) {
        let _ = allow;
    }

    /// ### English
    /// Wakes every blocked acquirer and makes all later acquires return `None`.
    ///
    /// ### 中文
    /// 唤醒所有阻塞的 acquire 调用，并使之后的 acquire 全部返回 `None`。
    fn shutdown(&self);

    fn is_shut_down(&self) -> bool;

    fn buffer_count(&self) -> usize;

    fn census(&self) -> Census;
}
