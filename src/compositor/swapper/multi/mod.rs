//! ### English
//! N-buffer swapper (N ≥ 2) built on one mutex and two condition variables.
//!
//! Free buffers go to the client FIFO; completed frames go to the compositor newest-first,
//! with older completed frames recycled as free instead of being shown late.
//!
//! ### 中文
//! 基于一把互斥锁与两个条件变量的 N 缓冲 swapper（N ≥ 2）。
//!
//! 空闲缓冲按 FIFO 交给客户端；已完成帧按“最新优先”交给合成器，
//! 更早的已完成帧会被回收为空闲，而不是延迟显示。
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::compositor::buffer::Buffer;
use crate::compositor::error::{StrategyError, SwapperError};

use super::{BufferSwapper, Census};

mod client;
mod compositor;
mod state;

use state::SwapState;

pub struct MultiBufferSwapper {
    state: Mutex<SwapState>,
    /// ### English
    /// Signalled when a buffer enters the free queue (or on shutdown).
    ///
    /// ### 中文
    /// 有缓冲进入空闲队列（或 shutdown）时通知。
    client_available: Condvar,
    /// ### English
    /// Signalled when the client completes a frame (or on shutdown).
    ///
    /// ### 中文
    /// 客户端完成一帧（或 shutdown）时通知。
    frame_available: Condvar,
}

impl MultiBufferSwapper {
    /// ### English
    /// Creates a swapper owning `buffers`. The first buffer is queued as the startup frame.
    ///
    /// Fails with [`StrategyError::InvalidBufferCount`] outside `MIN_BUFFERS..=MAX_BUFFERS` and
    /// with [`StrategyError::DuplicateBuffer`] when a buffer appears twice.
    ///
    /// ### 中文
    /// 创建持有 `buffers` 的 swapper。第一个缓冲作为启动帧进入合成器队列。
    ///
    /// 数量超出 `MIN_BUFFERS..=MAX_BUFFERS` 时返回 [`StrategyError::InvalidBufferCount`]；
    /// 同一缓冲出现两次时返回 [`StrategyError::DuplicateBuffer`]。
    pub fn new(buffers: Vec<Arc<Buffer>>) -> Result<Self, StrategyError> {
        let count = buffers.len();
        let state = SwapState::new(buffers)?;
        log::debug!("multi buffer swapper over {count} buffers");
        Ok(Self {
            state: Mutex::new(state),
            client_available: Condvar::new(),
            frame_available: Condvar::new(),
        })
    }
}

impl BufferSwapper for MultiBufferSwapper {
    fn client_acquire(&self) -> Option<Arc<Buffer>> {
        self.acquire_for_client()
    }

    fn client_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.release_from_client(buffer)
    }

    fn compositor_acquire(&self) -> Option<Arc<Buffer>> {
        self.acquire_for_compositor()
    }

    fn compositor_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.release_from_compositor(buffer)
    }

    fn snapshot_acquire(&self) -> Option<Arc<Buffer>> {
        self.acquire_for_snapshot()
    }

    fn snapshot_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.release_from_snapshot(buffer)
    }

    fn allow_framedropping(&self, allow: bool) {
        self.set_framedropping(allow);
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        state.shutdown = true;
        drop(state);

        let woken = self.client_available.notify_all() + self.frame_available.notify_all();
        log::debug!("multi buffer swapper shut down, woke {woken} waiter(s)");
    }

    fn is_shut_down(&self) -> bool {
        self.state.lock().shutdown
    }

    fn buffer_count(&self) -> usize {
        self.state.lock().buffer_count()
    }

    fn census(&self) -> Census {
        self.state.lock().census()
    }
}
