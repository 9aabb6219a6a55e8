//! ### English
//! Buffer bundle: the per-surface façade the client session and the render loop talk to.
//!
//! ### 中文
//! 缓冲 bundle：客户端会话与渲染循环访问的每 surface 门面。
use std::io;
use std::sync::Arc;
use std::thread;

use super::buffer::{Buffer, BufferProperties};
use super::error::StrategyError;
use super::shutdown::ShutdownToken;
use super::strategy::BufferAllocationStrategy;
use super::swapper::{BufferSwapper, Census};

mod handle;

pub use handle::{ClientBuffer, CompositorBuffer, SnapshotBuffer};

/// ### English
/// Owns one swapper and hands out RAII handles to it.
///
/// ### 中文
/// 持有一个 swapper，并对外提供 RAII 句柄。
pub struct BufferBundle {
    swapper: Arc<dyn BufferSwapper>,
    properties: BufferProperties,
}

impl BufferBundle {
    /// ### English
    /// Allocates buffers through `strategy` and wraps the resulting swapper.
    ///
    /// ### 中文
    /// 通过 `strategy` 分配缓冲，并包装生成的 swapper。
    pub fn new(
        strategy: &BufferAllocationStrategy,
        properties: BufferProperties,
    ) -> Result<Self, StrategyError> {
        let swapper = strategy.create_swapper(&properties)?;
        Ok(Self::from_swapper(swapper, properties))
    }

    pub fn from_swapper(swapper: Arc<dyn BufferSwapper>, properties: BufferProperties) -> Self {
        Self {
            swapper,
            properties,
        }
    }

    /// ### English
    /// Client path: blocks for a free buffer. `None` once the bundle is shut down.
    ///
    /// ### 中文
    /// 客户端路径：阻塞等待空闲缓冲。bundle 关闭后返回 `None`。
    pub fn secure_client_buffer(&self) -> Option<ClientBuffer> {
        let buffer = self.swapper.client_acquire()?;
        Some(ClientBuffer::new(Arc::clone(&self.swapper), buffer))
    }

    /// ### English
    /// Compositor path: the newest frame (or the previous one again).
    ///
    /// ### 中文
    /// 合成器路径：最新帧（或再次返回上一帧）。
    pub fn lock_back_buffer(&self) -> Option<CompositorBuffer> {
        let buffer = self.swapper.compositor_acquire()?;
        Some(CompositorBuffer::new(Arc::clone(&self.swapper), buffer))
    }

    /// ### English
    /// Like [`Self::lock_back_buffer`], then runs `bind` (e.g. a texture upload) on the locked
    /// buffer before handing the lock out.
    ///
    /// ### 中文
    /// 与 [`Self::lock_back_buffer`] 相同，并在返回前对锁定的缓冲执行 `bind`（例如纹理上传）。
    pub fn lock_and_bind_back_buffer(
        &self,
        bind: impl FnOnce(&Buffer),
    ) -> Option<CompositorBuffer> {
        let locked = self.lock_back_buffer()?;
        bind(&locked);
        Some(locked)
    }

    /// ### English
    /// Shares the displayed frame for reading without consuming it.
    ///
    /// ### 中文
    /// 共享当前显示的帧用于读取，不消费该帧。
    pub fn snapshot(&self) -> Option<SnapshotBuffer> {
        let buffer = self.swapper.snapshot_acquire()?;
        Some(SnapshotBuffer::new(Arc::clone(&self.swapper), buffer))
    }

    /// ### English
    /// With frame dropping on, a client that finds no free buffer reuses the oldest unshown
    /// frame instead of waiting for the compositor.
    ///
    /// ### 中文
    /// 开启丢帧后，找不到空闲缓冲的客户端会复用最早的未显示帧，而不是等待合成器。
    pub fn allow_framedropping(&self, allow: bool) {
        self.swapper.allow_framedropping(allow);
    }

    /// ### English
    /// Unblocks every waiting client; later acquires return `None`.
    ///
    /// ### 中文
    /// 解除所有等待中客户端的阻塞；之后的 acquire 返回 `None`。
    pub fn force_requests_to_complete(&self) {
        self.swapper.shutdown();
    }

    pub fn shutdown(&self) {
        self.force_requests_to_complete();
    }

    /// ### English
    /// Spawns a watcher that shuts the swapper down when `token` fires.
    ///
    /// The watcher only holds the swapper, so the bundle itself may be dropped first.
    ///
    /// ### 中文
    /// 启动一个观察线程：`token` 触发时关闭 swapper。
    ///
    /// 观察线程只持有 swapper，因此 bundle 本身可以先被 drop。
    pub fn shutdown_on(&self, token: ShutdownToken) -> io::Result<thread::JoinHandle<()>> {
        let swapper = Arc::clone(&self.swapper);
        thread::Builder::new()
            .name("bundle-shutdown".into())
            .spawn(move || {
                token.wait();
                swapper.shutdown();
            })
    }

    pub fn properties(&self) -> BufferProperties {
        self.properties
    }

    pub fn buffer_count(&self) -> usize {
        self.swapper.buffer_count()
    }

    pub fn census(&self) -> Census {
        self.swapper.census()
    }

    pub fn is_shut_down(&self) -> bool {
        self.swapper.is_shut_down()
    }
}
