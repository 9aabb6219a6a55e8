//! ### English
//! `compositor_swapper` crate root.
//! Buffer ownership hand-off between display-server clients and the compositor; the core
//! implementation lives under `compositor`.
//!
//! ### 中文
//! `compositor_swapper` 的 crate 根。
//! 显示服务器客户端与合成器之间的缓冲所有权交接；核心实现位于 `compositor` 模块。
pub mod compositor;

pub use compositor::allocator::{AllocationError, GraphicBufferAllocator, SoftwareBufferAllocator};
pub use compositor::buffer::{Buffer, BufferId, BufferProperties, BufferUsage, NativeHandle, PixelFormat};
pub use compositor::bundle::{BufferBundle, ClientBuffer, CompositorBuffer, SnapshotBuffer};
pub use compositor::config::SwapperConfig;
pub use compositor::error::{ParseSwapperKindError, StrategyError, SwapperError};
pub use compositor::shutdown::{ShutdownToken, ShutdownTrigger};
pub use compositor::strategy::{BufferAllocationStrategy, MAX_BUFFERS, MIN_BUFFERS, SwapperKind};
pub use compositor::swapper::{BufferSwapper, Census, DoubleBufferSwapper, MultiBufferSwapper};
