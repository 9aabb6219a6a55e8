//! ### English
//! Compositor buffer hand-off: buffers, allocators, swappers, strategies and bundles.
//!
//! ### 中文
//! 合成器缓冲交接：缓冲、分配器、swapper、分配策略与 bundle。
pub mod allocator;
pub mod buffer;
pub mod bundle;
pub mod config;
pub mod error;
pub(crate) mod lockfree;
pub mod shutdown;
pub mod strategy;
pub mod swapper;
