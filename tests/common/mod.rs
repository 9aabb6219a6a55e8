#![allow(dead_code)]

use std::sync::Arc;

use compositor_swapper::{
    BufferAllocationStrategy, BufferProperties, BufferSwapper, BufferUsage, PixelFormat,
    SoftwareBufferAllocator, SwapperKind,
};
use dpi::PhysicalSize;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn properties() -> BufferProperties {
    BufferProperties::new(
        PhysicalSize::new(320, 240),
        PixelFormat::Argb8888,
        BufferUsage::Software,
    )
}

pub fn swapper(kind: SwapperKind, count: usize) -> Arc<dyn BufferSwapper> {
    let allocator = Arc::new(SoftwareBufferAllocator::new());
    BufferAllocationStrategy::new(allocator, count, kind)
        .unwrap()
        .create_swapper(&properties())
        .unwrap()
}

/// Every swapper configuration worth exercising.
pub fn all_swappers() -> Vec<(SwapperKind, usize)> {
    let mut configs = vec![(SwapperKind::Double, 2)];
    configs.extend((2..=5).map(|count| (SwapperKind::Multi, count)));
    configs
}
