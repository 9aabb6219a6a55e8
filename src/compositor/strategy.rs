//! ### English
//! Buffer allocation strategy: decides how many buffers a surface gets and which swapper
//! flavour arbitrates them.
//!
//! ### 中文
//! 缓冲分配策略：决定一个 surface 拥有多少缓冲，以及由哪种 swapper 管理它们。
use std::sync::Arc;

use super::allocator::GraphicBufferAllocator;
use super::buffer::BufferProperties;
use super::config::SwapperConfig;
use super::error::StrategyError;
use super::swapper::{BufferSwapper, DoubleBufferSwapper, MultiBufferSwapper};

/// ### English
/// Fewest buffers any swapper manages.
///
/// ### 中文
/// 任何 swapper 管理的最少缓冲数。
pub const MIN_BUFFERS: usize = 2;

/// ### English
/// Most buffers a multi-buffer swapper manages.
///
/// ### 中文
/// 多缓冲 swapper 管理的最多缓冲数。
pub const MAX_BUFFERS: usize = 5;

/// ### English
/// Swapper flavour selector.
///
/// ### 中文
/// swapper 类型选择。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapperKind {
    /// ### English
    /// Lock-free [`DoubleBufferSwapper`]; exactly two buffers.
    ///
    /// ### 中文
    /// 无锁的 [`DoubleBufferSwapper`]；恰好两个缓冲。
    Double,
    /// ### English
    /// Blocking [`MultiBufferSwapper`]; `MIN_BUFFERS..=MAX_BUFFERS` buffers.
    ///
    /// ### 中文
    /// 可阻塞的 [`MultiBufferSwapper`]；`MIN_BUFFERS..=MAX_BUFFERS` 个缓冲。
    Multi,
}

impl SwapperKind {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Double => count == 2,
            Self::Multi => (MIN_BUFFERS..=MAX_BUFFERS).contains(&count),
        }
    }
}

/// ### English
/// Builds one swapper per call from an injected allocator.
///
/// ### 中文
/// 基于注入的分配器，每次调用构建一个 swapper。
#[derive(Clone)]
pub struct BufferAllocationStrategy {
    allocator: Arc<dyn GraphicBufferAllocator>,
    count: usize,
    kind: SwapperKind,
}

impl BufferAllocationStrategy {
    /// ### English
    /// Creates a strategy, rejecting counts the chosen flavour cannot manage.
    ///
    /// ### 中文
    /// 创建分配策略；所选类型无法管理的缓冲数量会被拒绝。
    pub fn new(
        allocator: Arc<dyn GraphicBufferAllocator>,
        count: usize,
        kind: SwapperKind,
    ) -> Result<Self, StrategyError> {
        if !kind.accepts(count) {
            return Err(StrategyError::InvalidBufferCount { kind, count });
        }
        Ok(Self {
            allocator,
            count,
            kind,
        })
    }

    pub fn double(allocator: Arc<dyn GraphicBufferAllocator>) -> Self {
        Self {
            allocator,
            count: 2,
            kind: SwapperKind::Double,
        }
    }

    pub fn triple(allocator: Arc<dyn GraphicBufferAllocator>) -> Self {
        Self {
            allocator,
            count: 3,
            kind: SwapperKind::Multi,
        }
    }

    /// ### English
    /// Fixed buffer count: the lock-free swapper for two buffers, the multi swapper otherwise.
    ///
    /// ### 中文
    /// 固定缓冲数量：两个缓冲使用无锁 swapper，否则使用多缓冲 swapper。
    pub fn fixed_count(
        allocator: Arc<dyn GraphicBufferAllocator>,
        count: usize,
    ) -> Result<Self, StrategyError> {
        let kind = if count == 2 {
            SwapperKind::Double
        } else {
            SwapperKind::Multi
        };
        Self::new(allocator, count, kind)
    }

    pub fn from_config(
        allocator: Arc<dyn GraphicBufferAllocator>,
        config: &SwapperConfig,
    ) -> Result<Self, StrategyError> {
        Self::new(allocator, config.buffer_count, config.kind)
    }

    pub fn buffer_count(&self) -> usize {
        self.count
    }

    pub fn kind(&self) -> SwapperKind {
        self.kind
    }

    /// ### English
    /// Allocates exactly `buffer_count()` buffers and wraps them in a swapper.
    ///
    /// The first allocation failure aborts construction; buffers allocated so far are dropped.
    ///
    /// ### 中文
    /// 恰好分配 `buffer_count()` 个缓冲并用 swapper 包装。
    ///
    /// 任一次分配失败即中止构建；已分配的缓冲随之释放。
    pub fn create_swapper(
        &self,
        properties: &BufferProperties,
    ) -> Result<Arc<dyn BufferSwapper>, StrategyError> {
        let buffers = (0..self.count)
            .map(|_| self.allocator.alloc_buffer(properties))
            .collect::<Result<Vec<_>, _>>()?;

        let swapper: Arc<dyn BufferSwapper> = match self.kind {
            SwapperKind::Double => {
                let mut buffers = buffers.into_iter();
                match (buffers.next(), buffers.next()) {
                    (Some(a), Some(b)) => Arc::new(DoubleBufferSwapper::new(a, b)?),
                    _ => {
                        return Err(StrategyError::InvalidBufferCount {
                            kind: self.kind,
                            count: self.count,
                        });
                    }
                }
            }
            SwapperKind::Multi => Arc::new(MultiBufferSwapper::new(buffers)?),
        };
        Ok(swapper)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dpi::PhysicalSize;

    use super::*;
    use crate::compositor::allocator::{AllocationError, SoftwareBufferAllocator};
    use crate::compositor::buffer::{Buffer, BufferUsage, PixelFormat};

    struct CountingAllocator {
        inner: SoftwareBufferAllocator,
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl CountingAllocator {
        fn new(fail_on_call: Option<usize>) -> Self {
            Self {
                inner: SoftwareBufferAllocator::new(),
                calls: AtomicUsize::new(0),
                fail_on_call,
            }
        }
    }

    impl GraphicBufferAllocator for CountingAllocator {
        fn alloc_buffer(
            &self,
            properties: &BufferProperties,
        ) -> Result<Arc<Buffer>, AllocationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(AllocationError::Platform("out of video memory".into()));
            }
            self.inner.alloc_buffer(properties)
        }
    }

    fn props() -> BufferProperties {
        BufferProperties::new(
            PhysicalSize::new(7, 8),
            PixelFormat::Argb8888,
            BufferUsage::Software,
        )
    }

    #[test]
    fn fixed_count_three_allocates_three_buffers() {
        let allocator = Arc::new(CountingAllocator::new(None));
        let strategy = BufferAllocationStrategy::fixed_count(allocator.clone(), 3).unwrap();
        assert_eq!(strategy.kind(), SwapperKind::Multi);

        let swapper = strategy.create_swapper(&props()).unwrap();
        assert_eq!(allocator.calls.load(Ordering::SeqCst), 3);
        assert_eq!(swapper.buffer_count(), 3);
        assert_eq!(swapper.census().total(), 3);
    }

    #[test]
    fn fixed_count_two_uses_double_swapper() {
        let allocator = Arc::new(CountingAllocator::new(None));
        let strategy = BufferAllocationStrategy::fixed_count(allocator.clone(), 2).unwrap();
        assert_eq!(strategy.kind(), SwapperKind::Double);
        let swapper = strategy.create_swapper(&props()).unwrap();
        assert_eq!(allocator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(swapper.buffer_count(), 2);
    }

    #[test]
    fn each_call_builds_an_independent_swapper() {
        let strategy = BufferAllocationStrategy::triple(Arc::new(SoftwareBufferAllocator::new()));
        let first = strategy.create_swapper(&props()).unwrap();
        let second = strategy.create_swapper(&props()).unwrap();
        let a = first.client_acquire().unwrap();
        let b = second.client_acquire().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(
            second.client_release(&a),
            Err(crate::compositor::error::SwapperError::UnknownBuffer { id: a.id() })
        );
    }

    #[test]
    fn invalid_counts_are_rejected() {
        let allocator: Arc<dyn GraphicBufferAllocator> = Arc::new(SoftwareBufferAllocator::new());
        for count in [0, 1, MAX_BUFFERS + 1, 10] {
            assert!(matches!(
                BufferAllocationStrategy::fixed_count(allocator.clone(), count),
                Err(StrategyError::InvalidBufferCount { count: c, .. }) if c == count
            ));
        }
        assert!(matches!(
            BufferAllocationStrategy::new(allocator.clone(), 3, SwapperKind::Double),
            Err(StrategyError::InvalidBufferCount {
                kind: SwapperKind::Double,
                count: 3
            })
        ));
        for count in MIN_BUFFERS..=MAX_BUFFERS {
            assert!(BufferAllocationStrategy::new(allocator.clone(), count, SwapperKind::Multi).is_ok());
        }
    }

    #[test]
    fn allocation_failure_aborts_construction() {
        let allocator = Arc::new(CountingAllocator::new(Some(2)));
        let strategy = BufferAllocationStrategy::fixed_count(allocator.clone(), 3).unwrap();
        let err = strategy.create_swapper(&props()).err().unwrap();
        assert!(matches!(
            err,
            StrategyError::Allocation(AllocationError::Platform(_))
        ));
        // No retry and no further allocations after the failing one.
        assert_eq!(allocator.calls.load(Ordering::SeqCst), 2);
    }

    struct RepeatingAllocator {
        buffer: Arc<Buffer>,
    }

    impl GraphicBufferAllocator for RepeatingAllocator {
        fn alloc_buffer(&self, _: &BufferProperties) -> Result<Arc<Buffer>, AllocationError> {
            Ok(Arc::clone(&self.buffer))
        }
    }

    #[test]
    fn allocator_repeating_a_buffer_is_rejected() {
        let buffer = SoftwareBufferAllocator::new().alloc_buffer(&props()).unwrap();
        let id = buffer.id();
        let allocator = Arc::new(RepeatingAllocator { buffer });
        for count in [2, 3] {
            let strategy = BufferAllocationStrategy::fixed_count(allocator.clone(), count).unwrap();
            assert!(matches!(
                strategy.create_swapper(&props()),
                Err(StrategyError::DuplicateBuffer { id: dup }) if dup == id
            ));
        }
    }

    #[test]
    fn from_config_honours_kind_and_count() {
        let config = SwapperConfig {
            kind: SwapperKind::Multi,
            buffer_count: 4,
        };
        let strategy =
            BufferAllocationStrategy::from_config(Arc::new(SoftwareBufferAllocator::new()), &config)
                .unwrap();
        assert_eq!(strategy.buffer_count(), 4);
        assert_eq!(strategy.create_swapper(&props()).unwrap().buffer_count(), 4);
    }
}
