//! ### English
//! Error types surfaced by swappers and allocation strategies.
//!
//! There is no shutdown variant: an acquire after shutdown returns `None`.
//!
//! ### 中文
//! swapper 与分配策略对外暴露的错误类型。
//!
//! 这里没有 shutdown：shutdown 之后的 acquire 直接返回 `None`。

use thiserror::Error;

use super::allocator::AllocationError;
use super::buffer::BufferId;
use super::strategy::SwapperKind;

/// ### English
/// Protocol violations: a release named a buffer the caller does not hold.
///
/// These indicate a bug in the calling collaborator and are never retried.
///
/// ### 中文
/// 协议违规：release 传入了调用方并未持有的缓冲。
///
/// 这代表调用方存在 bug，swapper 不会重试。
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapperError {
    #[error("buffer {id} does not belong to this swapper")]
    UnknownBuffer { id: BufferId },
    #[error("buffer {id} released by the client but not lent to it")]
    NotLentToClient { id: BufferId },
    #[error("buffer {id} released by the compositor but not lent to it")]
    NotLentToCompositor { id: BufferId },
    #[error("buffer {id} released as a snapshot but not lent as one")]
    NotLentToSnapshot { id: BufferId },
}

/// ### English
/// Failures while building a swapper.
///
/// ### 中文
/// 构建 swapper 时的失败。
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{kind:?} swapper cannot manage {count} buffers")]
    InvalidBufferCount { kind: SwapperKind, count: usize },
    #[error("buffer {id} supplied to a swapper more than once")]
    DuplicateBuffer { id: BufferId },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// ### English
/// Unrecognised swapper kind in configuration.
///
/// ### 中文
/// 配置中无法识别的 swapper 类型。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown swapper kind {0:?}, expected `double` or `multi`")]
pub struct ParseSwapperKindError(pub String);
