//! ### English
//! Lock-free two-buffer swapper.
//!
//! Each slot carries an atomic ownership state (`FREE` / `CLIENT` / shared by readers); the global
//! "last posted" pointer packs `(frame_seq, slot)` into one `u64`. All transitions are CAS on
//! the slot state, so neither side ever takes a lock on the hot path.
//!
//! Readers (compositor grabs and snapshots) share a slot through a hold count, so the compositor
//! may lock the frame it already shows again. Precondition: the client holds at most one buffer.
//!
//! ### 中文
//! 无锁双缓冲 swapper。
//!
//! 每个槽位有一个原子所有权状态（`FREE` / `CLIENT` / 被读者共享）；全局 “last posted”
//! 指针将 `(frame_seq, slot)` 打包进一个 `u64`。所有状态切换都是对槽位状态的 CAS，
//! 热路径上双方都不会持锁。
//!
//! 读者（合成器 grab 与快照）通过持有计数共享槽位，因此合成器可以再次锁定正在显示的帧。
//! 前置条件：客户端同一时刻最多持有一个缓冲。
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::compositor::buffer::Buffer;
use crate::compositor::error::{StrategyError, SwapperError};

use super::{BufferSwapper, Census};

mod client;
mod compositor;
mod slot;

use slot::SlotAtomics;

pub(super) const DOUBLE_BUFFER_COUNT: usize = 2;

pub(super) const SLOT_FREE: u32 = 0;
pub(super) const SLOT_CLIENT: u32 = 1;

const SLOT_INDEX_BITS: u64 = 1;

/// ### English
/// Retry count after which a contended CAS loop is reported once at `warn` level.
///
/// ### 中文
/// CAS 重试达到该次数时，以 `warn` 级别记录一次争用。
const CONTENTION_WARN_ATTEMPTS: u32 = 10_000;

#[inline]
fn pack_latest(frame_seq: u64, slot: usize) -> u64 {
    (frame_seq << SLOT_INDEX_BITS) | (slot as u64 & ((1u64 << SLOT_INDEX_BITS) - 1))
}

#[inline]
fn unpack_latest(packed: u64) -> (u64, usize) {
    (
        packed >> SLOT_INDEX_BITS,
        (packed & ((1u64 << SLOT_INDEX_BITS) - 1)) as usize,
    )
}

/// ### English
/// Two-buffer swapper for the common client + compositor pairing.
///
/// `buffer_a` starts out as the posted startup frame, so the compositor always has something
/// to display and the client's first dequeue gets `buffer_b`.
///
/// ### 中文
/// 面向常见“单客户端 + 合成器”组合的双缓冲 swapper。
///
/// `buffer_a` 初始即作为已发布的启动帧，因此合成器总有内容可显示，客户端第一次 dequeue
/// 得到的是 `buffer_b`。
pub struct DoubleBufferSwapper {
    buffers: [Arc<Buffer>; DOUBLE_BUFFER_COUNT],
    slots: [SlotAtomics; DOUBLE_BUFFER_COUNT],
    meta: SwapMeta,
}

#[repr(C, align(64))]
struct SwapMeta {
    /// ### English
    /// Packed `(frame_seq, slot)` of the most recently posted buffer.
    ///
    /// ### 中文
    /// 最近发布缓冲的 packed `(frame_seq, slot)`。
    latest_packed: AtomicU64,
    shutdown: AtomicBool,
}

impl DoubleBufferSwapper {
    /// ### English
    /// Creates a swapper over two distinct buffers; `buffer_a` becomes the startup frame.
    ///
    /// Passing the same buffer twice fails with [`StrategyError::DuplicateBuffer`].
    ///
    /// ### 中文
    /// 基于两个不同的缓冲创建 swapper；`buffer_a` 作为启动帧。
    ///
    /// 两次传入同一缓冲会返回 [`StrategyError::DuplicateBuffer`]。
    pub fn new(buffer_a: Arc<Buffer>, buffer_b: Arc<Buffer>) -> Result<Self, StrategyError> {
        if buffer_a.id() == buffer_b.id() {
            log::error!("double buffer swapper given buffer {} twice", buffer_a.id());
            return Err(StrategyError::DuplicateBuffer { id: buffer_a.id() });
        }
        log::debug!(
            "double buffer swapper over {} (startup frame) and {}",
            buffer_a.id(),
            buffer_b.id()
        );
        Ok(Self {
            buffers: [buffer_a, buffer_b],
            slots: std::array::from_fn(|_| SlotAtomics::new()),
            meta: SwapMeta {
                latest_packed: AtomicU64::new(pack_latest(0, 0)),
                shutdown: AtomicBool::new(false),
            },
        })
    }

    /// ### English
    /// Number of frames the client has posted (the startup frame is not counted).
    ///
    /// ### 中文
    /// 客户端已发布的帧数（不含启动帧）。
    pub fn frames_posted(&self) -> u64 {
        self.latest().0
    }

    #[inline]
    fn shut_down(&self) -> bool {
        self.meta.shutdown.load(Ordering::Acquire)
    }

    #[inline]
    fn latest(&self) -> (u64, usize) {
        unpack_latest(self.meta.latest_packed.load(Ordering::Acquire))
    }

    fn slot_of(&self, buffer: &Buffer) -> Result<usize, SwapperError> {
        self.buffers
            .iter()
            .position(|candidate| candidate.id() == buffer.id())
            .ok_or_else(|| {
                log::error!("buffer {} released to a swapper that never owned it", buffer.id());
                SwapperError::UnknownBuffer { id: buffer.id() }
            })
    }
}

impl BufferSwapper for DoubleBufferSwapper {
    fn client_acquire(&self) -> Option<Arc<Buffer>> {
        self.dequeue_free_buffer()
    }

    fn client_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.queue_finished_buffer(buffer)
    }

    fn compositor_acquire(&self) -> Option<Arc<Buffer>> {
        self.grab_last_posted()
    }

    fn compositor_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.ungrab(buffer)
    }

    fn shutdown(&self) {
        if !self.meta.shutdown.swap(true, Ordering::AcqRel) {
            log::debug!("double buffer swapper shut down");
        }
    }

    fn snapshot_acquire(&self) -> Option<Arc<Buffer>> {
        self.grab_for_snapshot()
    }

    fn snapshot_release(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        self.ungrab_snapshot(buffer)
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down()
    }

    fn buffer_count(&self) -> usize {
        DOUBLE_BUFFER_COUNT
    }

    fn census(&self) -> Census {
        let mut census = Census::default();
        for slot in &self.slots {
            match slot.load() {
                SLOT_FREE => census.free += 1,
                SLOT_CLIENT => census.client += 1,
                _ => census.compositor += 1,
            }
        }
        census
    }
}

#[cfg(test)]
mod tests {
    use dpi::PhysicalSize;

    use super::*;
    use crate::compositor::buffer::{BufferProperties, BufferUsage, NativeHandle, PixelFormat};

    fn buffer(handle: u64) -> Arc<Buffer> {
        let properties = BufferProperties::new(
            PhysicalSize::new(1024, 768),
            PixelFormat::Abgr8888,
            BufferUsage::Hardware,
        );
        Arc::new(Buffer::new(properties, 4096, NativeHandle(handle)))
    }

    fn swapper() -> (DoubleBufferSwapper, Arc<Buffer>, Arc<Buffer>) {
        let a = buffer(1);
        let b = buffer(2);
        (DoubleBufferSwapper::new(a.clone(), b.clone()).unwrap(), a, b)
    }

    #[test]
    fn latest_round_trips() {
        for seq in [0u64, 1, 7, u64::MAX >> 1] {
            for slot in 0..DOUBLE_BUFFER_COUNT {
                assert_eq!(unpack_latest(pack_latest(seq, slot)), (seq, slot));
            }
        }
    }

    #[test]
    fn startup_frame_is_displayable_before_any_client_frame() {
        let (swapper, a, _) = swapper();
        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), a.id());
        swapper.compositor_release(&shown).unwrap();
        assert_eq!(swapper.frames_posted(), 0);
    }

    #[test]
    fn client_and_compositor_alternate() {
        let (swapper, a, b) = swapper();

        let drawn = swapper.client_acquire().unwrap();
        assert_eq!(drawn.id(), b.id());
        swapper.client_release(&drawn).unwrap();

        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), b.id());
        swapper.compositor_release(&shown).unwrap();

        let drawn = swapper.client_acquire().unwrap();
        assert_eq!(drawn.id(), a.id());
        swapper.client_release(&drawn).unwrap();
        assert_eq!(swapper.frames_posted(), 2);
    }

    #[test]
    fn both_sides_hold_a_buffer_at_once() {
        let (swapper, _, _) = swapper();
        let drawn = swapper.client_acquire().unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        assert_ne!(drawn.id(), shown.id());
        assert_eq!(
            swapper.census(),
            Census {
                free: 0,
                client: 1,
                compositor: 1
            }
        );
        swapper.client_release(&drawn).unwrap();
        swapper.compositor_release(&shown).unwrap();
        assert_eq!(swapper.census().free, 2);
    }

    #[test]
    fn compositor_redisplays_without_client_activity() {
        let (swapper, _, _) = swapper();
        let drawn = swapper.client_acquire().unwrap();
        swapper.client_release(&drawn).unwrap();

        for _ in 0..100 {
            let shown = swapper.compositor_acquire().unwrap();
            assert_eq!(shown.id(), drawn.id());
            swapper.compositor_release(&shown).unwrap();
        }
    }

    #[test]
    fn client_takes_posted_slot_while_compositor_holds_the_other() {
        let (swapper, a, b) = swapper();

        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), a.id());

        let drawn = swapper.client_acquire().unwrap();
        assert_eq!(drawn.id(), b.id());
        swapper.client_release(&drawn).unwrap();

        // b is now posted; the client has to reuse it because a is still grabbed.
        let drawn = swapper.client_acquire().unwrap();
        assert_eq!(drawn.id(), b.id());

        swapper.compositor_release(&shown).unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), a.id());

        swapper.client_release(&drawn).unwrap();
        swapper.compositor_release(&shown).unwrap();
    }

    #[test]
    fn release_of_foreign_buffer_is_rejected() {
        let (swapper, _, _) = swapper();
        let stranger = buffer(3);
        assert_eq!(
            swapper.client_release(&stranger),
            Err(SwapperError::UnknownBuffer { id: stranger.id() })
        );
        assert_eq!(
            swapper.compositor_release(&stranger),
            Err(SwapperError::UnknownBuffer { id: stranger.id() })
        );
    }

    #[test]
    fn release_by_wrong_party_is_rejected() {
        let (swapper, _, _) = swapper();
        let drawn = swapper.client_acquire().unwrap();
        assert_eq!(
            swapper.compositor_release(&drawn),
            Err(SwapperError::NotLentToCompositor { id: drawn.id() })
        );
        swapper.client_release(&drawn).unwrap();
        assert_eq!(
            swapper.client_release(&drawn),
            Err(SwapperError::NotLentToClient { id: drawn.id() })
        );
        assert_eq!(swapper.census().free, 2);
    }

    #[test]
    fn acquires_fail_after_shutdown_but_releases_still_work() {
        let (swapper, _, _) = swapper();
        let drawn = swapper.client_acquire().unwrap();
        swapper.shutdown();
        assert!(swapper.is_shut_down());
        assert!(swapper.client_acquire().is_none());
        assert!(swapper.compositor_acquire().is_none());
        swapper.client_release(&drawn).unwrap();
        assert_eq!(swapper.census().free, 2);
    }

    #[test]
    fn rejects_the_same_buffer_twice() {
        let a = buffer(4);
        assert!(matches!(
            DoubleBufferSwapper::new(a.clone(), a.clone()),
            Err(StrategyError::DuplicateBuffer { id }) if id == a.id()
        ));
    }

    #[test]
    fn repeated_grabs_share_the_shown_frame() {
        let (swapper, a, b) = swapper();
        let drawn = swapper.client_acquire().unwrap();
        swapper.client_release(&drawn).unwrap();

        let first = swapper.compositor_acquire().unwrap();
        let second = swapper.compositor_acquire().unwrap();
        assert_eq!(first.id(), b.id());
        assert_eq!(second.id(), b.id());
        assert_eq!(swapper.census().compositor, 1);

        // The client still gets the other buffer straight away.
        let next = swapper.client_acquire().unwrap();
        assert_eq!(next.id(), a.id());
        swapper.client_release(&next).unwrap();

        swapper.compositor_release(&first).unwrap();
        assert_eq!(swapper.census().compositor, 1);
        swapper.compositor_release(&second).unwrap();
        assert_eq!(swapper.census().free, 2);
        assert_eq!(
            swapper.compositor_release(&second),
            Err(SwapperError::NotLentToCompositor { id: b.id() })
        );
    }

    #[test]
    fn snapshot_shares_the_shown_frame() {
        let (swapper, a, _) = swapper();
        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(
            swapper.snapshot_release(&shown),
            Err(SwapperError::NotLentToSnapshot { id: shown.id() })
        );

        let drawn = swapper.client_acquire().unwrap();
        let snapshot = swapper.snapshot_acquire().unwrap();
        assert_eq!(snapshot.id(), a.id());
        assert_ne!(snapshot.id(), drawn.id());

        swapper.compositor_release(&shown).unwrap();
        // Only the snapshot hold is left; the compositor cannot release it.
        assert_eq!(
            swapper.compositor_release(&shown),
            Err(SwapperError::NotLentToCompositor { id: a.id() })
        );
        assert_eq!(swapper.census().compositor, 1);

        swapper.snapshot_release(&snapshot).unwrap();
        assert_eq!(
            swapper.snapshot_release(&snapshot),
            Err(SwapperError::NotLentToSnapshot { id: a.id() })
        );
        swapper.client_release(&drawn).unwrap();
        assert_eq!(swapper.census().free, 2);
    }

    #[test]
    fn shutdown_while_the_client_holds_a_buffer_returns_none() {
        let (swapper, _, _) = swapper();
        let _drawn = swapper.client_acquire().unwrap();
        swapper.shutdown();
        assert!(swapper.client_acquire().is_none());
    }
}
