//! ### English
//! Client-side transitions: dequeue a free slot, queue it back as the newest frame.
//!
//! ### 中文
//! 客户端侧状态切换：dequeue 一个空闲槽位，再将其作为最新帧 queue 回去。
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::compositor::buffer::Buffer;
use crate::compositor::error::SwapperError;
use crate::compositor::lockfree::Backoff;

use super::{
    CONTENTION_WARN_ATTEMPTS, DoubleBufferSwapper, SLOT_CLIENT, SLOT_FREE, pack_latest,
};

impl DoubleBufferSwapper {
    /// ### English
    /// Claims the slot that is not the last posted one, so the compositor can keep
    /// redisplaying it; falls back to the posted slot when readers hold the other. Spins only
    /// while readers hold both slots.
    ///
    /// ### 中文
    /// 优先占用非 “last posted” 的槽位，让合成器可以继续重显该帧；
    /// 若另一个槽位被读者持有，则退而占用 last posted 槽位。仅当两个槽位都被读者持有时才会自旋等待。
    pub(super) fn dequeue_free_buffer(&self) -> Option<Arc<Buffer>> {
        // Shutdown wins over the single-dequeue precondition.
        if self.shut_down() {
            return None;
        }
        debug_assert!(
            self.slots.iter().all(|slot| slot.load() != SLOT_CLIENT),
            "client dequeued twice without queueing"
        );

        let (_, posted) = self.latest();
        let preferred = posted ^ 1;
        let mut backoff = Backoff::new();
        loop {
            if self.shut_down() {
                return None;
            }

            for slot in [preferred, posted] {
                if self.slots[slot].transition(SLOT_FREE, SLOT_CLIENT) {
                    return Some(self.buffers[slot].clone());
                }
            }

            backoff.snooze();
            if backoff.attempts() == CONTENTION_WARN_ATTEMPTS {
                log::warn!("client dequeue still contended after {CONTENTION_WARN_ATTEMPTS} retries");
            }
        }
    }

    /// ### English
    /// Publishes the client's buffer as the newest frame and returns its slot to the pool.
    ///
    /// ### 中文
    /// 将客户端的缓冲发布为最新帧，并把槽位归还到池中。
    pub(super) fn queue_finished_buffer(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let slot = self.slot_of(buffer)?;
        // Only the client writes `latest_packed`, so the read-modify-write needs no CAS.
        let (frame_seq, _) = self.latest();
        if !self.slots[slot].transition(SLOT_CLIENT, SLOT_FREE) {
            log::error!("client queued buffer {} it does not hold", buffer.id());
            return Err(SwapperError::NotLentToClient { id: buffer.id() });
        }
        self.meta
            .latest_packed
            .store(pack_latest(frame_seq + 1, slot), Ordering::Release);
        Ok(())
    }
}
