//! ### English
//! Reader-side transitions: compositor grabs and snapshots share the posted slot.
//!
//! ### 中文
//! 读者侧状态切换：合成器 grab 与快照共享最近发布的槽位。
use std::sync::Arc;

use crate::compositor::buffer::Buffer;
use crate::compositor::error::SwapperError;
use crate::compositor::lockfree::Backoff;

use super::{CONTENTION_WARN_ATTEMPTS, DoubleBufferSwapper};

impl DoubleBufferSwapper {
    /// ### English
    /// Grabs the last posted slot, or the other one (previous frame) while the client has
    /// re-dequeued the posted slot. A slot that readers already hold is shared, so repeated
    /// grabs of the shown frame return the same buffer. Never blocks: the client holds at most
    /// one slot, and the other one is either free or already read.
    ///
    /// ### 中文
    /// grab 最近发布的槽位；若客户端重新 dequeue 了该槽位，则 grab 另一个（上一帧）。
    /// 已被读者持有的槽位会被共享，因此重复 grab 正在显示的帧会得到同一缓冲。
    /// 不会阻塞：客户端最多持有一个槽位，另一个要么空闲、要么已被读取。
    pub(super) fn grab_last_posted(&self) -> Option<Arc<Buffer>> {
        self.add_reader().map(|slot| self.buffers[slot].clone())
    }

    pub(super) fn ungrab(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let slot = self.slot_of(buffer)?;
        let state = &self.slots[slot];
        if state.readers() <= state.snapshots() || !state.drop_reader() {
            log::error!("compositor released buffer {} it does not hold", buffer.id());
            return Err(SwapperError::NotLentToCompositor { id: buffer.id() });
        }
        Ok(())
    }

    /// ### English
    /// Shares the frame the compositor would show, without consuming it.
    ///
    /// ### 中文
    /// 共享合成器将要显示的帧，但不消费它。
    pub(super) fn grab_for_snapshot(&self) -> Option<Arc<Buffer>> {
        let slot = self.add_reader()?;
        self.slots[slot].mark_snapshot();
        Some(self.buffers[slot].clone())
    }

    pub(super) fn ungrab_snapshot(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let slot = self.slot_of(buffer)?;
        let state = &self.slots[slot];
        if !state.unmark_snapshot() {
            log::error!("snapshot released buffer {} it does not hold", buffer.id());
            return Err(SwapperError::NotLentToSnapshot { id: buffer.id() });
        }
        state.drop_reader();
        Ok(())
    }

    fn add_reader(&self) -> Option<usize> {
        let mut backoff = Backoff::new();
        loop {
            if self.shut_down() {
                return None;
            }

            let (_, posted) = self.latest();
            for slot in [posted, posted ^ 1] {
                if self.slots[slot].add_reader() {
                    return Some(slot);
                }
            }

            backoff.snooze();
            if backoff.attempts() == CONTENTION_WARN_ATTEMPTS {
                log::warn!("compositor grab still contended after {CONTENTION_WARN_ATTEMPTS} retries");
            }
        }
    }
}
