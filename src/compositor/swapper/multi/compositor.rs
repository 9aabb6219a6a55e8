use std::sync::Arc;

use parking_lot::MutexGuard;

use crate::compositor::buffer::{Buffer, BufferId};
use crate::compositor::error::SwapperError;

use super::MultiBufferSwapper;
use super::state::SwapState;

impl MultiBufferSwapper {
    /// ### English
    /// Takes the newest ready frame and recycles every older ready frame as free.
    ///
    /// With nothing new ready, the last displayed frame is returned again. The compositor only
    /// parks (on `frame_available`) when the client has taken that frame as well, which the
    /// client side avoids unless it was the only free buffer.
    ///
    /// ### 中文
    /// 取走最新的就绪帧，并把所有更早的就绪帧回收为空闲。
    ///
    /// 没有新帧时再次返回上一帧。只有当客户端连上一帧也取走了时，合成器才会在 `frame_available`
    /// 上等待；客户端仅在上一帧是唯一空闲缓冲时才会取走它。
    pub(super) fn acquire_for_compositor(&self) -> Option<Arc<Buffer>> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }

            if let Some(newest) = self.take_newest_ready(&mut state) {
                return Some(state.lend_to_compositor(newest));
            }

            if let Some(last) = state.reclaim_last_displayed() {
                return Some(state.lend_to_compositor(last));
            }

            self.frame_available.wait(&mut state);
        }
    }

    /// ### English
    /// Drops one compositor hold; the last reader hold returns the buffer to the free queue.
    ///
    /// ### 中文
    /// 释放合成器的一次持有；最后一个读者释放时缓冲回到空闲队列。
    pub(super) fn release_from_compositor(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let id = buffer.id();
        let mut state = self.state.lock();
        state.ensure_known(id)?;

        let Some(holds) = state.compositor_held.get_mut(&id) else {
            log::error!("compositor released buffer {id} it does not hold");
            return Err(SwapperError::NotLentToCompositor { id });
        };
        *holds -= 1;
        if *holds > 0 {
            return Ok(());
        }

        state.compositor_held.remove(&id);
        if state.recycle_if_unread(id) {
            drop(state);
            self.client_available.notify_one();
        }
        Ok(())
    }

    /// ### English
    /// Shares the displayed frame for reading without disturbing the compositor.
    ///
    /// Before anything has been displayed, the newest ready frame is put up first. Parks on
    /// `frame_available` only while the client holds the displayed frame and nothing is ready.
    ///
    /// ### 中文
    /// 共享当前显示的帧用于读取，不影响合成器。
    ///
    /// 尚未显示任何帧时，先将最新的就绪帧设为显示帧。仅当客户端持有显示帧且没有就绪帧时才在
    /// `frame_available` 上等待。
    pub(super) fn acquire_for_snapshot(&self) -> Option<Arc<Buffer>> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }

            let target = match state.reclaim_last_displayed() {
                Some(last) => Some(last),
                None => self.take_newest_ready(&mut state),
            };
            if let Some(id) = target {
                return Some(state.lend_to_snapshot(id));
            }

            self.frame_available.wait(&mut state);
        }
    }

    pub(super) fn release_from_snapshot(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let id = buffer.id();
        let mut state = self.state.lock();
        state.ensure_known(id)?;

        let Some(holds) = state.snapshot_held.get_mut(&id) else {
            log::error!("snapshot released buffer {id} it does not hold");
            return Err(SwapperError::NotLentToSnapshot { id });
        };
        *holds -= 1;
        if *holds > 0 {
            return Ok(());
        }

        state.snapshot_held.remove(&id);
        if state.recycle_if_unread(id) {
            drop(state);
            self.client_available.notify_one();
        }
        Ok(())
    }

    /// ### English
    /// Pops the newest ready frame; older ready frames go back to the free queue.
    ///
    /// ### 中文
    /// 取出最新的就绪帧；更早的就绪帧回到空闲队列。
    fn take_newest_ready(&self, state: &mut MutexGuard<'_, SwapState>) -> Option<BufferId> {
        let newest = state.compositor_queue.pop_back()?;
        let stale = state.compositor_queue.len();
        while let Some(id) = state.compositor_queue.pop_front() {
            state.client_queue.push_back(id);
        }
        if stale > 0 {
            log::debug!("recycled {stale} stale frame(s) behind {newest}");
            self.client_available.notify_all();
        }
        Some(newest)
    }
}
