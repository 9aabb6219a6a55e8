use std::sync::Arc;

use crate::compositor::buffer::Buffer;
use crate::compositor::error::SwapperError;

use super::MultiBufferSwapper;

impl MultiBufferSwapper {
    /// ### English
    /// Pops the oldest free buffer, parking on `client_available` while the pool is empty.
    ///
    /// The last displayed frame is handed out only when it is the sole free buffer, so the
    /// compositor can keep redisplaying it. With frame dropping on, an empty pool yields the
    /// oldest ready frame instead of a wait.
    ///
    /// ### 中文
    /// 取出最早空闲的缓冲；池为空时在 `client_available` 上等待。
    ///
    /// 仅当上一帧是唯一空闲缓冲时才会交给客户端，以便合成器继续重显它。开启丢帧时，
    /// 池为空会直接取走最早的就绪帧而不是等待。
    pub(super) fn acquire_for_client(&self) -> Option<Arc<Buffer>> {
        let mut state = self.state.lock();
        loop {
            if state.shutdown {
                return None;
            }
            let free = match state.take_free_for_client() {
                Some(id) => Some(id),
                None => state.drop_oldest_frame(),
            };
            if let Some(id) = free {
                return Some(state.lend_to_client(id));
            }
            self.client_available.wait(&mut state);
        }
    }

    /// ### English
    /// Appends the buffer to the ready queue (newest last) and wakes a waiting compositor.
    ///
    /// ### 中文
    /// 将缓冲追加到就绪队列（最新在尾），并唤醒等待中的合成器。
    pub(super) fn release_from_client(&self, buffer: &Buffer) -> Result<(), SwapperError> {
        let id = buffer.id();
        let mut state = self.state.lock();
        state.ensure_known(id)?;

        let Some(position) = state.client_held.iter().position(|held| *held == id) else {
            log::error!("client released buffer {id} it does not hold");
            return Err(SwapperError::NotLentToClient { id });
        };
        state.client_held.swap_remove(position);
        state.compositor_queue.push_back(id);
        let framedropping = state.framedropping;
        drop(state);

        self.frame_available.notify_all();
        if framedropping {
            self.client_available.notify_all();
        }
        Ok(())
    }

    pub(super) fn set_framedropping(&self, allow: bool) {
        let mut state = self.state.lock();
        if state.framedropping == allow {
            return;
        }
        state.framedropping = allow;
        drop(state);

        log::debug!("multi buffer swapper frame dropping {}", if allow { "on" } else { "off" });
        if allow {
            self.client_available.notify_all();
        }
    }
}
