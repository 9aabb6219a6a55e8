//! ### English
//! Mutex-protected bookkeeping for [`super::MultiBufferSwapper`].
//!
//! Every id lives in exactly one of: `client_queue`, `compositor_queue`, `client_held`, or
//! the reader holds (`compositor_held` and `snapshot_held`, which may overlap).
//!
//! ### 中文
//! [`super::MultiBufferSwapper`] 受互斥锁保护的记账状态。
//!
//! 每个 ID 恰好位于以下之一：`client_queue`、`compositor_queue`、`client_held`，
//! 或读者持有（`compositor_held` 与 `snapshot_held`，二者可重叠）。
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::compositor::buffer::{Buffer, BufferId};
use crate::compositor::error::{StrategyError, SwapperError};
use crate::compositor::strategy::SwapperKind;
use crate::compositor::swapper::Census;

pub(super) struct SwapState {
    buffers: HashMap<BufferId, Arc<Buffer>>,
    /// ### English
    /// Free buffers, handed to the client oldest-first.
    ///
    /// ### 中文
    /// 空闲缓冲，按先进先出交给客户端。
    pub(super) client_queue: VecDeque<BufferId>,
    /// ### English
    /// Completed frames not yet taken by the compositor, newest last.
    ///
    /// ### 中文
    /// 合成器尚未取走的已完成帧，最新的在队尾。
    pub(super) compositor_queue: VecDeque<BufferId>,
    pub(super) client_held: Vec<BufferId>,
    /// ### English
    /// Compositor holds with a count: redisplaying the same frame twice before releasing it
    /// is legal (e.g. one acquire per output).
    ///
    /// ### 中文
    /// 合成器持有计数：在 release 之前重复显示同一帧是合法的（例如每个输出各 acquire 一次）。
    pub(super) compositor_held: HashMap<BufferId, usize>,
    /// ### English
    /// Snapshot holds with a count. A buffer returns to the free queue only once neither the
    /// compositor nor a snapshot holds it.
    ///
    /// ### 中文
    /// 快照持有计数。只有当合成器与快照都不再持有时，缓冲才会回到空闲队列。
    pub(super) snapshot_held: HashMap<BufferId, usize>,
    /// ### English
    /// Frame most recently handed to the compositor, kept for redisplay.
    ///
    /// ### 中文
    /// 最近交给合成器的帧，用于重显。
    pub(super) last_displayed: Option<BufferId>,
    /// ### English
    /// When set, a client finding no free buffer takes the oldest ready frame instead of
    /// waiting; that frame is never displayed.
    ///
    /// ### 中文
    /// 开启后，找不到空闲缓冲的客户端会直接取走最早的就绪帧而不是等待；该帧不会被显示。
    pub(super) framedropping: bool,
    pub(super) shutdown: bool,
}

impl SwapState {
    /// ### English
    /// The first buffer is queued as the startup frame; the rest start free.
    ///
    /// Rejects repeated buffers and counts outside `MIN_BUFFERS..=MAX_BUFFERS`.
    ///
    /// ### 中文
    /// 第一个缓冲作为启动帧进入合成器队列，其余缓冲初始为空闲。
    ///
    /// 重复的缓冲或超出 `MIN_BUFFERS..=MAX_BUFFERS` 的数量会被拒绝。
    pub(super) fn new(buffers: Vec<Arc<Buffer>>) -> Result<Self, StrategyError> {
        let count = buffers.len();
        if !SwapperKind::Multi.accepts(count) {
            return Err(StrategyError::InvalidBufferCount {
                kind: SwapperKind::Multi,
                count,
            });
        }

        let mut client_queue = VecDeque::with_capacity(count);
        let mut compositor_queue = VecDeque::with_capacity(count);
        let mut by_id = HashMap::with_capacity(count);
        for (index, buffer) in buffers.into_iter().enumerate() {
            let id = buffer.id();
            if by_id.insert(id, buffer).is_some() {
                log::error!("multi buffer swapper given buffer {id} twice");
                return Err(StrategyError::DuplicateBuffer { id });
            }
            if index == 0 {
                compositor_queue.push_back(id);
            } else {
                client_queue.push_back(id);
            }
        }

        Ok(Self {
            buffers: by_id,
            client_queue,
            compositor_queue,
            client_held: Vec::new(),
            compositor_held: HashMap::new(),
            snapshot_held: HashMap::new(),
            last_displayed: None,
            framedropping: false,
            shutdown: false,
        })
    }

    pub(super) fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub(super) fn ensure_known(&self, id: BufferId) -> Result<(), SwapperError> {
        if self.buffers.contains_key(&id) {
            Ok(())
        } else {
            log::error!("buffer {id} released to a swapper that never owned it");
            Err(SwapperError::UnknownBuffer { id })
        }
    }

    pub(super) fn lend_to_client(&mut self, id: BufferId) -> Arc<Buffer> {
        self.client_held.push(id);
        self.buffer(id)
    }

    pub(super) fn lend_to_compositor(&mut self, id: BufferId) -> Arc<Buffer> {
        *self.compositor_held.entry(id).or_insert(0) += 1;
        self.last_displayed = Some(id);
        self.buffer(id)
    }

    pub(super) fn take_free_for_client(&mut self) -> Option<BufferId> {
        let last = self.last_displayed;
        let position = self
            .client_queue
            .iter()
            .position(|id| Some(*id) != last)
            .or_else(|| (!self.client_queue.is_empty()).then_some(0))?;
        self.client_queue.remove(position)
    }

    /// ### English
    /// Drops the oldest ready frame in favour of the client, if frame dropping is on.
    ///
    /// ### 中文
    /// 开启丢帧时，丢弃最早的就绪帧并交给客户端。
    pub(super) fn drop_oldest_frame(&mut self) -> Option<BufferId> {
        if !self.framedropping {
            return None;
        }
        let id = self.compositor_queue.pop_front()?;
        log::debug!("dropped ready frame {id} for the client");
        Some(id)
    }

    /// ### English
    /// Returns a reader-held buffer to the free queue once no reader holds it.
    ///
    /// ### 中文
    /// 当没有任何读者持有时，将缓冲归还到空闲队列。
    pub(super) fn recycle_if_unread(&mut self, id: BufferId) -> bool {
        if self.compositor_held.contains_key(&id) || self.snapshot_held.contains_key(&id) {
            return false;
        }
        self.client_queue.push_back(id);
        true
    }

    pub(super) fn lend_to_snapshot(&mut self, id: BufferId) -> Arc<Buffer> {
        *self.snapshot_held.entry(id).or_insert(0) += 1;
        self.last_displayed = Some(id);
        self.buffer(id)
    }

    /// ### English
    /// Takes the last displayed frame again if nobody else owns it right now.
    ///
    /// ### 中文
    /// 若上一帧当前不被他人持有，则再次取用它。
    pub(super) fn reclaim_last_displayed(&mut self) -> Option<BufferId> {
        let last = self.last_displayed?;
        if self.compositor_held.contains_key(&last) || self.snapshot_held.contains_key(&last) {
            return Some(last);
        }
        let position = self.client_queue.iter().position(|id| *id == last)?;
        self.client_queue.remove(position)
    }

    pub(super) fn census(&self) -> Census {
        let compositor = self.compositor_held.len()
            + self
                .snapshot_held
                .keys()
                .filter(|id| !self.compositor_held.contains_key(id))
                .count();
        let client = self.client_held.len();
        Census {
            free: self.client_queue.len() + self.compositor_queue.len(),
            client,
            compositor,
        }
    }

    fn buffer(&self, id: BufferId) -> Arc<Buffer> {
        // Ids only ever enter the queues from `buffers`, so the lookup cannot miss.
        Arc::clone(&self.buffers[&id])
    }
}
