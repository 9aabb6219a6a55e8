use std::sync::atomic::{AtomicU32, Ordering};

use super::{SLOT_CLIENT, SLOT_FREE};

/// ### English
/// Per-slot ownership word.
///
/// `SLOT_FREE` and `SLOT_CLIENT` are exclusive states; any value above `SLOT_CLIENT` means the
/// slot is shared by `state - SLOT_CLIENT` readers (compositor grabs plus snapshots).
/// `snapshots` counts how many of those readers are snapshots.
///
/// ### 中文
/// 每个槽位的所有权字。
///
/// `SLOT_FREE` 与 `SLOT_CLIENT` 为独占状态；大于 `SLOT_CLIENT` 的值表示该槽位被
/// `state - SLOT_CLIENT` 个读者共享（合成器 grab 与快照）。`snapshots` 记录其中快照的数量。
#[repr(C, align(64))]
pub(super) struct SlotAtomics {
    state: AtomicU32,
    snapshots: AtomicU32,
}

impl SlotAtomics {
    pub(super) fn new() -> Self {
        Self {
            state: AtomicU32::new(SLOT_FREE),
            snapshots: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(super) fn load(&self) -> u32 {
        self.state.load(Ordering::Acquire)
    }

    #[inline]
    pub(super) fn readers(&self) -> u32 {
        self.load().saturating_sub(SLOT_CLIENT)
    }

    #[inline]
    pub(super) fn snapshots(&self) -> u32 {
        self.snapshots.load(Ordering::Acquire)
    }

    /// ### English
    /// CAS the state with `AcqRel` on success so the new owner sees the previous owner's
    /// writes to the buffer.
    ///
    /// ### 中文
    /// 以 `AcqRel`（成功）对状态做 CAS，保证新持有者能看到前一持有者对缓冲的写入。
    #[inline]
    pub(super) fn transition(&self, current: u32, new: u32) -> bool {
        self.state
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// ### English
    /// Adds one reader unless the client owns the slot.
    ///
    /// ### 中文
    /// 若槽位不归客户端所有，则增加一个读者。
    pub(super) fn add_reader(&self) -> bool {
        let mut current = self.load();
        loop {
            let next = match current {
                SLOT_CLIENT => return false,
                SLOT_FREE => SLOT_CLIENT + 1,
                held => match held.checked_add(1) {
                    Some(next) => next,
                    None => return false,
                },
            };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// ### English
    /// Drops one reader; the last one frees the slot. `false` if nobody was reading.
    ///
    /// ### 中文
    /// 移除一个读者；最后一个读者离开时槽位变为空闲。若没有读者则返回 `false`。
    pub(super) fn drop_reader(&self) -> bool {
        let mut current = self.load();
        loop {
            let next = match current {
                SLOT_FREE | SLOT_CLIENT => return false,
                last if last == SLOT_CLIENT + 1 => SLOT_FREE,
                held => held - 1,
            };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(super) fn mark_snapshot(&self) {
        self.snapshots.fetch_add(1, Ordering::AcqRel);
    }

    /// ### English
    /// Retires one snapshot mark; `false` if the slot carries none.
    ///
    /// ### 中文
    /// 撤销一个快照标记；若槽位没有快照标记则返回 `false`。
    pub(super) fn unmark_snapshot(&self) -> bool {
        self.snapshots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |marks| marks.checked_sub(1))
            .is_ok()
    }
}
