//! ### English
//! Spin-then-yield backoff for the lock-free swapper retry loops.
//!
//! A double-buffer CAS only loses when the other party is mid-transition on the same slot, so
//! the first retries spin; after the spin budget the thread yields so an oversubscribed host
//! can schedule the party we are waiting on.
//!
//! ### 中文
//! 无锁 swapper 重试循环使用的“先自旋、后让出”退避。
//!
//! 双缓冲 CAS 只会在对方正处于同一槽位的状态切换中时失败，因此前几次重试先自旋；
//! 超过自旋预算后让出调度，让过载主机能调度到我们所等待的一方。

use std::thread;

const SPIN_LIMIT: u32 = 64;

pub(crate) struct Backoff {
    attempts: u32,
}

impl Backoff {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { attempts: 0 }
    }

    /// ### English
    /// Waits a little before the next retry.
    ///
    /// ### 中文
    /// 在下一次重试前稍作等待。
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.attempts < SPIN_LIMIT {
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
        self.attempts = self.attempts.saturating_add(1);
    }

    /// ### English
    /// Number of retries so far (used to flag pathological contention in logs).
    ///
    /// ### 中文
    /// 已重试次数（用于在日志中标记异常争用）。
    #[inline]
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}
