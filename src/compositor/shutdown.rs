//! ### English
//! Explicit shutdown channel handed out at server startup.
//!
//! The trigger side is owned by whoever decides the server is going down (a signal thread,
//! the main loop...). Tokens are cloned into every component that must react. Firing is a
//! channel disconnect, so dropping the trigger fires it as well: a crashed owner can never
//! leave waiters parked forever.
//!
//! ### 中文
//! 服务启动时下发的显式 shutdown 通道。
//!
//! 触发端由决定关闭服务的一方持有（信号线程、主循环等）。token 会被克隆到所有需要响应的组件中。
//! 触发即通道断开，因此 drop 触发端同样视为触发：持有者崩溃时不会让等待方永远挂起。
use std::time::Duration;

use crossbeam_channel as channel;

/// ### English
/// Creates a connected trigger/token pair.
///
/// ### 中文
/// 创建一对相连的触发端与 token。
pub fn channel() -> (ShutdownTrigger, ShutdownToken) {
    let (tx, rx) = channel::bounded::<()>(0);
    (ShutdownTrigger { _tx: tx }, ShutdownToken { rx })
}

/// ### English
/// Fires the shutdown when triggered or dropped.
///
/// ### 中文
/// 调用 trigger 或被 drop 时触发 shutdown。
pub struct ShutdownTrigger {
    _tx: channel::Sender<()>,
}

impl ShutdownTrigger {
    pub fn trigger(self) {
        log::debug!("shutdown triggered");
    }
}

/// ### English
/// Observes a shutdown. Cheap to clone; every clone sees the same event.
///
/// ### 中文
/// 观察 shutdown 事件。克隆开销很小；所有克隆看到同一事件。
#[derive(Clone)]
pub struct ShutdownToken {
    rx: channel::Receiver<()>,
}

impl ShutdownToken {
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(channel::TryRecvError::Disconnected))
    }

    /// ### English
    /// Blocks until the shutdown fires.
    ///
    /// ### 中文
    /// 阻塞直到 shutdown 触发。
    pub fn wait(&self) {
        // Nothing is ever sent; `recv` only returns once the trigger is gone.
        while self.rx.recv().is_ok() {}
    }

    /// ### English
    /// Blocks up to `timeout`; returns whether the shutdown fired.
    ///
    /// ### 中文
    /// 最多阻塞 `timeout`；返回 shutdown 是否已触发。
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => self.is_triggered(),
            Err(channel::RecvTimeoutError::Timeout) => false,
            Err(channel::RecvTimeoutError::Disconnected) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn token_is_quiet_until_triggered() {
        let (trigger, token) = channel();
        assert!(!token.is_triggered());
        assert!(!token.wait_timeout(Duration::from_millis(10)));
        trigger.trigger();
        assert!(token.is_triggered());
        assert!(token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn dropping_the_trigger_fires() {
        let (trigger, token) = channel();
        drop(trigger);
        assert!(token.is_triggered());
    }

    #[test]
    fn every_clone_wakes() {
        let (trigger, token) = channel();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || token.wait())
            })
            .collect();
        trigger.trigger();
        for waiter in waiters {
            waiter.join().unwrap();
        }
    }
}
