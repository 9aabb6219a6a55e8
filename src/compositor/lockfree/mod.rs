//! ### English
//! Lock-free helpers shared by the swapper hot paths.
//!
//! ### 中文
//! swapper 热路径共用的无锁工具。
mod backoff;

pub(crate) use backoff::Backoff;
