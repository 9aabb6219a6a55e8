//! ### English
//! Graphics buffer description shared between clients and the compositor.
//!
//! A `Buffer` never carries pixels itself: the platform handle names the backing storage and
//! the swapper only ever moves `Arc<Buffer>` identities around.
//!
//! ### 中文
//! 客户端与合成器之间共享的图形缓冲描述。
//!
//! `Buffer` 本身不携带像素：平台句柄指向实际存储，swapper 只在各方之间传递 `Arc<Buffer>` 身份。

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use dpi::PhysicalSize;

/// ### English
/// Next buffer id handed out by [`BufferId::next`]. Starts at 1 so 0 never names a buffer.
///
/// ### 中文
/// [`BufferId::next`] 将分配的下一个 ID。从 1 开始，0 永远不对应任何缓冲。
static NEXT_BUFFER_ID: AtomicU32 = AtomicU32::new(1);

/// ### English
/// Stable identity of one buffer for the lifetime of the process.
///
/// ### 中文
/// 缓冲在进程生命周期内的稳定身份。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

impl BufferId {
    /// ### English
    /// Allocates a fresh, never-reused id.
    ///
    /// ### 中文
    /// 分配一个新的、永不复用的 ID。
    pub fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// ### English
/// Pixel layouts the allocator understands.
///
/// ### 中文
/// 分配器支持的像素格式。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Abgr8888,
    Xbgr8888,
    Argb8888,
    Xrgb8888,
    Bgr888,
    Rgb565,
}

impl PixelFormat {
    /// ### English
    /// Bytes occupied by one pixel.
    ///
    /// ### 中文
    /// 单个像素占用的字节数。
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Abgr8888 | Self::Xbgr8888 | Self::Argb8888 | Self::Xrgb8888 => 4,
            Self::Bgr888 => 3,
            Self::Rgb565 => 2,
        }
    }

    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Abgr8888 | Self::Argb8888)
    }
}

/// ### English
/// Who is expected to touch the pixels: the GPU (`Hardware`) or the CPU (`Software`).
///
/// ### 中文
/// 像素的预期访问方：GPU（`Hardware`）或 CPU（`Software`）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Hardware,
    Software,
}

/// ### English
/// Allocation request: everything the allocator needs to produce one buffer.
///
/// ### 中文
/// 分配请求：分配器创建一个缓冲所需的全部信息。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferProperties {
    pub size: PhysicalSize<u32>,
    pub format: PixelFormat,
    pub usage: BufferUsage,
}

impl BufferProperties {
    pub fn new(size: PhysicalSize<u32>, format: PixelFormat, usage: BufferUsage) -> Self {
        Self {
            size,
            format,
            usage,
        }
    }

    /// ### English
    /// Minimum stride in bytes (no alignment padding).
    ///
    /// ### 中文
    /// 最小行跨度（字节，不含对齐填充）。
    pub fn min_stride(&self) -> u32 {
        self.size.width.saturating_mul(self.format.bytes_per_pixel())
    }
}

/// ### English
/// Opaque platform handle (dma-buf fd, gralloc handle, shm offset...) cast to `u64`.
///
/// ### 中文
/// 不透明的平台句柄（dma-buf fd、gralloc 句柄、shm 偏移等），转为 `u64` 存储。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// ### English
/// One allocated graphics buffer.
///
/// Immutable after allocation; ownership hand-off is tracked by the swapper, never by the
/// buffer itself.
///
/// ### 中文
/// 一个已分配的图形缓冲。
///
/// 分配后不可变；所有权交接由 swapper 记录，缓冲自身不记录。
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    properties: BufferProperties,
    /// ### English
    /// Bytes per row, possibly padded past `width * bpp` for alignment.
    ///
    /// ### 中文
    /// 每行字节数，可能为对齐而大于 `width * bpp`。
    stride: u32,
    handle: NativeHandle,
}

impl Buffer {
    /// ### English
    /// Creates a buffer description with a fresh id.
    ///
    /// #### Parameters
    /// - `properties`: Size, format and usage of the buffer.
    /// - `stride`: Row pitch in bytes (must be at least `properties.min_stride()`).
    /// - `handle`: Platform handle naming the backing storage.
    ///
    /// ### 中文
    /// 创建带有新 ID 的缓冲描述。
    ///
    /// #### 参数
    /// - `properties`：缓冲的尺寸、格式与用途。
    /// - `stride`：行跨度（字节），至少为 `properties.min_stride()`。
    /// - `handle`：指向实际存储的平台句柄。
    pub fn new(properties: BufferProperties, stride: u32, handle: NativeHandle) -> Self {
        debug_assert!(stride >= properties.min_stride());
        Self {
            id: BufferId::next(),
            properties,
            stride,
            handle,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.properties.size
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.properties.format
    }

    pub fn usage(&self) -> BufferUsage {
        self.properties.usage
    }

    pub fn properties(&self) -> BufferProperties {
        self.properties
    }

    pub fn native_handle(&self) -> NativeHandle {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(width: u32, height: u32, format: PixelFormat) -> BufferProperties {
        BufferProperties::new(PhysicalSize::new(width, height), format, BufferUsage::Software)
    }

    #[test]
    fn ids_are_unique_and_nonzero() {
        let a = Buffer::new(props(4, 4, PixelFormat::Abgr8888), 16, NativeHandle(1));
        let b = Buffer::new(props(4, 4, PixelFormat::Abgr8888), 16, NativeHandle(2));
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id().as_u32(), 0);
        assert_ne!(b.id().as_u32(), 0);
    }

    #[test]
    fn min_stride_tracks_format_depth() {
        assert_eq!(props(10, 1, PixelFormat::Xbgr8888).min_stride(), 40);
        assert_eq!(props(10, 1, PixelFormat::Bgr888).min_stride(), 30);
        assert_eq!(props(10, 1, PixelFormat::Rgb565).min_stride(), 20);
    }

    #[test]
    fn accessors_reflect_construction() {
        let properties = props(1024, 768, PixelFormat::Argb8888);
        let buffer = Buffer::new(properties, 4096, NativeHandle(0xfeed));
        assert_eq!(buffer.size(), PhysicalSize::new(1024, 768));
        assert_eq!(buffer.stride(), 4096);
        assert_eq!(buffer.pixel_format(), PixelFormat::Argb8888);
        assert_eq!(buffer.usage(), BufferUsage::Software);
        assert_eq!(buffer.native_handle(), NativeHandle(0xfeed));
        assert_eq!(buffer.properties(), properties);
    }

    #[test]
    fn alpha_formats() {
        assert!(PixelFormat::Abgr8888.has_alpha());
        assert!(!PixelFormat::Xbgr8888.has_alpha());
        assert!(!PixelFormat::Rgb565.has_alpha());
    }
}
