//! 栈金丝雀识别核心库
//!
//! 设计要点：
//! - 输入为信息泄露通道拷出的一段定长字节（按 8 字节字对齐），输出为最可能是
//!   `__stack_chk_guard` 的那个 64 位字及其可能性打分，或明确的失败原因。
//! - 判定由三部分组成：半字节熵打分、ASCII 文本排除、内核地址区间排除。
//! - 分析部分为纯函数，无共享可变状态，可在多线程中对独立缓冲区并发调用。
//! - 泄露数据的获取被抽象为 `LeakSource`，便于用合成缓冲区测试。

mod batch;
mod buffer;
mod entropy;
mod error;
mod filters;
mod options;
mod profile;
mod select;
mod source;
mod types;

pub use batch::{analyze_dir_and_write, BatchOptions, BatchStats};
pub use buffer::{ByteOrder, LeakBuffer, WORD_SIZE};
pub use entropy::{nibble_entropy, MAX_NIBBLE_ENTROPY};
pub use error::{AcquisitionError, LayoutError, LeakError, ProfileError, SelectionError};
pub use filters::{looks_like_ascii, looks_like_kernel_pointer, AddressRange};
pub use options::{HeuristicOptions, SelectionStats, DEFAULT_ENTROPY_THRESHOLD};
pub use profile::load_profile;
pub use select::{
    classify, inspect, likelihood, select_canary, select_canary_with, select_with_stats,
};
pub use source::{leak_canary, FileLeakSource, LeakSource, MemoryLeakSource, DEFAULT_WINDOW_BYTES};
pub use types::{format_canary, BatchItem, Candidate, WordClass, WordReport};
