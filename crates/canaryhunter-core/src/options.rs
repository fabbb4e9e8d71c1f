//! 启发式参数与统计信息（模块）
use serde::{Deserialize, Serialize};

use crate::buffer::ByteOrder;
use crate::filters::AddressRange;

/// 熵阈值：熵小于等于该值的字不可能是 `__stack_chk_guard`
pub const DEFAULT_ENTROPY_THRESHOLD: f32 = 2.7;

/// 启发式参数（均可按目标平台重新标定，不属于协议常量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicOptions {
    /// 熵阈值（严格大于才可能入选）
    pub entropy_threshold: f32,
    /// 视为指针的保留地址区间
    pub pointer_range: AddressRange,
    /// 跳过与当前最佳值相同的字（纯优化，不影响结果）
    pub skip_repeats: bool,
    /// 字节流拆成 64 位字时使用的字节序
    pub byte_order: ByteOrder,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            pointer_range: AddressRange::KERNEL_HIGH_HALF,
            skip_repeats: true,
            byte_order: ByteOrder::Native,
        }
    }
}

/// 单次选择的统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    pub words_scanned: usize,
    pub repeats_skipped: usize,
    pub zero_words: usize,
    pub kernel_pointers: usize,
    pub text_words: usize,
    pub low_entropy: usize,
    pub candidates: usize,
}
