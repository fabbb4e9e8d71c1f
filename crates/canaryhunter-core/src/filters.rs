//! 排除过滤器（文本 / 内核地址）
//!
//! 两类过滤器都是启发式：命中即认为“不是金丝雀”，无论其熵多高。
use serde::{Deserialize, Serialize};

/// 判断 64 位值是否“像 ASCII 文本”
/// - 按值本身的 8 个字节逐一检查（不做字节序重解释）
/// - 每个字节都是 0x00 或 7 位 ASCII（0x00-0x7F）才返回 true
pub fn looks_like_ascii(value: u64) -> bool {
    value.to_le_bytes().iter().all(|&b| b == 0 || b.is_ascii())
}

/// 地址区间：值右移 `shift` 位后等于 `pattern` 即视为落在该区间
/// 默认 shift=44、pattern=0xfffff，即高 20 位全 1 的内核半区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub shift: u32,
    pub pattern: u64,
}

impl AddressRange {
    pub const KERNEL_HIGH_HALF: AddressRange = AddressRange { shift: 44, pattern: 0xfffff };

    /// 值是否落在该区间；shift 越界时按“不匹配”处理
    pub fn contains(&self, value: u64) -> bool {
        value.checked_shr(self.shift).map_or(false, |high| high == self.pattern)
    }

    /// 区间参数是否自洽：shift 在 1..=63，且 pattern 能放进剩余的高位
    pub fn is_valid(&self) -> bool {
        (1..=63).contains(&self.shift) && self.pattern >> (64 - self.shift) == 0
    }
}

impl Default for AddressRange {
    fn default() -> Self {
        Self::KERNEL_HIGH_HALF
    }
}

/// 判断 64 位值是否像内核指针（默认区间：bits 63..44 全部置位）
pub fn looks_like_kernel_pointer(value: u64) -> bool {
    AddressRange::KERNEL_HIGH_HALF.contains(value)
}
