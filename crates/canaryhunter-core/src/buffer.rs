//! 泄露缓冲区：定长、只读的 64 位字序列
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// 字长（字节）
pub const WORD_SIZE: usize = 8;

/// 字节流拆字时的字节序
/// - Native：与本机一致（默认；泄露数据来自本机内核时即为正确选择）
/// - Little / Big：分析其他平台导出的转储时显式指定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    fn word(self, bytes: [u8; WORD_SIZE]) -> u64 {
        match self {
            ByteOrder::Native => u64::from_ne_bytes(bytes),
            ByteOrder::Little => u64::from_le_bytes(bytes),
            ByteOrder::Big => u64::from_be_bytes(bytes),
        }
    }
}

impl std::str::FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(ByteOrder::Native),
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => Err(format!("unknown byte order: {other}")),
        }
    }
}

/// 泄露缓冲区（长度 > 0，构造后不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakBuffer {
    words: Vec<u64>,
}

impl LeakBuffer {
    /// 从原始字节构造；长度必须为 8 的正整数倍
    pub fn from_bytes(bytes: &[u8], order: ByteOrder) -> Result<Self, LayoutError> {
        if bytes.is_empty() {
            return Err(LayoutError::Empty);
        }
        if bytes.len() % WORD_SIZE != 0 {
            return Err(LayoutError::Misaligned { len: bytes.len() });
        }
        let words = bytes
            .chunks_exact(WORD_SIZE)
            .map(|chunk| {
                let mut raw = [0u8; WORD_SIZE];
                raw.copy_from_slice(chunk);
                order.word(raw)
            })
            .collect();
        Ok(Self { words })
    }

    /// 直接由字序列构造（测试与合成数据用）
    pub fn from_words(words: Vec<u64>) -> Result<Self, LayoutError> {
        if words.is_empty() {
            return Err(LayoutError::Empty);
        }
        Ok(Self { words })
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// 恒为 false（构造时已保证非空），仅为配合 `len`
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
