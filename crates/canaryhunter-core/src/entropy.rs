//! 半字节香农熵
//!
//! 金丝雀来自高熵随机源，而指针、小整数中大量半字节重复，
//! 因此以 16 个半字节的分布熵衡量一个字“看起来有多随机”。

/// 16 个半字节各出现一次时的最大熵：log2(16)
pub const MAX_NIBBLE_ENTROPY: f32 = 4.0;

/// 每个 64 位字包含的半字节数
const NIBBLES: usize = 16;

/// 计算 64 位值在其 16 个半字节上的香农熵，结果位于 [0, 4]
pub fn nibble_entropy(value: u64) -> f32 {
    let mut count = [0u8; 16];
    let mut v = value;
    for _ in 0..NIBBLES {
        count[(v & 0xf) as usize] += 1;
        v >>= 4;
    }

    let mut entropy = 0.0f32;
    for &c in count.iter() {
        if c > 0 {
            let p = c as f32 / NIBBLES as f32;
            entropy -= p * p.log2();
        }
    }
    entropy
}
