//! 公共类型（对外暴露）
use serde::Serialize;

/// 候选：一个 64 位字及其可能性打分（0 或 (阈值, 4]）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(serialize_with = "serialize_hex")]
    pub value: u64,
    pub score: f32,
    /// 该字在缓冲区中的下标（字为单位）
    pub index: usize,
}

/// 单个字的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "class", content = "entropy", rename_all = "snake_case")]
pub enum WordClass {
    /// 全零填充
    Zero,
    /// 与当前最佳值相同，被跳过
    Repeat,
    /// 落在保留地址区间，视为指针
    KernelPointer,
    /// 全部字节为 ASCII，视为文本
    Text,
    /// 熵不超过阈值
    LowEntropy(f32),
    /// 通过全部过滤，打分即熵
    Candidate(f32),
}

impl WordClass {
    /// 对应的可能性打分；只有 Candidate 为正
    pub fn score(&self) -> f32 {
        match *self {
            WordClass::Candidate(e) => e,
            _ => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WordClass::Zero => "zero",
            WordClass::Repeat => "repeat",
            WordClass::KernelPointer => "kernel-pointer",
            WordClass::Text => "text",
            WordClass::LowEntropy(_) => "low-entropy",
            WordClass::Candidate(_) => "candidate",
        }
    }
}

/// 逐字报告项（inspect 输出）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WordReport {
    pub index: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub value: u64,
    #[serde(flatten)]
    pub class: WordClass,
    /// 是否为最终胜出的字
    pub selected: bool,
}

/// 批量分析输出项（对应 result.json 的单个元素）
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 以定宽小写十六进制呈现 64 位值
pub fn format_canary(value: u64) -> String {
    format!("{value:016x}")
}

fn serialize_hex<S: serde::Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_canary(*value))
}
