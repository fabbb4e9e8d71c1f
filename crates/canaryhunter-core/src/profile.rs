//! 启发式配置文件加载（TOML）
use serde::Deserialize;
use std::path::Path;

use crate::buffer::ByteOrder;
use crate::entropy::MAX_NIBBLE_ENTROPY;
use crate::error::ProfileError;
use crate::filters::AddressRange;
use crate::options::HeuristicOptions;

/// `[heuristics]` 表（所有字段可选，缺省取默认值）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeuristicsEntry {
    #[serde(default)]
    entropy_threshold: Option<f32>,
    #[serde(default)]
    pointer_shift: Option<u32>,
    #[serde(default)]
    pointer_pattern: Option<u64>,
    #[serde(default)]
    skip_repeats: Option<bool>,
    #[serde(default)]
    byte_order: Option<ByteOrder>,
}

/// 顶层配置文件结构
#[derive(Debug, Clone, Default, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    heuristics: HeuristicsEntry,
}

/// 从 TOML 配置文件加载启发式参数，并做合法性校验
pub fn load_profile(path: &Path) -> Result<HeuristicOptions, ProfileError> {
    let txt = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ProfileFile = toml::from_str(&txt).map_err(|source| ProfileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |reason: String| ProfileError::Invalid { path: path.to_path_buf(), reason };

    let h = parsed.heuristics;
    let defaults = HeuristicOptions::default();
    let opts = HeuristicOptions {
        entropy_threshold: h.entropy_threshold.unwrap_or(defaults.entropy_threshold),
        pointer_range: AddressRange {
            shift: h.pointer_shift.unwrap_or(defaults.pointer_range.shift),
            pattern: h.pointer_pattern.unwrap_or(defaults.pointer_range.pattern),
        },
        skip_repeats: h.skip_repeats.unwrap_or(defaults.skip_repeats),
        byte_order: h.byte_order.unwrap_or(defaults.byte_order),
    };

    // 阈值 ≥ 4 时任何字都不可能入选
    let t = opts.entropy_threshold;
    if !t.is_finite() || !(0.0..MAX_NIBBLE_ENTROPY).contains(&t) {
        return Err(invalid(format!("entropy_threshold {t} must be within [0, 4)")));
    }
    if !opts.pointer_range.is_valid() {
        return Err(invalid(format!(
            "pointer_pattern {:#x} does not fit above bit {}",
            opts.pointer_range.pattern, opts.pointer_range.shift
        )));
    }
    Ok(opts)
}
