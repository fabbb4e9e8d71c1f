//! 批量分析主流程与并行调度
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::LeakError;
use crate::options::HeuristicOptions;
use crate::source::{leak_canary, FileLeakSource, DEFAULT_WINDOW_BYTES};
use crate::types::{format_canary, BatchItem};

/// 批量分析选项
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 启发式参数（所有文件共用）
    pub heuristics: HeuristicOptions,
    /// 每个转储内的窗口起点（字节）
    pub offset: u64,
    /// 窗口大小（字节）；None 表示读取 offset 之后的全部内容
    pub window: Option<usize>,
    /// 最大文件大小（字节）；超过则跳过
    pub max_file_size: Option<u64>,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            heuristics: HeuristicOptions::default(),
            offset: 0,
            window: Some(DEFAULT_WINDOW_BYTES),
            max_file_size: None,
            threads: None,
        }
    }
}

/// 批量统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub files_analyzed: usize,
    pub canaries_found: usize,
    pub no_candidate: usize,
    pub acquisition_failed: usize,
    pub files_skipped: usize,
}

/// 分析目录下的每个转储文件，并将结果以 JSON 数组写入 `out`
/// 稳定性保证：文件按文件名排序，无论串行或并行，输出顺序都可复现
pub fn analyze_dir_and_write(input_dir: &Path, out: &mut dyn Write, opts: &BatchOptions) -> Result<BatchStats> {
    let mut files: Vec<PathBuf> = vec![];
    // 转储目录为单层目录，这里限制深度为 1
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", input_dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut stats = BatchStats::default();
    let mut kept: Vec<PathBuf> = Vec::with_capacity(files.len());
    for path in files {
        if let Some(max) = opts.max_file_size {
            if let Ok(md) = std::fs::metadata(&path) {
                if md.len() > max {
                    debug!(path = %path.display(), size = md.len(), "skipping oversized dump");
                    stats.files_skipped += 1;
                    continue;
                }
            }
        }
        kept.push(path);
    }

    let threads = opts.threads.unwrap_or_else(num_cpus::get);
    let items = if threads > 1 {
        analyze_parallel(&kept, opts, threads)?
    } else {
        kept.iter().map(|p| analyze_file(p, opts)).collect()
    };

    write!(out, "[")?;
    for (i, (item, outcome)) in items.iter().enumerate() {
        if i > 0 {
            write!(out, ",")?;
        }
        serde_json::to_writer(&mut *out, item)?;
        stats.files_analyzed += 1;
        match outcome {
            Outcome::Found => stats.canaries_found += 1,
            Outcome::NoCandidate => stats.no_candidate += 1,
            Outcome::AcquisitionFailed => stats.acquisition_failed += 1,
        }
    }
    write!(out, "]")?;
    Ok(stats)
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Found,
    NoCandidate,
    AcquisitionFailed,
}

/// 并行调度：Rayon 线程池内逐文件分析；collect 保持输入顺序
fn analyze_parallel(files: &[PathBuf], opts: &BatchOptions, threads: usize) -> Result<Vec<(BatchItem, Outcome)>> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("build rayon pool")?;
    Ok(pool.install(|| files.par_iter().map(|p| analyze_file(p, opts)).collect()))
}

/// 单文件分析：失败记录进输出项，不中断整个批次
fn analyze_file(path: &Path, opts: &BatchOptions) -> (BatchItem, Outcome) {
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut source = FileLeakSource::new(path)
        .with_offset(opts.offset)
        .with_window(opts.window)
        .with_byte_order(opts.heuristics.byte_order);

    let mut item = BatchItem { file, canary: None, score: None, index: None, error: None };
    let outcome = match leak_canary(&mut source, &opts.heuristics) {
        Ok(c) => {
            item.canary = Some(format_canary(c.value));
            item.score = Some(c.score);
            item.index = Some(c.index);
            Outcome::Found
        }
        Err(LeakError::Selection(e)) => {
            item.error = Some(e.to_string());
            Outcome::NoCandidate
        }
        Err(e @ LeakError::Acquisition(_)) => {
            warn!(path = %path.display(), error = %e, "dump could not be read");
            item.error = Some(e.to_string());
            Outcome::AcquisitionFailed
        }
    };
    (item, outcome)
}
