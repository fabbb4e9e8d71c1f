//! 金丝雀选择：逐字过滤 + 熵打分，保留得分最高的非零字
//!
//! 稳定性保证：
//! - 严格大于才替换当前最佳值，因此同分时最早出现的字胜出
//!   （同一栈槽常被拷贝到多个偏移，报告最早的那一份）
//! - 纯函数：同一缓冲区反复调用结果一致，可并发调用
use tracing::{debug, trace};

use crate::buffer::LeakBuffer;
use crate::entropy::nibble_entropy;
use crate::error::SelectionError;
use crate::filters::looks_like_ascii;
use crate::options::{HeuristicOptions, SelectionStats};
use crate::types::{format_canary, Candidate, WordClass, WordReport};

/// 对单个字分类；检查顺序：指针 → 文本 → 熵阈值
/// 零值单独标注（零本身也会被文本过滤器拒绝，打分相同）
pub fn classify(value: u64, opts: &HeuristicOptions) -> WordClass {
    if value == 0 {
        return WordClass::Zero;
    }
    if opts.pointer_range.contains(value) {
        return WordClass::KernelPointer;
    }
    if looks_like_ascii(value) {
        return WordClass::Text;
    }
    let entropy = nibble_entropy(value);
    if entropy <= opts.entropy_threshold {
        return WordClass::LowEntropy(entropy);
    }
    WordClass::Candidate(entropy)
}

/// 单个字为 `__stack_chk_guard` 的可能性：0 表示排除，否则为其熵
pub fn likelihood(value: u64, opts: &HeuristicOptions) -> f32 {
    classify(value, opts).score()
}

/// 使用默认参数选择金丝雀，只返回值本身
pub fn select_canary(buffer: &LeakBuffer) -> Result<u64, SelectionError> {
    select_canary_with(buffer, &HeuristicOptions::default()).map(|c| c.value)
}

/// 使用给定参数选择金丝雀，返回值、打分与下标
pub fn select_canary_with(buffer: &LeakBuffer, opts: &HeuristicOptions) -> Result<Candidate, SelectionError> {
    select_with_stats(buffer, opts).0
}

/// 选择金丝雀并返回扫描统计
pub fn select_with_stats(
    buffer: &LeakBuffer,
    opts: &HeuristicOptions,
) -> (Result<Candidate, SelectionError>, SelectionStats) {
    let mut stats = SelectionStats::default();
    let mut best = Candidate { value: 0, score: 0.0, index: 0 };

    for (index, &word) in buffer.words().iter().enumerate() {
        stats.words_scanned += 1;
        if opts.skip_repeats && word == best.value {
            stats.repeats_skipped += 1;
            continue;
        }
        let class = classify(word, opts);
        tally(&mut stats, &class);
        let score = class.score();
        if score > best.score {
            trace!(index, value = %format_canary(word), score, "new best candidate");
            best = Candidate { value: word, score, index };
        }
    }

    debug!(
        words = stats.words_scanned,
        candidates = stats.candidates,
        pointers = stats.kernel_pointers,
        text = stats.text_words,
        "canary scan finished"
    );

    if best.value == 0 {
        return (Err(SelectionError::NoCandidateFound), stats);
    }
    (Ok(best), stats)
}

/// 逐字报告：与选择算法同一遍扫描，标注每个字的分类与是否胜出
pub fn inspect(buffer: &LeakBuffer, opts: &HeuristicOptions) -> Vec<WordReport> {
    let mut best = Candidate { value: 0, score: 0.0, index: 0 };
    let mut reports: Vec<WordReport> = Vec::with_capacity(buffer.len());

    for (index, &word) in buffer.words().iter().enumerate() {
        let class = if opts.skip_repeats && word == best.value && word != 0 {
            WordClass::Repeat
        } else {
            classify(word, opts)
        };
        if class.score() > best.score {
            best = Candidate { value: word, score: class.score(), index };
        }
        reports.push(WordReport { index, value: word, class, selected: false });
    }

    if best.value != 0 {
        if let Some(r) = reports.get_mut(best.index) {
            r.selected = true;
        }
    }
    reports
}

fn tally(stats: &mut SelectionStats, class: &WordClass) {
    match class {
        WordClass::Zero => stats.zero_words += 1,
        WordClass::Repeat => stats.repeats_skipped += 1,
        WordClass::KernelPointer => stats.kernel_pointers += 1,
        WordClass::Text => stats.text_words += 1,
        WordClass::LowEntropy(_) => stats.low_entropy += 1,
        WordClass::Candidate(_) => stats.candidates += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(words: &[u64]) -> LeakBuffer {
        LeakBuffer::from_words(words.to_vec()).unwrap()
    }

    const PAIRED: u64 = 0x1122_3344_5566_7788; // 熵 3.0
    const MAX_A: u64 = 0x0123_4567_89AB_CDEF; // 熵 4.0
    const MAX_B: u64 = 0xFEDC_BA98_7654_3210; // 熵 4.0
    const MID: u64 = 0x9e37_79b9_7f4a_7c15; // 熵约 3.2
    const DEFAULT_THRESHOLD: f32 = crate::options::DEFAULT_ENTROPY_THRESHOLD;

    #[test]
    fn all_zero_buffer_has_no_candidate() {
        assert_eq!(select_canary(&buf(&[0; 128])), Err(SelectionError::NoCandidateFound));
    }

    #[test]
    fn single_high_entropy_word_is_selected() {
        let c = select_canary_with(&buf(&[PAIRED, 0, 0]), &HeuristicOptions::default()).unwrap();
        assert_eq!(c.value, PAIRED);
        assert_eq!(c.index, 0);
        assert!((c.score - nibble_entropy(PAIRED)).abs() < 1e-6);
    }

    #[test]
    fn earliest_of_equal_scores_wins() {
        let words = [0, MID, MAX_A, PAIRED, MAX_B, MAX_A];
        let c = select_canary_with(&buf(&words), &HeuristicOptions::default()).unwrap();
        assert_eq!(c.value, MAX_A);
        assert_eq!(c.index, 2);

        let words = [MID, MAX_B, 0, MAX_A];
        let c = select_canary_with(&buf(&words), &HeuristicOptions::default()).unwrap();
        assert_eq!(c.value, MAX_B);
        assert_eq!(c.index, 1);
    }

    #[test]
    fn filtered_words_never_win_despite_entropy() {
        let path = u64::from_ne_bytes(*b"/usr/lib");
        let ptr = 0xFFFF_FE08_12A3_B4C5;
        assert!(nibble_entropy(path) > DEFAULT_THRESHOLD);
        assert!(nibble_entropy(ptr) > DEFAULT_THRESHOLD);
        assert_eq!(select_canary(&buf(&[path, ptr, 0])), Err(SelectionError::NoCandidateFound));
        assert_eq!(select_canary(&buf(&[path, ptr, MID])), Ok(MID));
    }

    #[test]
    fn threshold_is_exclusive() {
        let e = nibble_entropy(MID);
        let at = HeuristicOptions { entropy_threshold: e, ..Default::default() };
        assert_eq!(likelihood(MID, &at), 0.0);
        assert_eq!(select_canary_with(&buf(&[MID]), &at), Err(SelectionError::NoCandidateFound));

        let below = HeuristicOptions { entropy_threshold: e - 1e-4, ..Default::default() };
        assert_eq!(likelihood(MID, &below), e);
        assert_eq!(select_canary_with(&buf(&[MID]), &below).map(|c| c.value), Ok(MID));
    }

    #[test]
    fn low_entropy_words_are_rejected() {
        let low = 0x0000_0000_DEAD_BEEF;
        assert!(matches!(classify(low, &HeuristicOptions::default()), WordClass::LowEntropy(_)));
        assert_eq!(select_canary(&buf(&[low])), Err(SelectionError::NoCandidateFound));
    }

    #[test]
    fn stats_count_each_rejection() {
        let words = [0, 0, u64::from_ne_bytes(*b"kldstat\0"), 0xFFFF_FFFF_8123_4567, 0xDEAD_BEEF, MID, MID];
        let (res, stats) = select_with_stats(&buf(&words), &HeuristicOptions::default());
        assert_eq!(res.map(|c| c.value), Ok(MID));
        assert_eq!(stats.words_scanned, 7);
        // 初始最佳值为 0，零字走“重复”路径
        assert_eq!(stats.repeats_skipped, 3);
        assert_eq!(stats.text_words, 1);
        assert_eq!(stats.kernel_pointers, 1);
        assert_eq!(stats.low_entropy, 1);
        assert_eq!(stats.candidates, 1);
    }

    #[test]
    fn skipping_repeats_is_only_an_optimization() {
        let words = [0, MID, MID, PAIRED, MAX_A, MAX_A, 0];
        let fast = HeuristicOptions::default();
        let slow = HeuristicOptions { skip_repeats: false, ..Default::default() };
        assert_eq!(select_canary_with(&buf(&words), &fast), select_canary_with(&buf(&words), &slow));
    }

    #[test]
    fn inspect_marks_the_winner() {
        let words = [0, MID, MAX_A, MAX_A];
        let reports = inspect(&buf(&words), &HeuristicOptions::default());
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].class, WordClass::Zero);
        assert!(matches!(reports[1].class, WordClass::Candidate(_)));
        assert!(reports[2].selected);
        assert_eq!(reports[3].class, WordClass::Repeat);
        assert_eq!(reports.iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn inspect_marks_nothing_without_candidate() {
        let reports = inspect(&buf(&[0, 0xDEAD_BEEF]), &HeuristicOptions::default());
        assert!(reports.iter().all(|r| !r.selected));
    }
}
