//! 泄露数据源（可注入）
//!
//! 真实的泄露通道（系统调用把多余的栈内容拷进定长结构体）与平台强相关，
//! 这里只约定“能产出一块 LeakBuffer”。分析核心只依赖这个能力，
//! 测试时用合成缓冲区替代。
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::buffer::{ByteOrder, LeakBuffer};
use crate::error::{AcquisitionError, LeakError};
use crate::options::HeuristicOptions;
use crate::select::select_canary_with;
use crate::types::Candidate;

/// 默认窗口（字节）：原泄露结构体中被泄露字段的大小，即 128 个字
pub const DEFAULT_WINDOW_BYTES: usize = 1024;

/// 泄露数据源：每次调用产出一块新的泄露缓冲区
pub trait LeakSource {
    /// 用于日志与错误信息的描述
    fn describe(&self) -> String;

    /// 读取一次泄露数据
    fn acquire(&mut self) -> Result<LeakBuffer, AcquisitionError>;
}

/// 任意闭包都可作为数据源（便于测试与嵌入）
impl<F> LeakSource for F
where
    F: FnMut() -> Result<LeakBuffer, AcquisitionError>,
{
    fn describe(&self) -> String {
        "closure".to_string()
    }

    fn acquire(&mut self) -> Result<LeakBuffer, AcquisitionError> {
        self()
    }
}

/// 内存数据源：固定的一段字节
#[derive(Debug, Clone)]
pub struct MemoryLeakSource {
    bytes: Vec<u8>,
    order: ByteOrder,
}

impl MemoryLeakSource {
    pub fn new(bytes: Vec<u8>, order: ByteOrder) -> Self {
        Self { bytes, order }
    }
}

impl LeakSource for MemoryLeakSource {
    fn describe(&self) -> String {
        format!("memory ({} bytes)", self.bytes.len())
    }

    fn acquire(&mut self) -> Result<LeakBuffer, AcquisitionError> {
        Ok(LeakBuffer::from_bytes(&self.bytes, self.order)?)
    }
}

/// 文件数据源：从转储文件的 `offset` 处读取 `window` 字节
/// - `window` 为 None 时读取 offset 之后的全部内容
/// - 文件不足一个窗口视为获取失败（ShortRead），不做截断
#[derive(Debug, Clone)]
pub struct FileLeakSource {
    path: PathBuf,
    offset: u64,
    window: Option<usize>,
    order: ByteOrder,
}

impl FileLeakSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            window: Some(DEFAULT_WINDOW_BYTES),
            order: ByteOrder::Native,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.window = window;
        self
    }

    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_window(&self) -> std::io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        match self.window {
            Some(n) => {
                reader.take(n as u64).read_to_end(&mut buf)?;
            }
            None => {
                reader.read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }
}

impl LeakSource for FileLeakSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn acquire(&mut self) -> Result<LeakBuffer, AcquisitionError> {
        let bytes = self.read_window().map_err(|source| AcquisitionError::Io {
            source_name: self.describe(),
            source,
        })?;
        if let Some(expected) = self.window {
            if bytes.len() < expected {
                return Err(AcquisitionError::ShortRead { expected, got: bytes.len() });
            }
        }
        debug!(source = %self.describe(), offset = self.offset, bytes = bytes.len(), "leak window acquired");
        Ok(LeakBuffer::from_bytes(&bytes, self.order)?)
    }
}

/// 获取一次泄露数据并选择金丝雀（核心不重试，重试由调用方决定）
pub fn leak_canary(source: &mut dyn LeakSource, opts: &HeuristicOptions) -> Result<Candidate, LeakError> {
    let buffer = source.acquire()?;
    Ok(select_canary_with(&buffer, opts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LayoutError, SelectionError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CANARY: u64 = 0x9e37_79b9_7f4a_7c15;

    fn dump(words: &[u64]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }

    #[test]
    fn file_source_reads_window_at_offset() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&dump(&[CANARY, 0, 0, 0x1122_3344_5566_7788, 0])).unwrap();

        let mut src = FileLeakSource::new(file.path()).with_offset(16).with_window(Some(16));
        let buf = src.acquire().unwrap();
        assert_eq!(buf.words(), &[0, 0x1122_3344_5566_7788]);

        let mut whole = FileLeakSource::new(file.path()).with_window(None);
        assert_eq!(whole.acquire().unwrap().len(), 5);
    }

    #[test]
    fn file_source_reports_short_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&dump(&[CANARY; 4])).unwrap();
        let mut src = FileLeakSource::new(file.path());
        match src.acquire() {
            Err(AcquisitionError::ShortRead { expected, got }) => {
                assert_eq!(expected, DEFAULT_WINDOW_BYTES);
                assert_eq!(got, 32);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn file_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut src = FileLeakSource::new(dir.path().join("missing.bin"));
        assert!(matches!(src.acquire(), Err(AcquisitionError::Io { .. })));
    }

    #[test]
    fn misaligned_memory_is_a_layout_error() {
        let mut src = MemoryLeakSource::new(vec![0u8; 9], ByteOrder::Native);
        assert!(matches!(
            src.acquire(),
            Err(AcquisitionError::Layout(LayoutError::Misaligned { len: 9 }))
        ));
    }

    #[test]
    fn leak_canary_composes_acquire_and_select() {
        let mut src = MemoryLeakSource::new(dump(&[0, CANARY, 0]), ByteOrder::Native);
        let c = leak_canary(&mut src, &HeuristicOptions::default()).unwrap();
        assert_eq!(c.value, CANARY);
        assert_eq!(c.index, 1);

        let mut empty = MemoryLeakSource::new(dump(&[0; 16]), ByteOrder::Native);
        assert!(matches!(
            leak_canary(&mut empty, &HeuristicOptions::default()),
            Err(LeakError::Selection(SelectionError::NoCandidateFound))
        ));
    }

    #[test]
    fn closures_act_as_sources() {
        let mut calls = 0;
        let mut src = || {
            calls += 1;
            LeakBuffer::from_words(vec![0, CANARY]).map_err(AcquisitionError::from)
        };
        let c = leak_canary(&mut src, &HeuristicOptions::default()).unwrap();
        assert_eq!(c.value, CANARY);
        drop(src);
        assert_eq!(calls, 1);
    }
}
