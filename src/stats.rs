//! 통계 및 유틸리티 모듈
//!
//! 처리 통계 수집 및 포맷팅을 담당합니다.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// 처리 통계 구조체
///
/// 처리 워커들이 동시에 갱신하므로 모든 카운터는 원자적입니다.
#[derive(Debug, Default)]
pub struct Statistics {
    /// 탐색에서 발견된 파일 수
    pub files_found: AtomicUsize,
    /// 성공적으로 읽은 파일 수
    pub files_processed: AtomicUsize,
    /// 크기 제한으로 건너뛴 파일 수
    pub files_skipped: AtomicUsize,
    /// 처리 실패 수
    pub files_failed: AtomicUsize,
    /// 클리너가 실패해 원본을 사용한 수
    pub cleaner_fallbacks: AtomicUsize,
    /// 읽은 총 바이트
    pub total_bytes_read: AtomicU64,
    /// 쓴 총 바이트
    pub total_bytes_written: AtomicU64,
    /// 처리 시작 시간
    start_time: Option<Instant>,
}

impl Statistics {
    /// 새 통계 인스턴스 생성
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn add_found(&self, count: usize) {
        self.files_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_processed(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cleaner_fallback(&self) {
        self.cleaner_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// 읽은 바이트 추가
    pub fn add_bytes_read(&self, bytes: u64) {
        self.total_bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// 쓴 바이트 추가
    pub fn add_bytes_written(&self, bytes: u64) {
        self.total_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// 현재 값의 스냅샷
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_found: self.files_found.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            cleaner_fallbacks: self.cleaner_fallbacks.load(Ordering::Relaxed),
            bytes_read: self.total_bytes_read.load(Ordering::Relaxed),
            bytes_written: self.total_bytes_written.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
        }
    }

    /// 경과 시간 반환
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// 통계 스냅샷 (보고용)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub cleaner_fallbacks: usize,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// 입력 경로별 요약
#[derive(Debug, Clone, PartialEq)]
pub struct InputSummary {
    pub input: PathBuf,
    pub file_count: usize,
    pub total_size: u64,
}

/// 파일 목록을 입력 경로별로 집계
///
/// 여러 입력에 속하는 파일은 가장 긴(가장 구체적인) 입력에만 집계됩니다.
pub fn summarize_inputs(inputs: &[PathBuf], files: &[(PathBuf, u64)]) -> Vec<InputSummary> {
    let mut summaries: Vec<InputSummary> = inputs
        .iter()
        .map(|input| InputSummary {
            input: input.clone(),
            file_count: 0,
            total_size: 0,
        })
        .collect();

    for (path, size) in files {
        let owner = summaries
            .iter_mut()
            .filter(|s| belongs_to(path, &s.input))
            .max_by_key(|s| s.input.components().count());
        if let Some(summary) = owner {
            summary.file_count += 1;
            summary.total_size += size;
        }
    }

    summaries
}

/// 경로가 입력 경로 자체이거나 그 아래에 있는지
pub fn belongs_to(path: &Path, input: &Path) -> bool {
    path == input || path.starts_with(input)
}

/// 바이트를 읽기 쉬운 형식으로 변환
///
/// # Arguments
/// * `bytes` - 바이트 수
///
/// # Returns
/// 형식화된 문자열 (예: "1.25 MB")
///
/// # Examples
/// ```
/// use ctxpack::stats::format_bytes;
///
/// assert_eq!(format_bytes(500), "500 B");
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1048576), "1.00 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 경과 시간을 읽기 쉬운 형식으로 변환
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}시간 {}분", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}분 {}초", mins, remaining_secs)
    } else if secs > 0 {
        format!("{}.{:03}초", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(65)), "1분 5초");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1시간 1분");
    }

    #[test]
    fn test_statistics_counters() {
        let stats = Statistics::new();

        stats.add_found(3);
        stats.increment_processed();
        stats.increment_processed();
        stats.increment_skipped();
        stats.add_bytes_read(1024);
        stats.add_bytes_written(512);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.files_found, 3);
        assert_eq!(snapshot.files_processed, 2);
        assert_eq!(snapshot.files_skipped, 1);
        assert_eq!(snapshot.bytes_read, 1024);
        assert_eq!(snapshot.bytes_written, 512);
    }

    #[test]
    fn test_summarize_inputs_prefers_most_specific() {
        let inputs = vec![PathBuf::from("/p"), PathBuf::from("/p/sub")];
        let files = vec![
            (PathBuf::from("/p/a.go"), 10),
            (PathBuf::from("/p/sub/b.go"), 20),
            (PathBuf::from("/elsewhere/c.go"), 5),
        ];

        let summaries = summarize_inputs(&inputs, &files);
        assert_eq!(summaries[0].file_count, 1);
        assert_eq!(summaries[0].total_size, 10);
        assert_eq!(summaries[1].file_count, 1);
        assert_eq!(summaries[1].total_size, 20);
    }
}
