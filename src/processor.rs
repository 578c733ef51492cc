//! 파일 처리 모듈
//!
//! 발견된 파일의 읽기, 크기 제한 적용, 상대 경로 계산, 선택적 정리를 담당합니다.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cleaner::{CleanerCache, CleanerFactory, Language};
use crate::error::PackError;
use crate::paths::to_slash;
use crate::stats::Statistics;

/// 처리 워커 수 상한
pub const MAX_WORKERS: usize = 10;

/// 읽기(및 정리)가 끝난 파일 내용
#[derive(Debug, Clone, PartialEq)]
pub struct FileContent {
    /// 루트 기준 `/` 구분 상대 경로
    pub path: String,
    /// 파일 이름
    pub name: String,
    pub content: Vec<u8>,
    /// 점 없는 소문자 확장자
    pub extension: String,
    /// 내용 바이트 길이
    pub size: u64,
}

/// 파일 하나의 처리 결과
#[derive(Debug)]
pub enum FileOutcome {
    /// 정상 처리
    Read(FileContent),
    /// 파일당 크기 제한 초과로 건너뜀 (에러 아님)
    Skipped { path: PathBuf, size: u64 },
    /// 처리 실패
    Failed(PackError),
}

/// 여러 파일의 처리 결과
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// 상대 경로 순으로 정렬된 내용
    pub contents: Vec<FileContent>,
    pub skipped: Vec<(PathBuf, u64)>,
    pub errors: Vec<PackError>,
}

impl ProcessReport {
    /// 대표 에러 (처음 수집된 에러)
    pub fn first_error(&self) -> Option<&PackError> {
        self.errors.first()
    }
}

/// 병렬 파일 처리기
pub struct FileProcessor {
    roots: Vec<PathBuf>,
    max_file_size: u64,
    cleaners: Option<CleanerCache>,
    stats: Arc<Statistics>,
    progress: Option<ProgressBar>,
}

impl FileProcessor {
    /// 새 처리기 생성
    ///
    /// # Arguments
    /// * `roots` - 상대 경로 계산 기준이 되는 절대 입력 경로들
    /// * `max_file_size` - 파일당 크기 제한 (바이트)
    pub fn new(roots: Vec<PathBuf>, max_file_size: u64) -> Self {
        Self {
            roots,
            max_file_size,
            cleaners: None,
            stats: Arc::new(Statistics::new()),
            progress: None,
        }
    }

    /// 클리너 설정 (언어별 클리너는 처음 필요할 때 생성되어 재사용됨)
    pub fn with_cleaner(mut self, factory: Arc<dyn CleanerFactory>) -> Self {
        self.cleaners = Some(CleanerCache::new(factory));
        self
    }

    /// 통계 공유 설정
    pub fn with_statistics(mut self, stats: Arc<Statistics>) -> Self {
        self.stats = stats;
        self
    }

    /// 진행률 바 설정
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 파일 목록을 병렬로 처리
    ///
    /// 워커 수는 `min(파일 수, MAX_WORKERS)`입니다. 한 파일의 실패는 다른 파일
    /// 처리를 막지 않으며, 결과 내용은 완료 순서와 무관하게 상대 경로 순으로 정렬됩니다.
    pub fn process_files(&self, paths: &[PathBuf]) -> ProcessReport {
        let mut report = ProcessReport::default();
        if paths.is_empty() {
            return report;
        }

        let workers = paths.len().min(MAX_WORKERS);
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool,
            Err(e) => {
                report.errors.push(PackError::ThreadPoolError {
                    reason: e.to_string(),
                });
                return report;
            }
        };

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let outcome = self.process_file(path);
                    if let Some(pb) = &self.progress {
                        pb.inc(1);
                    }
                    outcome
                })
                .collect()
        });

        for outcome in outcomes {
            match outcome {
                FileOutcome::Read(content) => report.contents.push(content),
                FileOutcome::Skipped { path, size } => report.skipped.push((path, size)),
                FileOutcome::Failed(error) => report.errors.push(error),
            }
        }
        report.contents.sort_by(|a, b| a.path.cmp(&b.path));

        report
    }

    /// 단일 파일 처리
    pub fn process_file(&self, path: &Path) -> FileOutcome {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                return self.fail(PackError::FileOpenError {
                    file: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        if metadata.is_dir() {
            return self.fail(PackError::IsDirectory {
                path: path.to_path_buf(),
            });
        }

        let size = metadata.len();
        if size > self.max_file_size {
            warn!(
                path = %path.display(),
                size,
                limit = self.max_file_size,
                "파일당 크기 제한 초과, 건너뜀"
            );
            self.stats.increment_skipped();
            return FileOutcome::Skipped {
                path: path.to_path_buf(),
                size,
            };
        }

        let raw = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return self.fail(PackError::FileOpenError {
                    file: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let content = self.clean(path, &extension, raw);

        self.stats.increment_processed();
        self.stats.add_bytes_read(size);

        FileOutcome::Read(FileContent {
            path: self.relative_path(path),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: content.len() as u64,
            content,
            extension,
        })
    }

    fn fail(&self, error: PackError) -> FileOutcome {
        warn!(error = %error, "파일 처리 실패");
        self.stats.increment_failed();
        FileOutcome::Failed(error)
    }

    /// 가장 구체적인 루트 기준 상대 경로 (루트가 파일이면 파일 이름)
    pub fn relative_path(&self, path: &Path) -> String {
        let root = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count());

        match root.and_then(|r| path.strip_prefix(r).ok()) {
            Some(rest) if !rest.as_os_str().is_empty() => to_slash(rest),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| to_slash(path)),
        }
    }

    /// 클리너 적용; 실패나 패닉은 경고 후 원본 사용
    fn clean(&self, path: &Path, extension: &str, content: Vec<u8>) -> Vec<u8> {
        let Some(cache) = &self.cleaners else {
            return content;
        };
        let Some(language) = Language::from_extension(extension) else {
            return content;
        };
        let Some(cleaner) = cache.get_or_create(language) else {
            return content;
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| cleaner.clean(&content, language)));
        match result {
            Ok(Ok(cleaned)) => {
                debug!(path = %path.display(), %language, before = content.len(), after = cleaned.len(), "정리 완료");
                cleaned
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), %language, error = %e, "정리 실패, 원본 사용");
                self.stats.increment_cleaner_fallback();
                content
            }
            Err(payload) => {
                warn!(path = %path.display(), %language, reason = %panic_message(payload.as_ref()), "클리너 패닉, 원본 사용");
                self.stats.increment_cleaner_fallback();
                content
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "알 수 없는 패닉".to_string()
    }
}
