//! 파일 관리 모듈
//!
//! 크기 문자열 파싱, 크기 제한 검증, 출력 대상별 파일 묶기,
//! 기본 출력 경로 유도를 담당합니다.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::error::{PackError, Result};
use crate::output::{OutputFormat, OutputTarget};
use crate::paths::{absolutize, clean_path, last_segment};

/// 매칭되지 않은 파일 묶음의 출력 이름 접미사
pub const UNMATCHED_SUFFIX: &str = "_unmatched";

const SIZE_UNITS: &[(&str, u64)] = &[
    ("TB", 1024 * 1024 * 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("KB", 1024),
    ("B", 1),
];

/// 사람이 읽는 크기 문자열을 바이트 수로 변환
///
/// 대소문자를 구분하지 않고 공백을 무시하며, `B|KB|MB|GB|TB` 단위(1024 배수)가
/// 반드시 있어야 합니다. 0, 음수, 단위 없는 숫자는 에러입니다.
///
/// # Examples
/// ```
/// use ctxpack::manager::parse_size;
///
/// assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
/// assert_eq!(parse_size(" 2 kb ").unwrap(), 2048);
/// assert!(parse_size("100").is_err());
/// ```
pub fn parse_size(input: &str) -> Result<u64> {
    let invalid = |reason: &str| PackError::InvalidSize {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let (number, multiplier) = SIZE_UNITS
        .iter()
        .find_map(|(unit, multiplier)| {
            normalized
                .strip_suffix(unit)
                .map(|number| (number, *multiplier))
        })
        .ok_or_else(|| invalid("단위(B, KB, MB, GB, TB)가 필요합니다"))?;

    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("양의 정수가 필요합니다"));
    }

    let value: u64 = number
        .parse()
        .map_err(|_| invalid("숫자가 너무 큽니다"))?;
    if value == 0 {
        return Err(invalid("0보다 커야 합니다"));
    }

    value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("바이트 수가 너무 큽니다"))
}

/// 파일당/출력 전체 크기 제한
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_file_size: u64,
    pub max_output_size: u64,
}

impl SizeLimits {
    /// 두 제한 모두 0보다 커야 합니다.
    pub fn new(max_file_size: u64, max_output_size: u64) -> Result<Self> {
        if max_file_size == 0 {
            return Err(PackError::InvalidSizeLimit {
                name: "max-file-size".to_string(),
            });
        }
        if max_output_size == 0 {
            return Err(PackError::InvalidSizeLimit {
                name: "max-output-size".to_string(),
            });
        }
        Ok(Self {
            max_file_size,
            max_output_size,
        })
    }
}

/// 크기 검증을 통과한 파일들
#[derive(Debug)]
pub struct ValidatedFiles {
    pub files: Vec<PathBuf>,
    /// 파일당 제한을 넘어 제외된 파일과 크기
    pub dropped: Vec<(PathBuf, u64)>,
    /// 남은 파일 크기 합계
    pub total_size: u64,
    /// 남은 파일과 크기 (보고용)
    pub sizes: Vec<(PathBuf, u64)>,
    /// 크기를 조회하지 못해 제외된 파일의 에러
    pub errors: Vec<PackError>,
}

/// 출력 대상 하나와 그에 속한 파일들
#[derive(Debug, Clone, PartialEq)]
pub struct FileGroup {
    pub target: OutputTarget,
    pub files: Vec<PathBuf>,
}

/// 파일 검증과 출력 묶음 관리자
pub struct FileManager {
    limits: SizeLimits,
    work_dir: Option<PathBuf>,
}

impl FileManager {
    pub fn new(limits: SizeLimits) -> Self {
        Self {
            limits,
            work_dir: None,
        }
    }

    /// 상대 경로 비교 기준 디렉토리 (기본값: 현재 작업 디렉토리)
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// 파일 크기 검증
    ///
    /// 파일당 제한을 넘는 파일은 경고 후 제외하고, 크기를 조회할 수 없는 파일
    /// (끊어진 링크 등)은 항목 에러로 모은 뒤 계속 진행합니다. 남은 파일이 없거나
    /// 남은 파일 합계가 출력 제한을 넘으면 에러입니다.
    pub fn validate_files(&self, paths: Vec<PathBuf>) -> Result<ValidatedFiles> {
        let mut files = Vec::with_capacity(paths.len());
        let mut dropped = Vec::new();
        let mut sizes = Vec::with_capacity(paths.len());
        let mut errors = Vec::new();
        let mut total_size: u64 = 0;

        for path in paths {
            let size = match fs::metadata(&path) {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "파일 크기 조회 실패, 제외");
                    errors.push(PackError::FileOpenError {
                        file: path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if size > self.limits.max_file_size {
                warn!(
                    path = %path.display(),
                    size,
                    limit = self.limits.max_file_size,
                    "파일당 크기 제한 초과, 제외"
                );
                dropped.push((path, size));
                continue;
            }

            total_size = total_size.saturating_add(size);
            sizes.push((path.clone(), size));
            files.push(path);
        }

        if files.is_empty() {
            if dropped.is_empty() {
                if let Some(error) = errors.into_iter().next() {
                    return Err(error);
                }
            }
            return Err(PackError::AllFilesTooLarge {
                limit: self.limits.max_file_size,
            });
        }

        if total_size > self.limits.max_output_size {
            return Err(PackError::TotalSizeExceeded {
                total: total_size,
                limit: self.limits.max_output_size,
                files: sizes,
            });
        }

        Ok(ValidatedFiles {
            files,
            dropped,
            total_size,
            sizes,
            errors,
        })
    }

    /// 파일들을 출력 대상별로 묶기
    ///
    /// 대상이 하나면 모든 파일이 그 대상에 속합니다. 여러 개면 확장자를 뗀 경로끼리
    /// 앞쪽 경로 구성 요소가 가장 많이 같은 대상을 고르고(동률이면 먼저 등록된 대상),
    /// 하나도 같지 않은 파일은 첫 대상 옆의 `_unmatched` 묶음에 모읍니다.
    pub fn group_files_by_output(
        &self,
        files: &[PathBuf],
        targets: &[OutputTarget],
    ) -> Vec<FileGroup> {
        let Some(first) = targets.first() else {
            return Vec::new();
        };

        if targets.len() == 1 {
            return vec![FileGroup {
                target: first.clone(),
                files: files.to_vec(),
            }];
        }

        let work_dir = self.work_dir();
        let keys: Vec<Vec<String>> = targets
            .iter()
            .map(|t| comparison_key(&t.path, &work_dir))
            .collect();

        let mut groups: Vec<FileGroup> = targets
            .iter()
            .map(|t| FileGroup {
                target: t.clone(),
                files: Vec::new(),
            })
            .collect();
        let mut unmatched = Vec::new();

        for file in files {
            let key = comparison_key(file, &work_dir);
            let mut best: Option<(usize, usize)> = None;
            for (index, target_key) in keys.iter().enumerate() {
                let shared = common_prefix_len(&key, target_key);
                if shared > 0 && best.map_or(true, |(_, b)| shared > b) {
                    best = Some((index, shared));
                }
            }

            match best {
                Some((index, _)) => groups[index].files.push(file.clone()),
                None => unmatched.push(file.clone()),
            }
        }

        if !unmatched.is_empty() {
            groups.push(FileGroup {
                target: unmatched_target(first),
                files: unmatched,
            });
        }

        groups
    }
}

/// 확장자를 떼고 작업 디렉토리 기준으로 만든 경로 구성 요소 목록
fn comparison_key(path: &Path, work_dir: &Path) -> Vec<String> {
    let stem_path = path.with_extension("");
    let absolute = absolutize(&stem_path, work_dir);
    let relative = match absolute.strip_prefix(work_dir) {
        Ok(rest) => rest.to_path_buf(),
        Err(_) => clean_path(&stem_path),
    };

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect()
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// 첫 대상의 디렉토리와 이름을 따른 `_unmatched` 출력 대상 (기본 형식)
fn unmatched_target(first: &OutputTarget) -> OutputTarget {
    let stem = first
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let format = OutputFormat::default();
    let name = format!("{stem}{UNMATCHED_SUFFIX}.{}", format.extension());

    OutputTarget {
        path: first.path.with_file_name(name),
        format,
    }
}

/// 입력 경로에서 유도한 기본 출력 경로 (작업 디렉토리 안)
///
/// 디렉토리는 이름 그대로, 파일은 확장자를 뗀 이름에 형식 확장자를 붙입니다.
pub fn default_output_path(input: &Path, format: OutputFormat, work_dir: &Path) -> PathBuf {
    let absolute = absolutize(input, work_dir);
    let base = if absolute.is_file() {
        absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    } else {
        last_segment(&absolute)
    }
    .unwrap_or_else(|| "output".to_string());

    work_dir.join(format!("{base}.{}", format.extension()))
}

/// 출력 대상 목록 유도
///
/// 출력 경로가 주어지면 그대로 쓰고, 없으면 입력마다 기본 출력 경로를 만듭니다.
pub fn derive_output_targets(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    format_override: Option<OutputFormat>,
    work_dir: &Path,
) -> Result<Vec<OutputTarget>> {
    if !outputs.is_empty() {
        return outputs
            .iter()
            .map(|o| OutputTarget::new(o.clone(), format_override))
            .collect();
    }

    let format = format_override.unwrap_or_default();
    let mut targets: Vec<OutputTarget> = Vec::new();
    for input in inputs {
        let path = default_output_path(input, format, work_dir);
        if !targets.iter().any(|t| t.path == path) {
            targets.push(OutputTarget { path, format });
        }
    }
    Ok(targets)
}
