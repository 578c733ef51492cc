//! 파일 탐색 모듈
//!
//! 여러 입력 루트를 병렬로 순회하며 패턴과 일치하는 파일을 찾습니다.
//! 각 워커는 자기 루트의 발견 목록을 소유하고, 디렉토리 중복 방문 방지와
//! 최종 병합만 공유 상태(`SeenPaths`)를 거칩니다.

use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{PackError, Result};
use crate::paths::{absolutize, to_slash};
use crate::pattern::PatternMatcher;

/// 탐색 중 발견된 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// 순회 중 발견된 경로 (심볼릭 링크일 수 있음)
    pub path: PathBuf,
    /// 모든 링크를 따라간 실제 경로 (중복 제거 키)
    pub real_path: PathBuf,
    pub is_symlink: bool,
}

/// 실제 경로 집합과 심볼릭 링크 맵 (항상 함께 잠금)
#[derive(Debug, Default)]
struct SeenPaths {
    real_paths: HashSet<PathBuf>,
    symlinks: HashMap<PathBuf, PathBuf>,
}

/// 루트 하나의 탐색 결과
#[derive(Debug, Default)]
struct RootScan {
    files: Vec<DiscoveredFile>,
    errors: Vec<PackError>,
}

/// 전체 탐색 결과
#[derive(Debug)]
pub struct Discovery {
    /// 일치한 파일의 절대 경로 (정렬됨)
    pub files: Vec<PathBuf>,
    /// 결과에 포함된 심볼릭 링크와 그 대상
    pub symlinks: Vec<(PathBuf, PathBuf)>,
    /// 처음 발생한 에러 (일부 루트만 실패한 경우)
    pub first_error: Option<PackError>,
}

/// 패턴 기반 파일 탐색기
pub struct FileFinder {
    matcher: PatternMatcher,
    follow_symlinks: bool,
    work_dir: Option<PathBuf>,
}

fn lock(seen: &Mutex<SeenPaths>) -> MutexGuard<'_, SeenPaths> {
    seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FileFinder {
    pub fn new(matcher: PatternMatcher) -> Self {
        Self {
            matcher,
            follow_symlinks: false,
            work_dir: None,
        }
    }

    /// 심볼릭 링크 추적 설정
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// 상대 루트를 해석할 기준 디렉토리 (기본값: 현재 작업 디렉토리)
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    /// 모든 루트에서 일치하는 파일 탐색
    ///
    /// 루트들은 rayon 풀에서 병렬로 순회됩니다. 한 루트의 실패는 다른 루트에
    /// 영향을 주지 않으며, 결과가 비어 있을 때만 에러로 반환됩니다.
    pub fn find_matching_files(&self, roots: &[PathBuf]) -> Result<Discovery> {
        let work_dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| PackError::Walk {
                path: PathBuf::from("."),
                reason: e.to_string(),
            })?,
        };

        let seen = Mutex::new(SeenPaths::default());
        let scans: Vec<RootScan> = roots
            .par_iter()
            .map(|root| self.scan_root(&absolutize(root, &work_dir), &seen))
            .collect();

        let mut files = BTreeSet::new();
        let mut errors = Vec::new();
        let symlinks = {
            let mut seen = lock(&seen);
            for scan in scans {
                errors.extend(scan.errors);
                for file in scan.files {
                    if file.is_symlink {
                        seen.symlinks.insert(file.path.clone(), file.real_path);
                        files.insert(file.path);
                    } else if seen.real_paths.insert(file.real_path.clone()) {
                        files.insert(file.path);
                    } else {
                        debug!(path = %file.path.display(), real = %file.real_path.display(), "중복 파일 제외");
                    }
                }
            }
            let mut symlinks: Vec<(PathBuf, PathBuf)> = seen.symlinks.drain().collect();
            symlinks.sort();
            symlinks
        };

        let mut errors = errors.into_iter();
        if files.is_empty() {
            return Err(errors.next().unwrap_or_else(|| self.no_match_error(roots)));
        }

        Ok(Discovery {
            files: files.into_iter().collect(),
            symlinks,
            first_error: errors.next(),
        })
    }

    fn no_match_error(&self, roots: &[PathBuf]) -> PackError {
        let include = self.matcher.include_patterns();
        let exclude = self.matcher.exclude_patterns();
        PackError::NoFilesMatched {
            patterns: if include.is_empty() {
                "*".to_string()
            } else {
                include.join(", ")
            },
            excludes: if exclude.is_empty() {
                "없음".to_string()
            } else {
                exclude.join(", ")
            },
            inputs: roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn scan_root(&self, root: &Path, seen: &Mutex<SeenPaths>) -> RootScan {
        let mut scan = RootScan::default();

        let metadata = match fs::metadata(root) {
            Ok(m) => m,
            Err(e) => {
                let error = if e.kind() == io::ErrorKind::NotFound {
                    PackError::InputNotFound {
                        path: root.to_path_buf(),
                    }
                } else {
                    PackError::FileOpenError {
                        file: root.to_path_buf(),
                        reason: e.to_string(),
                    }
                };
                warn!(root = %root.display(), error = %error, "루트 탐색 중단");
                scan.errors.push(error);
                return scan;
            }
        };

        if !metadata.is_dir() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.matcher.should_include(&name) {
                let is_symlink = fs::symlink_metadata(root)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                scan.files.push(DiscoveredFile {
                    path: root.to_path_buf(),
                    real_path: fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
                    is_symlink,
                });
            }
            return scan;
        }

        if self.follow_symlinks {
            let real = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
            if !lock(seen).real_paths.insert(real) {
                debug!(root = %root.display(), "이미 탐색한 루트, 건너뜀");
                return scan;
            }
        }

        debug!(root = %root.display(), "루트 탐색 시작");
        self.walk_tree(root, root, root, seen, &mut scan);
        scan
    }

    /// `walk_from`을 실제로 순회하되 결과 경로는 `shown_as` 아래에 있는 것처럼 기록
    fn walk_tree(
        &self,
        walk_from: &Path,
        shown_as: &Path,
        root: &Path,
        seen: &Mutex<SeenPaths>,
        scan: &mut RootScan,
    ) {
        let walker = WalkDir::new(walk_from)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry, seen));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    record_walk_error(err, scan);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let shown = match entry.path().strip_prefix(walk_from) {
                Ok(rest) => shown_as.join(rest),
                Err(_) => entry.path().to_path_buf(),
            };
            let relative = match shown.strip_prefix(root) {
                Ok(rest) => to_slash(rest),
                Err(_) => to_slash(&shown),
            };

            if file_type.is_symlink() {
                self.visit_symlink(entry.path(), shown, &relative, root, seen, scan);
            } else if self.matcher.should_include(&relative) {
                let real_path =
                    fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
                scan.files.push(DiscoveredFile {
                    path: shown,
                    real_path,
                    is_symlink: false,
                });
            }
        }
    }

    fn visit_symlink(
        &self,
        link: &Path,
        shown: PathBuf,
        relative: &str,
        root: &Path,
        seen: &Mutex<SeenPaths>,
        scan: &mut RootScan,
    ) {
        if !self.follow_symlinks {
            if !self.matcher.should_include(relative) {
                return;
            }
            // 추적하지 않으므로 디렉토리 링크는 내려가지 않고, 대상은 보고용으로만 해석
            let real_path = match fs::canonicalize(link) {
                Ok(real) if real.is_dir() => {
                    debug!(link = %shown.display(), "디렉토리 링크, 추적 안 함");
                    return;
                }
                Ok(real) => real,
                Err(_) => shown.clone(),
            };
            scan.files.push(DiscoveredFile {
                path: shown,
                real_path,
                is_symlink: true,
            });
            return;
        }

        match fs::canonicalize(link) {
            Ok(real) if real.is_dir() => {
                let first_visit = lock(seen).real_paths.insert(real.clone());
                if first_visit {
                    debug!(link = %shown.display(), real = %real.display(), "링크된 디렉토리 탐색");
                    self.walk_tree(&real, &shown, root, seen, scan);
                } else {
                    debug!(link = %shown.display(), real = %real.display(), "이미 탐색한 디렉토리, 건너뜀");
                }
            }
            Ok(real) => {
                if self.matcher.should_include(relative) {
                    scan.files.push(DiscoveredFile {
                        path: shown,
                        real_path: real,
                        is_symlink: true,
                    });
                }
            }
            Err(e) => {
                debug!(link = %shown.display(), error = %e, "끊어진 링크, 링크 경로로 매칭");
                if self.matcher.should_include(relative) {
                    scan.files.push(DiscoveredFile {
                        real_path: shown.clone(),
                        path: shown,
                        is_symlink: true,
                    });
                }
            }
        }
    }

    /// `.git`은 잘라내고, 링크 추적 중에는 이미 방문한 실제 디렉토리를 건너뜀
    fn should_descend(&self, entry: &DirEntry, seen: &Mutex<SeenPaths>) -> bool {
        if !entry.file_type().is_dir() {
            return true;
        }
        if entry.file_name() == ".git" {
            return false;
        }
        if self.follow_symlinks {
            if let Ok(real) = fs::canonicalize(entry.path()) {
                return lock(seen).real_paths.insert(real);
            }
        }
        true
    }
}

fn record_walk_error(err: walkdir::Error, scan: &mut RootScan) {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();

    if err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
        warn!(path = %path.display(), "권한이 없어 건너뜁니다");
        return;
    }

    warn!(path = %path.display(), error = %err, "항목 탐색 실패");
    scan.errors.push(PackError::Walk {
        path,
        reason: err.to_string(),
    });
}
