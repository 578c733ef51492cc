//! 실행 파이프라인 모듈
//!
//! 탐색 → 크기 검증 → 출력 대상별 묶기 → 읽기/정리 → 출력 생성 순으로
//! 한 번의 실행을 조율합니다. 탐색 풀과 처리 풀은 겹치지 않고 차례로 동작합니다.

use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cleaner::HeuristicCleanerFactory;
use crate::config::Config;
use crate::error::{PackError, Result};
use crate::finder::FileFinder;
use crate::manager::{derive_output_targets, FileManager};
use crate::output::{GeneratedOutput, OutputGenerator, OutputTarget};
use crate::paths::absolutize;
use crate::processor::FileProcessor;
use crate::stats::{summarize_inputs, InputSummary, Statistics, StatsSnapshot};

/// 출력 대상 하나의 실행 결과
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub target: OutputTarget,
    pub files: Vec<PathBuf>,
    /// 게시된 출력 (드라이런이거나 빈 묶음이면 없음)
    pub output: Option<GeneratedOutput>,
}

/// 전체 실행 결과
#[derive(Debug)]
pub struct RunReport {
    pub inputs: Vec<InputSummary>,
    pub groups: Vec<GroupReport>,
    /// 검증 단계에서 파일당 제한으로 제외된 파일
    pub dropped: Vec<(PathBuf, u64)>,
    /// 처리 단계에서 크기 제한으로 건너뛴 파일
    pub skipped: Vec<(PathBuf, u64)>,
    /// 결과에 포함된 심볼릭 링크와 대상
    pub symlinks: Vec<(PathBuf, PathBuf)>,
    /// 탐색/처리 중 수집된 비치명적 에러
    pub errors: Vec<PackError>,
    pub stats: StatsSnapshot,
    pub dry_run: bool,
}

impl RunReport {
    /// 대표 에러 (처음 수집된 에러)
    pub fn first_error(&self) -> Option<&PackError> {
        self.errors.first()
    }

    /// 검증을 통과한 전체 파일 수
    pub fn total_files(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// 한 번의 실행
pub struct Pipeline {
    config: Config,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// 처리 단계 진행률 바 설정 (길이는 검증 후 정해짐)
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 파이프라인 실행
    ///
    /// 검증/출력 크기 에러는 즉시 반환됩니다. 개별 파일 처리 에러는
    /// 보고서에 모이고 해당 묶음은 성공한 파일들로 게시됩니다.
    pub fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        let work_dir = &config.work_dir;
        let stats = Arc::new(Statistics::new());
        let roots: Vec<PathBuf> = config
            .inputs
            .iter()
            .map(|input| absolutize(input, work_dir))
            .collect();

        let finder = FileFinder::new(config.matcher.clone())
            .with_follow_symlinks(config.follow_symlinks)
            .with_work_dir(work_dir.clone());
        let discovery = finder.find_matching_files(&config.inputs)?;
        stats.add_found(discovery.files.len());
        info!(files = discovery.files.len(), "탐색 완료");

        let mut errors = Vec::new();
        if let Some(error) = discovery.first_error {
            warn!(error = %error, "일부 입력 탐색 실패");
            errors.push(error);
        }

        let manager = FileManager::new(config.limits).with_work_dir(work_dir.clone());
        let validated = manager.validate_files(discovery.files)?;
        for error in validated.errors {
            stats.increment_failed();
            errors.push(error);
        }

        let targets: Vec<OutputTarget> = if config.outputs.is_empty() {
            derive_output_targets(&config.inputs, &[], config.format, work_dir)?
        } else {
            config.outputs.clone()
        }
        .into_iter()
        .map(|target| OutputTarget {
            path: absolutize(&target.path, work_dir),
            format: target.format,
        })
        .collect();
        let groups = manager.group_files_by_output(&validated.files, &targets);
        let inputs = summarize_inputs(&roots, &validated.sizes);
        let sizes: HashMap<&PathBuf, u64> =
            validated.sizes.iter().map(|(path, size)| (path, *size)).collect();

        let mut report = RunReport {
            inputs,
            groups: Vec::with_capacity(groups.len()),
            dropped: validated.dropped,
            skipped: Vec::new(),
            symlinks: discovery.symlinks,
            errors,
            stats: stats.snapshot(),
            dry_run: config.dry_run,
        };

        if config.dry_run {
            report.groups = groups
                .into_iter()
                .map(|group| GroupReport {
                    target: group.target,
                    files: group.files,
                    output: None,
                })
                .collect();
            return Ok(report);
        }

        let mut processor = FileProcessor::new(roots, config.limits.max_file_size)
            .with_statistics(Arc::clone(&stats));
        if config.clean.is_enabled() {
            processor = processor.with_cleaner(Arc::new(HeuristicCleanerFactory::new(config.clean)));
        }
        if let Some(pb) = &self.progress {
            pb.set_length(validated.files.len() as u64);
            processor = processor.with_progress(pb.clone());
        }

        for group in groups {
            if group.files.is_empty() {
                debug!(output = %group.target.path.display(), "파일이 없는 출력 대상 건너뜀");
                report.groups.push(GroupReport {
                    target: group.target,
                    files: group.files,
                    output: None,
                });
                continue;
            }

            let processed = processor.process_files(&group.files);
            report.skipped.extend(processed.skipped);
            report.errors.extend(processed.errors);

            let generator = OutputGenerator::new(group.target.clone(), config.limits.max_output_size)
                .with_work_dir(work_dir.clone());
            let output = generator.generate(&processed.contents).map_err(|error| match error {
                PackError::OutputTooLarge { path, size, limit, .. } => PackError::OutputTooLarge {
                    path,
                    size,
                    limit,
                    files: group
                        .files
                        .iter()
                        .map(|file| (file.clone(), sizes.get(file).copied().unwrap_or(0)))
                        .collect(),
                },
                other => other,
            })?;
            stats.add_bytes_written(output.bytes);
            info!(
                path = %output.path.display(),
                documents = output.documents,
                bytes = output.bytes,
                "출력 게시"
            );

            report.groups.push(GroupReport {
                target: group.target,
                files: group.files,
                output: Some(output),
            });
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("완료!");
        }

        report.stats = stats.snapshot();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn config(work_dir: &std::path::Path, extra: &[&str]) -> Config {
        let mut argv = vec!["ctxpack"];
        argv.extend_from_slice(extra);
        Config::from_args(&Args::parse_from(argv))
            .unwrap()
            .with_work_dir(work_dir.to_path_buf())
    }

    #[test]
    fn test_oversize_file_dropped_from_output() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.go"), vec![b'a'; 50]).unwrap();
        fs::write(src.join("b.go"), vec![b'b'; 2000]).unwrap();

        let cfg = config(
            temp_dir.path(),
            &[
                "-i", "src", "-p", "*.go", "-o", "out.json",
                "--max-file-size", "1000B", "--max-output-size", "10000B",
            ],
        );
        let report = Pipeline::new(cfg).run().unwrap();

        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.inputs[0].file_count, 1);
        assert_eq!(report.inputs[0].total_size, 50);

        let written = fs::read_to_string(temp_dir.path().join("out.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        let documents = value["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["source"], "a.go");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("main.rs"), "fn main() {}").unwrap();

        let cfg = config(temp_dir.path(), &["-i", ".", "-o", "out.xml", "--dry-run"]);
        let report = Pipeline::new(cfg).run().unwrap();

        assert!(report.dry_run);
        assert_eq!(report.total_files(), 1);
        assert!(report.groups[0].output.is_none());
        assert!(!temp_dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_default_target_named_after_input() {
        let temp_dir = TempDir::new().unwrap();
        let lib = temp_dir.path().join("lib");
        fs::create_dir(&lib).unwrap();
        fs::write(lib.join("util.py"), "print('hi')\n").unwrap();

        let cfg = config(temp_dir.path(), &["-i", "lib"]);
        let report = Pipeline::new(cfg).run().unwrap();

        let output = report.groups[0].output.as_ref().unwrap();
        assert_eq!(output.path, temp_dir.path().join("lib.xml"));
        assert_eq!(output.documents, 1);
        assert!(fs::read_to_string(&output.path)
            .unwrap()
            .contains("<source>util.py</source>"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_does_not_abort_run() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("main.go"), "package main").unwrap();
        std::os::unix::fs::symlink(src.join("gone.go"), src.join("dangling.go")).unwrap();

        let cfg = config(temp_dir.path(), &["-i", "src", "-p", "*.go", "-o", "out.xml"]);
        let report = Pipeline::new(cfg).run().unwrap();

        assert_eq!(report.total_files(), 1);
        assert_eq!(report.stats.files_failed, 1);
        assert!(matches!(
            report.first_error(),
            Some(PackError::FileOpenError { file, .. }) if file.ends_with("dangling.go")
        ));

        let written = fs::read_to_string(temp_dir.path().join("out.xml")).unwrap();
        assert!(written.contains("<source>main.go</source>"));
        assert!(!written.contains("dangling.go"));
    }

    #[test]
    fn test_output_too_large_lists_group_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), vec![b'a'; 400]).unwrap();
        fs::write(temp_dir.path().join("b.txt"), vec![b'b'; 400]).unwrap();

        // 입력 합계는 제한 안이지만 XML 감싸기로 제한을 넘음
        let cfg = config(
            temp_dir.path(),
            &["-i", ".", "-p", "*.txt", "-o", "out.xml", "--max-output-size", "820B"],
        );
        match Pipeline::new(cfg).run() {
            Err(PackError::OutputTooLarge { path, files, .. }) => {
                assert_eq!(path, temp_dir.path().join("out.xml"));
                assert_eq!(
                    files,
                    vec![
                        (temp_dir.path().join("a.txt"), 400),
                        (temp_dir.path().join("b.txt"), 400),
                    ]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!temp_dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_total_size_exceeded_is_terminal() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), vec![b'a'; 600]).unwrap();
        fs::write(temp_dir.path().join("b.txt"), vec![b'b'; 600]).unwrap();

        let cfg = config(
            temp_dir.path(),
            &["-i", ".", "-o", "out.xml", "--max-output-size", "1KB"],
        );
        assert!(matches!(
            Pipeline::new(cfg).run(),
            Err(PackError::TotalSizeExceeded { .. })
        ));
        assert!(!temp_dir.path().join("out.xml").exists());
    }
}
