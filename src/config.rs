//! 실행 설정 모듈
//!
//! CLI 인자를 검증된 불변 설정으로 변환합니다. 모든 설정 에러는
//! 파일 시스템에 접근하기 전에 여기서 발생합니다.

use std::path::PathBuf;

use crate::cleaner::CleanOptions;
use crate::cli::Args;
use crate::error::{PackError, Result};
use crate::manager::{parse_size, SizeLimits};
use crate::output::{OutputFormat, OutputTarget};
use crate::pattern::PatternMatcher;

/// 검증된 실행 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    /// 명시된 출력 대상 (비어 있으면 입력에서 유도)
    pub outputs: Vec<OutputTarget>,
    pub matcher: PatternMatcher,
    /// 사용자가 입력한 포함 패턴 원문
    pub pattern: String,
    /// 사용자가 입력한 제외 패턴 원문
    pub exclude: Option<String>,
    pub limits: SizeLimits,
    pub format: Option<OutputFormat>,
    pub follow_symlinks: bool,
    pub clean: CleanOptions,
    pub threads: Option<usize>,
    pub dry_run: bool,
    pub verbose: bool,
    /// 상대 경로 해석 기준
    pub work_dir: PathBuf,
}

impl Config {
    /// CLI 인자 검증 및 변환
    ///
    /// 검사 순서: 패턴, 크기 제한, 출력 형식.
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.pattern.trim().is_empty() {
            return Err(PackError::EmptyPattern);
        }
        let matcher = PatternMatcher::parse(&args.pattern, args.exclude.as_deref())?;

        let limits = SizeLimits::new(
            parse_size(&args.max_file_size)?,
            parse_size(&args.max_output_size)?,
        )?;

        let outputs = args
            .output
            .iter()
            .map(|o| OutputTarget::new(o.clone(), args.format))
            .collect::<Result<Vec<_>>>()?;

        let inputs = if args.input.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            args.input.clone()
        };

        let work_dir = std::env::current_dir().map_err(|e| PackError::Walk {
            path: PathBuf::from("."),
            reason: e.to_string(),
        })?;

        Ok(Self {
            inputs,
            outputs,
            matcher,
            pattern: args.pattern.clone(),
            exclude: args.exclude.clone(),
            limits,
            format: args.format,
            follow_symlinks: args.follow_symlinks,
            clean: CleanOptions {
                comments: args.clean,
                logging: args.strip_logging,
            },
            threads: args.threads,
            dry_run: args.dry_run,
            verbose: args.verbose,
            work_dir,
        })
    }

    /// 상대 경로 해석 기준 변경
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = work_dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ctxpack"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(&args(&[])).unwrap();
        assert_eq!(config.limits.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_output_size, 50 * 1024 * 1024);
        assert!(config.outputs.is_empty());
        assert!(!config.clean.is_enabled());
        assert!(config.matcher.should_include("anything.txt"));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        assert!(matches!(
            Config::from_args(&args(&["-p", "["])),
            Err(PackError::InvalidPattern { .. })
        ));
        assert!(matches!(
            Config::from_args(&args(&["-p", "  "])),
            Err(PackError::EmptyPattern)
        ));
    }

    #[test]
    fn test_invalid_sizes_fail() {
        assert!(matches!(
            Config::from_args(&args(&["--max-file-size", "100"])),
            Err(PackError::InvalidSize { .. })
        ));
        assert!(matches!(
            Config::from_args(&args(&["--max-output-size", "0MB"])),
            Err(PackError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_output_format() {
        assert!(matches!(
            Config::from_args(&args(&["-o", "out.txt"])),
            Err(PackError::UnsupportedOutputFormat { .. })
        ));

        let config = Config::from_args(&args(&["-o", "out.txt", "-f", "json"])).unwrap();
        assert_eq!(config.outputs[0].format, OutputFormat::Json);

        let config = Config::from_args(&args(&["-o", "a.yml,b.xml"])).unwrap();
        assert_eq!(config.outputs[0].format, OutputFormat::Yaml);
        assert_eq!(config.outputs[1].format, OutputFormat::Xml);
    }
}
