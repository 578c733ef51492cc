//! CLI 인자 파싱 모듈
//!
//! clap을 사용한 명령줄 인자 정의 및 파싱을 담당합니다.

use clap::Parser;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// ctxpack CLI 인자 구조체
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ctxpack",
    version,
    about = "CONTEXT PACKER - 소스 트리를 LLM 컨텍스트용 XML/JSON/YAML 문서로 묶는 CLI 도구",
    long_about = r#"
CONTEXT PACKER
==============

입력 경로들을 탐색하여 glob 패턴과 일치하는 파일을 찾고,
크기 제한을 검사한 뒤 하나 이상의 XML/JSON/YAML 문서로 묶습니다.

특징:
  • 쉼표 구분 패턴과 중괄호 확장 ("*.{go,rs}", "src/**/*.py")
  • 파일당/출력 전체 크기 제한
  • 여러 출력 대상에 경로 기준으로 파일 분배
  • 임시 파일에 먼저 쓰고 제한 이하일 때만 게시
  • 선택적 주석/로그 호출 제거

예제:
  ctxpack -i ./src -o context.xml
  ctxpack -i ./src -p "*.go" -e "*_test.go" -o context.json
  ctxpack -i dir1,dir2 -o dir1/out.xml,dir2/out.xml
  ctxpack -i . --max-file-size 512KB --max-output-size 5MB --dry-run
"#
)]
pub struct Args {
    /// 탐색할 입력 경로 (쉼표로 구분하거나 여러 번 지정)
    #[arg(short, long, value_delimiter = ',', default_value = ".")]
    pub input: Vec<PathBuf>,

    /// 출력 파일 경로 (확장자로 형식 결정, 기본값: 입력 이름.xml)
    #[arg(short, long, value_delimiter = ',')]
    pub output: Vec<PathBuf>,

    /// 포함할 파일 패턴 (쉼표로 구분된 glob, 예: "*.go,*.rs", "src/**/*.{ts,tsx}")
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// 제외할 파일 패턴 (쉼표로 구분된 glob)
    #[arg(short, long)]
    pub exclude: Option<String>,

    /// 파일당 최대 크기 (예: 512KB, 10MB)
    #[arg(long, default_value = "10MB")]
    pub max_file_size: String,

    /// 출력 파일 최대 크기 (예: 50MB)
    #[arg(long, default_value = "50MB")]
    pub max_output_size: String,

    /// 출력 형식 (지정하면 출력 확장자보다 우선)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// 심볼릭 링크 추적
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// 소스 파일의 주석 제거
    #[arg(long)]
    pub clean: bool,

    /// 소스 파일의 한 줄짜리 로그 호출 제거
    #[arg(long)]
    pub strip_logging: bool,

    /// 병렬 처리 스레드 수 (기본값: CPU 코어 수)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// 상세 출력 모드
    #[arg(short, long)]
    pub verbose: bool,

    /// 실제 출력 없이 처리될 파일과 출력 대상만 표시
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ctxpack"]);
        assert_eq!(args.input, vec![PathBuf::from(".")]);
        assert!(args.output.is_empty());
        assert_eq!(args.pattern, "*");
        assert_eq!(args.max_file_size, "10MB");
        assert_eq!(args.max_output_size, "50MB");
        assert!(!args.follow_symlinks);
        assert!(args.format.is_none());
    }

    #[test]
    fn test_comma_separated_paths() {
        let args = Args::parse_from([
            "ctxpack",
            "-i",
            "dir1,dir2",
            "-o",
            "a.xml",
            "-o",
            "b.json",
            "-p",
            "*.{go,rs}",
            "--format",
            "yaml",
        ]);
        assert_eq!(args.input, vec![PathBuf::from("dir1"), PathBuf::from("dir2")]);
        assert_eq!(args.output, vec![PathBuf::from("a.xml"), PathBuf::from("b.json")]);
        assert_eq!(args.pattern, "*.{go,rs}");
        assert_eq!(args.format, Some(OutputFormat::Yaml));
    }
}
