//! ctxpack - CONTEXT PACKER
//!
//! 소스 트리에서 glob 패턴과 일치하는 파일을 찾아 LLM 컨텍스트용
//! XML/JSON/YAML 문서로 묶는 CLI 도구입니다.
//!
//! # 주요 기능
//!
//! - 🔍 **패턴 필터링**: 쉼표 구분, 중괄호 확장, 경로 패턴을 지원하는 glob 포함/제외
//! - 🚀 **병렬 탐색/처리**: Rayon을 활용한 입력 루트 병렬 순회와 파일 병렬 읽기
//! - 🔗 **심볼릭 링크 추적**: 실제 경로 기준 중복 제거와 순환 방지
//! - 📏 **크기 제한**: 파일당 제한(경고 후 제외)과 출력 전체 제한(에러)
//! - 🗂️ **출력 분배**: 여러 출력 대상에 경로가 가장 많이 겹치는 쪽으로 파일 분배
//! - 💾 **안전한 게시**: 임시 파일에 쓰고 제한 이하일 때만 원자적으로 교체
//! - 🧹 **선택적 정리**: 주석과 한 줄짜리 로그 호출 제거
//!
//! # 예제
//!
//! ```bash
//! # 기본 사용법
//! ctxpack -i ./src -o context.xml
//!
//! # 테스트 파일 제외, JSON 출력
//! ctxpack -i ./src -p "*.{go,rs}" -e "*_test.go" -o context.json
//!
//! # 드라이런
//! ctxpack -i . --dry-run
//! ```

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod error;
pub mod finder;
pub mod manager;
pub mod output;
pub mod paths;
pub mod pattern;
pub mod pipeline;
pub mod processor;
pub mod stats;

// Re-exports for convenient access
pub use cli::Args;
pub use config::Config;
pub use error::{PackError, Result};
pub use finder::{Discovery, FileFinder};
pub use manager::{parse_size, FileManager, SizeLimits};
pub use output::{OutputFormat, OutputGenerator, OutputTarget};
pub use pattern::PatternMatcher;
pub use pipeline::{Pipeline, RunReport};
pub use processor::{FileContent, FileProcessor};
pub use stats::{format_bytes, Statistics};
