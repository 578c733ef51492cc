//! 에러 타입 정의 모듈
//!
//! ctxpack에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! 설정 에러는 파일 시스템 접근 전에, 탐색/처리 에러는 항목 단위로,
//! 크기 초과 에러는 출력 게시 직전에 발생합니다.

use std::path::PathBuf;
use thiserror::Error;

/// ctxpack에서 발생할 수 있는 에러 타입
#[derive(Error, Debug)]
pub enum PackError {
    /// 입력 경로가 존재하지 않음
    #[error("입력 경로를 찾을 수 없습니다: {path}")]
    InputNotFound { path: PathBuf },

    /// 파일 열기/메타데이터 조회 실패
    #[error("파일을 열 수 없습니다 ({file}): {reason}")]
    FileOpenError { file: PathBuf, reason: String },

    /// 파일 자리에 디렉토리가 전달됨
    #[error("파일이 아니라 디렉토리입니다: {path}")]
    IsDirectory { path: PathBuf },

    /// 디렉토리 탐색 중 실패
    #[error("디렉토리 탐색 실패 ({path}): {reason}")]
    Walk { path: PathBuf, reason: String },

    /// 파일 쓰기 실패
    #[error("파일 쓰기 실패 ({path}): {reason}")]
    WriteError { path: PathBuf, reason: String },

    /// 직렬화 실패
    #[error("출력 직렬화 실패 ({path}): {reason}")]
    SerializeError { path: PathBuf, reason: String },

    /// 스레드 풀 초기화 실패
    #[error("스레드 풀 초기화 실패: {reason}")]
    ThreadPoolError { reason: String },

    /// 빈 패턴
    #[error("패턴이 비어 있습니다")]
    EmptyPattern,

    /// 유효하지 않은 패턴
    #[error("유효하지 않은 패턴 '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 어떤 파일도 패턴과 일치하지 않음
    #[error("패턴 {patterns}과(와) 일치하는 파일이 없습니다 (제외: {excludes}, 입력: {inputs})")]
    NoFilesMatched {
        patterns: String,
        excludes: String,
        inputs: String,
    },

    /// 크기 문자열 파싱 실패
    #[error("유효하지 않은 크기 '{input}': {reason}")]
    InvalidSize { input: String, reason: String },

    /// 크기 제한이 0 이하
    #[error("{name} 값은 0보다 커야 합니다")]
    InvalidSizeLimit { name: String },

    /// 출력 확장자를 인식할 수 없음
    #[error("지원하지 않는 출력 형식입니다 (xml, json, yaml 중 하나여야 함): {path}")]
    UnsupportedOutputFormat { path: PathBuf },

    /// 모든 파일이 파일당 크기 제한을 넘음
    #[error("모든 파일이 파일당 크기 제한({limit} 바이트)을 초과합니다")]
    AllFilesTooLarge { limit: u64 },

    /// 입력 파일 합계가 출력 크기 제한을 넘음
    #[error("입력 파일 총 크기 {total} 바이트가 출력 크기 제한 {limit} 바이트를 초과합니다")]
    TotalSizeExceeded {
        total: u64,
        limit: u64,
        files: Vec<(PathBuf, u64)>,
    },

    /// 직렬화된 출력이 출력 크기 제한을 넘음
    #[error("출력 크기 {size} 바이트가 제한 {limit} 바이트를 초과하여 {path}에 쓰지 않았습니다")]
    OutputTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
        /// 출력에 들어갈 파일과 크기
        files: Vec<(PathBuf, u64)>,
    },

    /// 클리너 실패 (항상 경고로만 처리됨)
    #[error("{language} 클리너 실패: {reason}")]
    CleanerFailed { language: String, reason: String },
}

/// ctxpack 결과 타입 별칭
pub type Result<T> = std::result::Result<T, PackError>;
