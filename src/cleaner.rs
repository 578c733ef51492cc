//! 클리너 모듈
//!
//! 언어별 상용구(주석, 로그 호출) 제거기의 인터페이스와
//! 실행 단위 캐시, 정규식 기반 기본 구현을 담당합니다.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{PackError, Result};

/// 클리너가 인식하는 언어 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Go,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Java,
    Kotlin,
    C,
    Cpp,
    CSharp,
    Swift,
    Ruby,
    Php,
    Shell,
}

impl Language {
    /// 확장자(점 없이, 소문자)로 언어 조회
    pub fn from_extension(extension: &str) -> Option<Self> {
        let language = match extension {
            "go" => Language::Go,
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "kt" | "kts" => Language::Kotlin,
            "c" | "h" => Language::C,
            "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "swift" => Language::Swift,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "sh" | "bash" | "zsh" => Language::Shell,
            _ => return None,
        };
        Some(language)
    }

    /// 한 줄 주석 접두사
    fn line_comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Python | Language::Ruby | Language::Shell => &["#"],
            Language::Php => &["//", "#"],
            _ => &["//"],
        }
    }

    /// C 계열 블록 주석 사용 여부
    fn has_block_comments(self) -> bool {
        !matches!(self, Language::Python | Language::Ruby | Language::Shell)
    }

    /// 한 줄짜리 로그 호출 정규식
    fn logging_pattern(self) -> &'static str {
        match self {
            Language::Go => r"^\s*(log|fmt|logger|zap\.\w+\(\))\.(Print|Printf|Println|Fatal|Fatalf|Fatalln|Debug|Debugf|Info|Infof|Warn|Warnf|Error|Errorf)\(.*\)\s*$",
            Language::Rust => r"^\s*(println|eprintln|print|eprint|dbg|trace|debug|info|warn|error|log::\w+|tracing::\w+)!\(.*\);?\s*$",
            Language::Python => r"^\s*(print|logging\.\w+|logger\.\w+|log\.\w+)\(.*\)\s*$",
            Language::JavaScript | Language::TypeScript => {
                r"^\s*console\.(log|debug|info|warn|error|trace)\(.*\);?\s*$"
            }
            Language::Java | Language::Kotlin => {
                r"^\s*(System\.(out|err)\.print(ln|f)?|println|(log|logger|LOG|LOGGER)\.(trace|debug|info|warn|error))\(.*\);?\s*$"
            }
            Language::C | Language::Cpp => {
                r"^\s*((f)?printf\(.*\)|(std::)?(cout|cerr|clog)\s*<<.*);\s*$"
            }
            Language::CSharp => {
                r"^\s*(Console\.Write(Line)?|Debug\.Log|_?[lL]ogger\.Log\w*)\(.*\);\s*$"
            }
            Language::Swift => r"^\s*(print|debugPrint|NSLog)\(.*\)\s*$",
            Language::Ruby => r"^\s*(puts|p|pp|logger\.\w+|Rails\.logger\.\w+)[\s(].*$",
            Language::Php => r"^\s*(echo|print_r|var_dump|error_log)[\s(].*;\s*$",
            Language::Shell => r"^\s*(echo|printf)\s.*$",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Swift => "swift",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Shell => "shell",
        };
        write!(f, "{name}")
    }
}

/// 원본 바이트를 받아 정리된 바이트를 돌려주는 클리너
pub trait Cleaner: Send + Sync {
    fn clean(&self, content: &[u8], language: Language) -> Result<Vec<u8>>;
}

/// 언어별 클리너 생성기
///
/// 지원하지 않는 언어에는 `None`을 돌려줍니다.
pub trait CleanerFactory: Send + Sync {
    fn create(&self, language: Language) -> Option<Arc<dyn Cleaner>>;
}

/// 언어별 클리너 캐시
///
/// 한 번의 실행 동안 언어마다 클리너를 한 번만 생성해 재사용합니다.
/// 조회는 읽기 잠금, 생성은 쓰기 잠금 아래에서 다시 확인한 뒤 수행됩니다.
pub struct CleanerCache {
    factory: Arc<dyn CleanerFactory>,
    cleaners: RwLock<HashMap<Language, Option<Arc<dyn Cleaner>>>>,
}

impl CleanerCache {
    pub fn new(factory: Arc<dyn CleanerFactory>) -> Self {
        Self {
            factory,
            cleaners: RwLock::new(HashMap::new()),
        }
    }

    /// 캐시된 클리너를 돌려주거나 없으면 생성
    pub fn get_or_create(&self, language: Language) -> Option<Arc<dyn Cleaner>> {
        if let Ok(cleaners) = self.cleaners.read() {
            if let Some(cached) = cleaners.get(&language) {
                return cached.clone();
            }
        }

        let mut cleaners = match self.cleaners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cleaners
            .entry(language)
            .or_insert_with(|| self.factory.create(language))
            .clone()
    }

    /// 지금까지 생성(또는 미지원으로 기록)된 언어 수
    pub fn len(&self) -> usize {
        self.cleaners.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 기본 클리너가 제거할 항목
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CleanOptions {
    /// 주석 제거
    pub comments: bool,
    /// 한 줄짜리 로그 호출 제거
    pub logging: bool,
}

impl CleanOptions {
    pub fn is_enabled(&self) -> bool {
        self.comments || self.logging
    }
}

/// 정규식 기반 휴리스틱 클리너
///
/// 줄 단위로 동작하며 문자열 리터럴 내부는 구분하지 않습니다.
pub struct HeuristicCleaner {
    options: CleanOptions,
    line_comment_prefixes: &'static [&'static str],
    block_comment: Option<Regex>,
    logging: Option<Regex>,
}

impl HeuristicCleaner {
    pub fn new(language: Language, options: CleanOptions) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PackError::CleanerFailed {
                language: language.to_string(),
                reason: e.to_string(),
            })
        };

        let block_comment = if options.comments && language.has_block_comments() {
            Some(compile(r"(?s)/\*.*?\*/")?)
        } else {
            None
        };
        let logging = if options.logging {
            Some(compile(language.logging_pattern())?)
        } else {
            None
        };

        Ok(Self {
            options,
            line_comment_prefixes: language.line_comment_prefixes(),
            block_comment,
            logging,
        })
    }

    fn is_line_comment(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        // 셔뱅은 주석으로 보지 않음
        if trimmed.starts_with("#!") {
            return false;
        }
        self.line_comment_prefixes
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
    }
}

impl Cleaner for HeuristicCleaner {
    fn clean(&self, content: &[u8], language: Language) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(content).map_err(|e| PackError::CleanerFailed {
            language: language.to_string(),
            reason: format!("UTF-8이 아닌 내용: {e}"),
        })?;

        let text = match &self.block_comment {
            Some(re) => re.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };

        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            let body = line.trim_end_matches(['\r', '\n']);
            if self.options.comments && self.is_line_comment(body) {
                continue;
            }
            if let Some(re) = &self.logging {
                if re.is_match(body) {
                    continue;
                }
            }
            out.push_str(line);
        }

        Ok(out.into_bytes())
    }
}

/// `HeuristicCleaner` 생성기
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCleanerFactory {
    options: CleanOptions,
}

impl HeuristicCleanerFactory {
    pub fn new(options: CleanOptions) -> Self {
        Self { options }
    }
}

impl CleanerFactory for HeuristicCleanerFactory {
    fn create(&self, language: Language) -> Option<Arc<dyn Cleaner>> {
        match HeuristicCleaner::new(language, self.options) {
            Ok(cleaner) => Some(Arc::new(cleaner)),
            Err(e) => {
                tracing::warn!(%language, error = %e, "클리너 생성 실패");
                None
            }
        }
    }
}
