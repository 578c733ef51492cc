//! 출력 생성 모듈
//!
//! 처리된 파일 내용을 XML/JSON/YAML 문서로 직렬화하고,
//! 임시 파일에 먼저 쓴 뒤 크기 제한 안에서만 최종 경로로 원자적으로 교체합니다.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PackError, Result};
use crate::processor::FileContent;

/// 출력 문서 형식
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
    Yaml,
}

impl OutputFormat {
    /// 확장자(점 없이)로 형식 조회, 대소문자 무시
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xml" => Some(OutputFormat::Xml),
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }

    /// 경로 확장자로 형식 조회
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// 기본 확장자
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Xml => write!(f, "XML"),
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// 출력 대상 (경로 + 형식)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl OutputTarget {
    /// 출력 대상 생성
    ///
    /// 형식을 지정하지 않으면 확장자에서 유도하며, 인식할 수 없는 확장자는 에러입니다.
    pub fn new(path: PathBuf, format: Option<OutputFormat>) -> Result<Self> {
        let format = match format {
            Some(f) => f,
            None => OutputFormat::from_path(&path)
                .ok_or_else(|| PackError::UnsupportedOutputFormat { path: path.clone() })?,
        };
        Ok(Self { path, format })
    }
}

/// 출력 문서 한 건
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Document {
    /// 1부터 시작하는 순번
    pub index: usize,
    pub source: String,
    pub document_content: String,
}

#[derive(Serialize)]
struct DocumentSet<'a> {
    documents: &'a [Document],
}

/// XML 특수 문자 다섯 개를 엔티티로 변환
///
/// # Examples
/// ```
/// use ctxpack::output::escape_xml;
///
/// assert_eq!(escape_xml("a < b & 'c'"), "a &lt; b &amp; &apos;c&apos;");
/// ```
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// `/` 구분 문자열 경로의 어휘적 정리
fn clean_slash(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// `C:` 같은 드라이브 문자 제거
fn strip_drive(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[2..]
    } else {
        path
    }
}

fn strip_dir_prefix<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir == "/" {
        return Some(path.trim_start_matches('/'));
    }
    if path == dir {
        return Some("");
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// 출력에 기록할 이식 가능한 소스 경로
///
/// - `\`는 `/`로 바꾸고 드라이브 문자(`C:`)는 버립니다.
/// - 작업 디렉토리 안의 절대 경로는 `<작업 디렉토리 마지막 이름>/<나머지>`가 됩니다.
/// - 작업 디렉토리 밖의 절대 경로(UNC 포함)는 앞의 `/`를 떼고 정리합니다.
/// - 상대 경로는 `.`과 `a/..`만 정리하며 앞쪽 `..`은 유지합니다.
pub fn normalize_source_path(path: &str, work_dir: &Path) -> String {
    let unified = path.replace('\\', "/");
    let rest = strip_drive(&unified);

    if !rest.starts_with('/') {
        return clean_slash(rest);
    }

    let cleaned = clean_slash(rest);
    let work = work_dir.to_string_lossy().replace('\\', "/");
    let work = clean_slash(strip_drive(&work));

    if work.starts_with('/') {
        if let Some(remainder) = strip_dir_prefix(&cleaned, &work) {
            let base = work.rsplit('/').find(|s| !s.is_empty());
            return match (base, remainder.is_empty()) {
                (Some(base), true) => base.to_string(),
                (Some(base), false) => format!("{base}/{remainder}"),
                (None, _) => remainder.to_string(),
            };
        }
    }

    cleaned.trim_start_matches('/').to_string()
}

/// 내용 목록을 1부터 번호 매긴 문서 목록으로 변환
pub fn build_documents(contents: &[FileContent], work_dir: &Path) -> Vec<Document> {
    contents
        .iter()
        .enumerate()
        .map(|(i, content)| Document {
            index: i + 1,
            source: normalize_source_path(&content.path, work_dir),
            document_content: String::from_utf8_lossy(&content.content).into_owned(),
        })
        .collect()
}

/// 문서 목록을 지정 형식으로 직렬화
pub fn write_documents<W: Write>(
    format: OutputFormat,
    documents: &[Document],
    writer: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Xml => write_xml(documents, writer),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &DocumentSet { documents })?;
            writeln!(writer)
        }
        OutputFormat::Yaml => serde_yaml::to_writer(writer, &DocumentSet { documents })
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
    }
}

fn write_xml<W: Write>(documents: &[Document], writer: &mut W) -> io::Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(writer, "<documents>")?;
    for document in documents {
        writeln!(writer, r#"  <document index="{}">"#, document.index)?;
        writeln!(writer, "    <source>{}</source>", escape_xml(&document.source))?;
        writeln!(
            writer,
            "    <document_content>{}</document_content>",
            escape_xml(&document.document_content)
        )?;
        writeln!(writer, "  </document>")?;
    }
    writeln!(writer, "</documents>")
}

/// 게시된 출력 정보
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedOutput {
    pub path: PathBuf,
    pub documents: usize,
    pub bytes: u64,
}

/// 2단계 커밋 출력 생성기
pub struct OutputGenerator {
    target: OutputTarget,
    max_output_size: u64,
    work_dir: Option<PathBuf>,
}

impl OutputGenerator {
    pub fn new(target: OutputTarget, max_output_size: u64) -> Self {
        Self {
            target,
            max_output_size,
            work_dir: None,
        }
    }

    /// 소스 경로 정규화 기준 디렉토리 (기본값: 현재 작업 디렉토리)
    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// 문서를 생성하여 대상 경로에 게시
    ///
    /// 같은 디렉토리의 임시 파일에 먼저 쓰고, 크기가 제한 이하일 때만
    /// 대상 경로로 이름을 바꿉니다. 제한을 넘으면 임시 파일을 지우고
    /// 대상 경로는 건드리지 않습니다. 이번 호출이 만든 상위 디렉토리도
    /// 실패 시 다시 지웁니다.
    pub fn generate(&self, contents: &[FileContent]) -> Result<GeneratedOutput> {
        let path = &self.target.path;
        let write_error = |e: io::Error| PackError::WriteError {
            path: path.clone(),
            reason: e.to_string(),
        };

        let work_dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(write_error)?,
        };
        let documents = build_documents(contents, &work_dir);

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let created = missing_ancestors(&dir);
        if let Err(e) = fs::create_dir_all(&dir) {
            remove_created_dirs(&created);
            return Err(write_error(e));
        }

        let result = self.publish(&dir, &documents).map_err(|error| match error {
            PackError::OutputTooLarge { path, size, limit, .. } => PackError::OutputTooLarge {
                path,
                size,
                limit,
                files: contents
                    .iter()
                    .map(|content| (PathBuf::from(&content.path), content.size))
                    .collect(),
            },
            other => other,
        });
        if result.is_err() {
            remove_created_dirs(&created);
        }
        result
    }

    /// 임시 파일에 쓰고 크기 확인 후 대상 경로로 교체
    fn publish(&self, dir: &Path, documents: &[Document]) -> Result<GeneratedOutput> {
        let path = &self.target.path;
        let write_error = |e: io::Error| PackError::WriteError {
            path: path.clone(),
            reason: e.to_string(),
        };

        let prefix = format!(
            ".{}.",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ctxpack".to_string())
        );
        let mut scratch = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(write_error)?;

        {
            let mut writer = BufWriter::new(scratch.as_file_mut());
            write_documents(self.target.format, documents, &mut writer).map_err(|e| {
                PackError::SerializeError {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            writer.flush().map_err(write_error)?;
        }
        scratch.as_file().sync_all().map_err(write_error)?;

        let size = scratch.as_file().metadata().map_err(write_error)?.len();
        if size > self.max_output_size {
            if let Err(e) = scratch.close() {
                warn!(path = %path.display(), error = %e, "임시 파일 삭제 실패");
            }
            return Err(PackError::OutputTooLarge {
                path: path.clone(),
                size,
                limit: self.max_output_size,
                files: Vec::new(),
            });
        }

        scratch.persist(path).map_err(|e| write_error(e.error))?;
        debug!(path = %path.display(), size, documents = documents.len(), "출력 게시 완료");

        Ok(GeneratedOutput {
            path: path.clone(),
            documents: documents.len(),
            bytes: size,
        })
    }
}

/// 아직 없는 상위 디렉토리들 (깊은 것부터)
fn missing_ancestors(dir: &Path) -> Vec<PathBuf> {
    dir.ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .map(Path::to_path_buf)
        .collect()
}

fn remove_created_dirs(created: &[PathBuf]) {
    for dir in created {
        if let Err(e) = fs::remove_dir(dir) {
            debug!(path = %dir.display(), error = %e, "생성한 디렉토리 정리 실패");
            break;
        }
    }
}
