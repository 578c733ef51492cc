//! 패턴 매칭 모듈
//!
//! glob 패턴의 검증, 쉼표 분리, 중괄호 확장과
//! 포함/제외 패턴을 이용한 파일 필터링을 담당합니다.

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;

use crate::error::{PackError, Result};

/// 패턴 문자열 최대 길이 (문자 수)
pub const MAX_PATTERN_LENGTH: usize = 1000;

/// 패턴 하나가 만들 수 있는 중괄호 확장 결과 최대 개수
pub const MAX_EXPANSIONS: usize = 1000;

/// 탐색 범위를 벗어나거나 숨김 파일 전체를 훑는 조합
const BANNED_SUBSTRINGS: &[&str] = &["../**", "**/..", "**/.*", ".*/**"];

/// 경로 전체와 비교할 때의 매칭 옵션 (`*`는 `/`를 넘지 않음)
const PATH_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn invalid(pattern: &str, reason: impl Into<String>) -> PackError {
    PackError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// 패턴 유효성 검사
///
/// 다음 순서로 검사하며 첫 번째 실패를 반환합니다.
/// NUL 문자, 길이, 금지된 조합, 중괄호 균형, 대괄호 균형, glob 문법.
///
/// # Examples
/// ```
/// use ctxpack::pattern::validate_pattern;
///
/// assert!(validate_pattern("src/**/*.{rs,toml}").is_ok());
/// assert!(validate_pattern("[").is_err());
/// ```
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.contains('\0') {
        return Err(invalid(pattern, "NUL 문자가 포함되어 있습니다"));
    }

    let length = pattern.chars().count();
    if length > MAX_PATTERN_LENGTH {
        return Err(invalid(
            pattern,
            format!("패턴 길이 {length}자가 최대 {MAX_PATTERN_LENGTH}자를 초과합니다"),
        ));
    }

    if let Some(banned) = BANNED_SUBSTRINGS.iter().find(|b| pattern.contains(*b)) {
        return Err(invalid(
            pattern,
            format!("허용되지 않는 조합 '{banned}'이(가) 포함되어 있습니다"),
        ));
    }

    check_balanced(pattern, '{', '}')?;
    check_balanced(pattern, '[', ']')?;

    Pattern::new(&to_glob_syntax(pattern)).map_err(|e| invalid(pattern, e.to_string()))?;

    Ok(())
}

/// 이스케이프되지 않은 여닫는 문자의 균형 검사
fn check_balanced(pattern: &str, open: char, close: char) -> Result<()> {
    let mut open_positions: Vec<usize> = Vec::new();
    let mut escaped = false;

    for (position, c) in pattern.chars().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == open {
            open_positions.push(position);
        } else if c == close && open_positions.pop().is_none() {
            return Err(invalid(
                pattern,
                format!("위치 {position}의 '{close}'에 대응하는 '{open}'가 없습니다"),
            ));
        }
    }

    match open_positions.pop() {
        Some(position) => Err(invalid(
            pattern,
            format!("위치 {position}의 '{open}'가 닫히지 않았습니다"),
        )),
        None => Ok(()),
    }
}

/// 중괄호와 대괄호 밖의 이스케이프되지 않은 쉼표로 분리 (빈 조각 유지, 이스케이프 유지)
fn split_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                current.push(c);
            }
            ']' if in_class => {
                in_class = false;
                current.push(c);
            }
            '{' if !in_class => {
                depth += 1;
                current.push(c);
            }
            '}' if !in_class => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 && !in_class => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
}

/// 쉼표로 구분된 여러 패턴을 개별 패턴으로 분리
///
/// 중괄호나 대괄호 안의 쉼표와 `\,`는 분리하지 않습니다.
pub fn split_patterns(pattern: &str) -> Vec<String> {
    split_top_level(pattern)
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// 첫 번째 이스케이프되지 않은 `{`와 대응하는 `}`의 바이트 위치
fn find_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut open = None;
    let mut depth = 0usize;
    let mut escaped = false;

    for (index, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => {
                if open.is_none() {
                    open = Some(index);
                }
                depth += 1;
            }
            '}' if open.is_some() => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|o| (o, index));
                }
            }
            _ => {}
        }
    }

    None
}

/// 중괄호 확장
///
/// `pre{a,b}post`는 `preapost`, `prebpost`가 되며 중첩 중괄호는 재귀적으로 확장됩니다.
/// 빈 대안(`pre{,fix}`)은 빈 문자열로 치환되고 `\{...\}`는 그대로 유지됩니다.
/// 결과 순서는 대안의 왼쪽에서 오른쪽 순서이며 중복은 제거됩니다.
/// 결과가 [`MAX_EXPANSIONS`]개를 넘으면 에러입니다.
///
/// # Examples
/// ```
/// use ctxpack::pattern::expand_braces;
///
/// assert_eq!(expand_braces("pre{,fix}*.txt").unwrap(), vec!["pre*.txt", "prefix*.txt"]);
/// ```
pub fn expand_braces(pattern: &str) -> Result<Vec<String>> {
    let too_many = || invalid(pattern, format!("확장 결과가 너무 많습니다 (최대 {MAX_EXPANSIONS}개)"));

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    // 깊이 우선, 왼쪽 대안부터 꺼내도록 역순으로 쌓음
    let mut stack = vec![pattern.to_string()];
    let mut steps = 0usize;

    while let Some(current) = stack.pop() {
        steps += 1;
        if steps > MAX_EXPANSIONS * 8 {
            return Err(too_many());
        }

        let Some((open, close)) = find_brace_group(&current) else {
            if seen.insert(current.clone()) {
                if out.len() == MAX_EXPANSIONS {
                    return Err(too_many());
                }
                out.push(current);
            }
            continue;
        };

        let prefix = &current[..open];
        let suffix = &current[close + 1..];
        let alternatives = split_top_level(&current[open + 1..close]);
        stack.extend(
            alternatives
                .iter()
                .rev()
                .map(|alternative| format!("{prefix}{alternative}{suffix}")),
        );
    }

    Ok(out)
}

/// 패턴 검증 후 쉼표 분리와 중괄호 확장을 적용한 구체 패턴 목록
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>> {
    if pattern.trim().is_empty() {
        return Err(PackError::EmptyPattern);
    }

    validate_pattern(pattern)?;

    let mut out: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for part in split_patterns(pattern) {
        for expanded in expand_braces(&part)? {
            if !seen.insert(expanded.clone()) {
                continue;
            }
            if out.len() == MAX_EXPANSIONS {
                return Err(invalid(
                    pattern,
                    format!("확장 결과가 너무 많습니다 (최대 {MAX_EXPANSIONS}개)"),
                ));
            }
            Pattern::new(&to_glob_syntax(&expanded))
                .map_err(|e| invalid(&expanded, e.to_string()))?;
            out.push(expanded);
        }
    }

    if out.is_empty() {
        return Err(PackError::EmptyPattern);
    }

    Ok(out)
}

/// 백슬래시 이스케이프를 glob 크레이트의 리터럴 문법으로 변환
fn to_glob_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(meta @ ('*' | '?' | '[' | ']')) => {
                out.push('[');
                out.push(meta);
                out.push(']');
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// 컴파일된 단일 패턴
#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    pattern: Pattern,
    /// `/`를 포함하면 경로 전체, 아니면 파일 이름과 비교
    path_scoped: bool,
}

impl CompiledPattern {
    fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_prefix("./").unwrap_or(raw);
        let pattern =
            Pattern::new(&to_glob_syntax(trimmed)).map_err(|e| invalid(raw, e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            pattern,
            path_scoped: trimmed.contains('/'),
        })
    }

    fn matches(&self, relative_path: &str, file_name: &str) -> bool {
        if self.path_scoped {
            self.pattern.matches_with(relative_path, PATH_MATCH_OPTIONS)
        } else {
            self.pattern.matches(file_name)
        }
    }
}

/// 포함/제외 패턴 매처
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    include: Vec<CompiledPattern>,
    exclude: Vec<CompiledPattern>,
}

impl PatternMatcher {
    /// 이미 확장된 구체 패턴들로 매처 생성
    ///
    /// # Arguments
    /// * `include` - 포함 패턴 (비어 있으면 제외되지 않은 모든 파일 포함)
    /// * `exclude` - 제외 패턴
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// 쉼표로 구분된 사용자 패턴 문자열을 검증/확장하여 매처 생성
    ///
    /// # Examples
    /// ```
    /// use ctxpack::pattern::PatternMatcher;
    ///
    /// let matcher = PatternMatcher::parse("*.{go,rs}", Some("*_test.go")).unwrap();
    /// assert!(matcher.should_include("src/main.go"));
    /// assert!(!matcher.should_include("src/main_test.go"));
    /// ```
    pub fn parse(include: &str, exclude: Option<&str>) -> Result<Self> {
        let include = expand_pattern(include)?;
        let exclude = match exclude {
            Some(e) if !e.trim().is_empty() => expand_pattern(e)?,
            _ => Vec::new(),
        };
        Self::new(&include, &exclude)
    }

    /// 루트 기준 `/` 구분 상대 경로가 포함 대상인지 판정
    ///
    /// 제외 패턴이 먼저 평가되어 하나라도 일치하면 즉시 제외됩니다.
    pub fn should_include(&self, relative_path: &str) -> bool {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);

        if self
            .exclude
            .iter()
            .any(|p| p.matches(relative_path, file_name))
        {
            return false;
        }

        if self.include.is_empty() {
            return true;
        }

        self.include
            .iter()
            .any(|p| p.matches(relative_path, file_name))
    }

    /// 포함 패턴 원문 목록
    pub fn include_patterns(&self) -> Vec<&str> {
        self.include.iter().map(|p| p.raw.as_str()).collect()
    }

    /// 제외 패턴 원문 목록
    pub fn exclude_patterns(&self) -> Vec<&str> {
        self.exclude.iter().map(|p| p.raw.as_str()).collect()
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<CompiledPattern>> {
    patterns.iter().map(|p| CompiledPattern::new(p)).collect()
}
