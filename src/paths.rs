//! 경로 유틸리티 모듈
//!
//! 파일 시스템에 접근하지 않는 순수 어휘(lexical) 경로 변환을 담당합니다.

use std::path::{Component, Path, PathBuf};

/// `.`을 제거하고 `a/..`를 접는 어휘적 경로 정리
///
/// 루트 위로 올라가는 `..`은 절대 경로에서는 버리고, 상대 경로에서는 유지합니다.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// 작업 디렉토리 기준 절대 경로로 변환 (심볼릭 링크는 따라가지 않음)
pub fn absolutize(path: &Path, work_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&work_dir.join(path))
    }
}

/// 호스트 구분자와 무관하게 `/`로 이어 붙인 상대 경로 문자열
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 경로의 마지막 이름 구성 요소
pub fn last_segment(path: &Path) -> Option<String> {
    path.components().rev().find_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    })
}
