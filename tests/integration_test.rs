//! 통합 테스트 모듈
//!
//! ctxpack의 전체 기능을 테스트합니다.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 테스트용 파일 생성 헬퍼 (상위 디렉토리 포함)
fn create_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// 테스트용 소스 트리 생성
fn setup_source_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    create_file(temp_dir.path(), "src/main.go", "package main\n");
    create_file(temp_dir.path(), "src/main_test.go", "package main\n");
    create_file(temp_dir.path(), "src/util/strings.go", "package util\n");
    create_file(temp_dir.path(), "src/lib.rs", "pub fn f() {}\n");
    create_file(temp_dir.path(), "docs/README.md", "# readme\n");
    create_file(temp_dir.path(), ".git/config", "[core]\n");

    temp_dir
}

fn config_for(work_dir: &Path, argv: &[&str]) -> ctxpack::Config {
    use clap::Parser;

    let mut full = vec!["ctxpack"];
    full.extend_from_slice(argv);
    ctxpack::Config::from_args(&ctxpack::Args::parse_from(full))
        .unwrap()
        .with_work_dir(work_dir.to_path_buf())
}

mod pattern_tests {
    use ctxpack::pattern::{expand_braces, expand_pattern, split_patterns};
    use ctxpack::PatternMatcher;
    use std::collections::HashSet;

    #[test]
    fn test_brace_expansion_set() {
        let expanded: HashSet<String> = expand_braces("pre{,fix}*.txt").unwrap().into_iter().collect();
        let expected: HashSet<String> = ["pre*.txt", "prefix*.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_comma_split_respects_braces() {
        assert_eq!(
            split_patterns("*.{go,rs}, *.md"),
            vec!["*.{go,rs}".to_string(), "*.md".to_string()]
        );
        assert_eq!(
            expand_pattern("*.{go,rs},*.md").unwrap(),
            vec!["*.go", "*.rs", "*.md"]
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(expand_pattern("[").is_err());
        assert!(expand_pattern("{a,b").is_err());
        assert!(expand_pattern("../**").is_err());
        assert!(expand_pattern("").is_err());
        assert!(expand_pattern(&"a".repeat(1001)).is_err());
    }

    #[test]
    fn test_exclude_wins() {
        let matcher = PatternMatcher::parse("*.go", Some("*_test.go")).unwrap();
        assert!(matcher.should_include("src/main.go"));
        assert!(!matcher.should_include("src/main_test.go"));
        assert!(!matcher.should_include("src/lib.rs"));
    }

    #[test]
    fn test_path_scoped_pattern() {
        let matcher = PatternMatcher::parse("src/*.go", None).unwrap();
        assert!(matcher.should_include("src/main.go"));
        assert!(!matcher.should_include("src/util/strings.go"));
        assert!(!matcher.should_include("main.go"));
    }

    #[test]
    fn test_matching_is_repeatable() {
        let matcher = PatternMatcher::parse("*.{go,rs}", Some("vendor/*")).unwrap();
        for _ in 0..3 {
            assert!(matcher.should_include("a/b.rs"));
            assert!(!matcher.should_include("vendor/c.go"));
        }
    }
}

mod finder_tests {
    use super::*;
    use ctxpack::{FileFinder, PackError, PatternMatcher};

    #[test]
    fn test_find_with_exclude() {
        let temp_dir = setup_source_tree();
        let matcher = PatternMatcher::parse("*.go", Some("*_test.go")).unwrap();
        let finder = FileFinder::new(matcher).with_work_dir(temp_dir.path().to_path_buf());

        let discovery = finder.find_matching_files(&[PathBuf::from("src")]).unwrap();
        assert_eq!(
            discovery.files,
            vec![
                temp_dir.path().join("src/main.go"),
                temp_dir.path().join("src/util/strings.go"),
            ]
        );
        assert!(discovery.first_error.is_none());
    }

    #[test]
    fn test_git_directory_skipped() {
        let temp_dir = setup_source_tree();
        let finder = FileFinder::new(PatternMatcher::parse("*", None).unwrap())
            .with_work_dir(temp_dir.path().to_path_buf());

        let discovery = finder.find_matching_files(&[PathBuf::from(".")]).unwrap();
        assert_eq!(discovery.files.len(), 5);
        assert!(discovery
            .files
            .iter()
            .all(|f| !f.components().any(|c| c.as_os_str() == ".git")));
    }

    #[test]
    fn test_no_match_error_names_patterns() {
        let temp_dir = setup_source_tree();
        let finder = FileFinder::new(PatternMatcher::parse("*.java", None).unwrap())
            .with_work_dir(temp_dir.path().to_path_buf());

        match finder.find_matching_files(&[PathBuf::from("src")]) {
            Err(PackError::NoFilesMatched { patterns, .. }) => assert!(patterns.contains("*.java")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_does_not_block_others() {
        let temp_dir = setup_source_tree();
        let finder = FileFinder::new(PatternMatcher::parse("*.md", None).unwrap())
            .with_work_dir(temp_dir.path().to_path_buf());

        let discovery = finder
            .find_matching_files(&[PathBuf::from("missing"), PathBuf::from("docs")])
            .unwrap();
        assert_eq!(discovery.files, vec![temp_dir.path().join("docs/README.md")]);
        assert!(matches!(
            discovery.first_error,
            Some(PackError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_overlapping_roots_deduplicated() {
        let temp_dir = setup_source_tree();
        let finder = FileFinder::new(PatternMatcher::parse("*.rs", None).unwrap())
            .with_work_dir(temp_dir.path().to_path_buf());

        let discovery = finder
            .find_matching_files(&[PathBuf::from("src"), PathBuf::from("src")])
            .unwrap();
        assert_eq!(discovery.files, vec![temp_dir.path().join("src/lib.rs")]);
    }
}

mod manager_tests {
    use super::*;
    use ctxpack::manager::{parse_size, FileManager, SizeLimits};
    use ctxpack::{OutputFormat, OutputTarget};
    use proptest::prelude::*;

    const UNITS: [(&str, u64); 5] = [
        ("B", 1),
        ("KB", 1024),
        ("MB", 1024 * 1024),
        ("GB", 1024 * 1024 * 1024),
        ("TB", 1024 * 1024 * 1024 * 1024),
    ];

    proptest! {
        #[test]
        fn size_round_trip(n in 1u64..1_000_000, unit in 0usize..5, lower in any::<bool>()) {
            let (suffix, multiplier) = UNITS[unit];
            let suffix = if lower { suffix.to_lowercase() } else { suffix.to_string() };
            prop_assert_eq!(parse_size(&format!("{n}{suffix}")).unwrap(), n * multiplier);
        }

        #[test]
        fn unitless_numbers_rejected(n in 0u64..u64::MAX) {
            prop_assert!(parse_size(&n.to_string()).is_err());
        }
    }

    #[test]
    fn test_grouping_scenario() {
        let manager = FileManager::new(SizeLimits::new(1024, 1024).unwrap())
            .with_work_dir(PathBuf::from("/project"));
        let targets = vec![
            OutputTarget::new(PathBuf::from("dir1/out.xml"), None).unwrap(),
            OutputTarget::new(PathBuf::from("dir2/out.xml"), None).unwrap(),
        ];
        let files = vec![
            PathBuf::from("dir1/x.go"),
            PathBuf::from("dir2/y.go"),
            PathBuf::from("other/z.go"),
        ];

        let groups = manager.group_files_by_output(&files, &targets);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].target.path, PathBuf::from("dir1/out.xml"));
        assert_eq!(groups[0].files, vec![PathBuf::from("dir1/x.go")]);
        assert_eq!(groups[1].target.path, PathBuf::from("dir2/out.xml"));
        assert_eq!(groups[1].files, vec![PathBuf::from("dir2/y.go")]);
        assert_eq!(groups[2].target.path, PathBuf::from("dir1/out_unmatched.xml"));
        assert_eq!(groups[2].target.format, OutputFormat::Xml);
        assert_eq!(groups[2].files, vec![PathBuf::from("other/z.go")]);
    }

    #[test]
    fn test_validation_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let a = create_file(temp_dir.path(), "a.go", &"a".repeat(50));
        let b = create_file(temp_dir.path(), "b.go", &"b".repeat(2000));

        let manager = FileManager::new(SizeLimits::new(1000, 10_000).unwrap());
        let validated = manager.validate_files(vec![a.clone(), b]).unwrap();
        assert_eq!(validated.files, vec![a]);
        assert_eq!(validated.total_size, 50);
    }
}

mod output_tests {
    use super::*;
    use ctxpack::output::{normalize_source_path, OutputGenerator};
    use ctxpack::{FileContent, OutputTarget, PackError};

    fn content(path: &str, body: &str) -> FileContent {
        FileContent {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            content: body.as_bytes().to_vec(),
            extension: "go".to_string(),
            size: body.len() as u64,
        }
    }

    #[test]
    fn test_xml_escaping_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.xml");
        let generator = OutputGenerator::new(OutputTarget::new(out.clone(), None).unwrap(), 1 << 20)
            .with_work_dir(temp_dir.path().to_path_buf());

        generator
            .generate(&[content("t.go", r#"<tag>&"quote"</tag>"#)])
            .unwrap();

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains(
            "<document_content>&lt;tag&gt;&amp;&quot;quote&quot;&lt;/tag&gt;</document_content>"
        ));
    }

    #[test]
    fn test_oversize_keeps_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let out = create_file(temp_dir.path(), "out.yaml", "previous");
        let generator = OutputGenerator::new(OutputTarget::new(out.clone(), None).unwrap(), 16)
            .with_work_dir(temp_dir.path().to_path_buf());

        let result = generator.generate(&[content("a.go", &"x".repeat(100))]);
        assert!(matches!(result, Err(PackError::OutputTooLarge { .. })));
        assert_eq!(fs::read_to_string(&out).unwrap(), "previous");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_source_path_normalization() {
        let work = Path::new("/home/dev/proj");
        assert_eq!(normalize_source_path("/home/dev/proj/src/a.go", work), "proj/src/a.go");
        assert_eq!(normalize_source_path("/opt/lib/b.go", work), "opt/lib/b.go");
        assert_eq!(normalize_source_path("./src/../c.go", work), "c.go");
        assert_eq!(normalize_source_path("../up.go", work), "../up.go");
        assert_eq!(normalize_source_path(r"src\win\d.go", work), "src/win/d.go");
    }
}

mod pipeline_tests {
    use super::*;
    use ctxpack::{PackError, Pipeline};

    #[test]
    fn test_invalid_pattern_fails_before_walk() {
        use clap::Parser;

        let temp_dir = setup_source_tree();
        let args = ctxpack::Args::parse_from(["ctxpack", "-p", "[", "-o", "out.xml"]);

        assert!(matches!(
            ctxpack::Config::from_args(&args),
            Err(PackError::InvalidPattern { .. })
        ));
        assert!(!temp_dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_end_to_end_json() {
        let temp_dir = setup_source_tree();
        let config = config_for(
            temp_dir.path(),
            &["-i", "src", "-p", "*.go", "-e", "*_test.go", "-o", "ctx.json"],
        );

        let report = Pipeline::new(config).run().unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.inputs[0].file_count, 2);

        let written = fs::read_to_string(temp_dir.path().join("ctx.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        let documents = value["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["index"], 1);
        assert_eq!(documents[0]["source"], "main.go");
        assert_eq!(documents[1]["index"], 2);
        assert_eq!(documents[1]["source"], "util/strings.go");
        assert_eq!(documents[1]["document_content"], "package util\n");
    }

    #[test]
    fn test_multiple_outputs_with_unmatched() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "dir1/x.go", "x");
        create_file(temp_dir.path(), "dir2/y.go", "y");
        create_file(temp_dir.path(), "other/z.go", "z");

        let config = config_for(
            temp_dir.path(),
            &["-i", "dir1,dir2,other", "-p", "*.go", "-o", "dir1/out.xml,dir2/out.xml"],
        );
        let report = Pipeline::new(config).run().unwrap();

        assert_eq!(report.groups.len(), 3);
        let unmatched = temp_dir.path().join("dir1/out_unmatched.xml");
        assert!(fs::read_to_string(&unmatched)
            .unwrap()
            .contains("<source>z.go</source>"));
        assert!(fs::read_to_string(temp_dir.path().join("dir2/out.xml"))
            .unwrap()
            .contains("<source>y.go</source>"));
    }

    #[test]
    fn test_clean_strips_comments() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "pkg/main.go",
            "package main\n// note\nfunc main() {}\n",
        );

        let config = config_for(
            temp_dir.path(),
            &["-i", "pkg", "-o", "out.yaml", "--clean"],
        );
        Pipeline::new(config).run().unwrap();

        let written = fs::read_to_string(temp_dir.path().join("out.yaml")).unwrap();
        assert!(written.contains("func main()"));
        assert!(!written.contains("// note"));
    }
}
