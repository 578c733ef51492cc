//! ctxpack - CONTEXT PACKER
//!
//! 메인 엔트리포인트

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ctxpack::{
    cli::Args,
    config::Config,
    error::PackError,
    pipeline::{Pipeline, RunReport},
    stats::{format_bytes, format_duration},
};

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    // 스레드 풀 설정
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("스레드 풀 초기화 실패")?;
    }

    // 설정 검증 (파일 시스템 접근 전)
    let config = Config::from_args(&args).context("설정 오류")?;

    print_header(&config);

    let pipeline = Pipeline::new(config).with_progress(create_progress_bar());
    let report = match pipeline.run() {
        Ok(report) => report,
        Err(PackError::TotalSizeExceeded { total, limit, files }) => {
            print_size_exceeded(total, limit, &files);
            anyhow::bail!(
                "입력 파일 총 크기 {}가 출력 크기 제한 {}를 초과합니다",
                format_bytes(total),
                format_bytes(limit)
            );
        }
        Err(PackError::OutputTooLarge { path, size, limit, files }) => {
            print_size_exceeded(size, limit, &files);
            anyhow::bail!(
                "출력 크기 {}가 제한 {}를 초과하여 {}에 쓰지 않았습니다",
                format_bytes(size),
                format_bytes(limit),
                path.display()
            );
        }
        Err(e) => return Err(e.into()),
    };

    if report.dry_run {
        print_dry_run(&report);
        return Ok(());
    }

    print_errors(&report, pipeline.config().verbose);
    print_summary(&report);

    if let Some(error) = report.first_error() {
        anyhow::bail!("일부 파일 처리 실패: {}", error);
    }

    Ok(())
}

/// 로그 초기화 (RUST_LOG 우선, 없으면 --verbose에 따라 debug/warn)
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,ctxpack=debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 헤더 출력
fn print_header(config: &Config) {
    println!("\n{}", "═".repeat(50).bright_blue());
    println!("{}", " 📦 CONTEXT PACKER".bright_white().bold());
    println!("{}", "═".repeat(50).bright_blue());

    for input in &config.inputs {
        println!("  {} 입력 경로: {}", "📂".bright_cyan(), input.display());
    }
    for output in &config.outputs {
        println!(
            "  {} 출력 파일: {} ({})",
            "📄".bright_green(),
            output.path.display(),
            output.format
        );
    }

    println!("  {} 패턴: {}", "🔍".bright_magenta(), config.pattern);
    if let Some(ref exclude) = config.exclude {
        println!("  {} 제외: {}", "🚫".bright_red(), exclude);
    }
    println!(
        "  {} 크기 제한: 파일당 {} / 출력 {}",
        "📏".bright_white(),
        format_bytes(config.limits.max_file_size),
        format_bytes(config.limits.max_output_size)
    );

    if config.follow_symlinks {
        println!("  {} {}", "🔗".bright_cyan(), "심볼릭 링크 추적".cyan());
    }
    if config.clean.is_enabled() {
        println!("  {} {}", "🧹".bright_yellow(), "소스 정리 사용".yellow());
    }
    if config.dry_run {
        println!(
            "  {} {}",
            "⚠️".bright_yellow(),
            "드라이런 모드 (실제 출력 없음)".yellow()
        );
    }

    println!("{}", "═".repeat(50).bright_blue());
    println!("\n{}", "📁 파일 검색 중...".bright_cyan());
}

/// 진행률 바 생성
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░"),
    );
    pb
}

/// 출력 크기 초과 시 파일별 크기 출력
fn print_size_exceeded(total: u64, limit: u64, files: &[(std::path::PathBuf, u64)]) {
    println!(
        "\n{} 총 크기 {} > 제한 {}",
        "❌".bright_red(),
        format_bytes(total).red(),
        format_bytes(limit)
    );
    println!("{}", "📋 일치한 파일 목록:".bright_cyan());
    for (path, size) in files {
        println!("  {} {} ({})", "•".red(), path.display(), format_bytes(*size));
    }
}

/// 드라이런 출력
fn print_dry_run(report: &RunReport) {
    println!("\n{}", "📋 처리 예정 파일 목록:".bright_cyan());
    for group in &report.groups {
        println!(
            "\n  {} {} ({})",
            "📄".bright_green(),
            group.target.path.display(),
            group.target.format
        );
        for (i, path) in group.files.iter().enumerate() {
            println!("    {}. {}", i + 1, path.display());
        }
    }
    print_dropped(report);
    println!(
        "\n{} 총 {} 개의 파일이 처리될 예정입니다.",
        "ℹ️".bright_blue(),
        report.total_files().to_string().bright_green()
    );
}

/// 크기 제한으로 제외된 파일 출력
fn print_dropped(report: &RunReport) {
    let dropped = report.dropped.iter().chain(report.skipped.iter());
    let mut printed = false;
    for (path, size) in dropped {
        if !printed {
            println!("\n{}", "⚠️ 크기 제한으로 제외된 파일:".yellow());
            printed = true;
        }
        println!("  {} {} ({})", "•".yellow(), path.display(), format_bytes(*size));
    }
}

/// 에러 목록 출력
fn print_errors(report: &RunReport, verbose: bool) {
    print_dropped(report);

    if report.errors.is_empty() {
        return;
    }

    println!("\n{}", "❌ 오류 발생:".bright_red());
    for error in &report.errors {
        if verbose {
            println!("  {} {:?}", "•".red(), error);
        } else {
            println!("  {} {}", "•".red(), error);
        }
    }
}

/// 통계 출력
fn print_summary(report: &RunReport) {
    let stats = &report.stats;

    println!("\n{}", "═".repeat(50).bright_blue());
    println!("{}", " 📊 처리 통계".bright_white().bold());
    println!("{}", "═".repeat(50).bright_blue());

    for summary in &report.inputs {
        println!(
            "  {} {}: {} 개 파일, {}",
            "📂".bright_cyan(),
            summary.input.display(),
            summary.file_count.to_string().bright_green(),
            format_bytes(summary.total_size)
        );
    }

    println!(
        "  {} 발견/처리:    {} / {}",
        "📁".bright_cyan(),
        stats.files_found,
        stats.files_processed.to_string().green()
    );

    if stats.files_failed > 0 {
        println!(
            "  {} 실패:         {}",
            "❌".bright_red(),
            stats.files_failed.to_string().red()
        );
    } else {
        println!("  {} 실패:         {}", "✅".bright_green(), "0".green());
    }

    if stats.cleaner_fallbacks > 0 {
        println!(
            "  {} 정리 실패:    {} (원본 사용)",
            "🧹".bright_yellow(),
            stats.cleaner_fallbacks.to_string().yellow()
        );
    }

    println!(
        "  {} 입력 용량:    {}",
        "📥".bright_yellow(),
        format_bytes(stats.bytes_read)
    );
    println!(
        "  {} 출력 용량:    {}",
        "📤".bright_magenta(),
        format_bytes(stats.bytes_written)
    );
    println!(
        "  {} 처리 시간:    {}",
        "⏱️".bright_cyan(),
        format_duration(stats.elapsed)
    );
    println!("{}", "═".repeat(50).bright_blue());

    for group in &report.groups {
        if let Some(output) = &group.output {
            println!(
                "\n{} 저장 완료: {} ({} 문서, {})",
                "✅".bright_green(),
                output.path.display(),
                output.documents,
                format_bytes(output.bytes)
            );
        }
    }
    println!();
}
