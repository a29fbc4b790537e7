use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filesig_core::{
    ChannelReporter, FileScanner, FindingKind, JsonLinesReporter, OsFile, Reporter, RuleSource, ScanConfig,
    ScanStats, Scanner,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "filesig", version, about = "文件签名扫描器")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描目录并以 JSON Lines 输出上报记录
    Scan {
        /// 输入目录（或单个文件）
        #[arg(long)]
        input: PathBuf,

        /// 输出文件（每行一个 JSON 对象）
        #[arg(long, default_value = "./findings.jsonl")]
        output: PathBuf,

        /// 配置文件（TOML）；命令行参数覆盖其中的值
        #[arg(long)]
        config: Option<PathBuf>,

        /// 规则文件路径（TOML）
        #[arg(long)]
        rules: Option<PathBuf>,

        /// 线程数（"auto"=CPU 核心数）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 最大文件大小（字节）；超出只上报提示，<= 0 不限
        #[arg(long, allow_hyphen_values = true)]
        max_file_size: Option<i64>,
    },
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { input, output, config, rules, threads, max_file_size } => {
            info!(?input, ?output, "starting scan");

            let mut cfg = match &config {
                Some(path) => ScanConfig::load(path)?,
                None => ScanConfig::default(),
            };
            if let Some(rules) = rules { cfg.rules = RuleSource::Path(rules); }
            if let Some(max) = max_file_size { cfg.max_file_size = max; }
            if let Some(n) = parse_threads(&threads) { cfg.threads = Some(n); }

            let out = BufWriter::new(File::create(&output).context("create output file")?);
            let (stats, mut out) = run_scan(&input, &cfg, out)?;
            out.flush().context("flush output file")?;

            info!(
                files_scanned = stats.files_scanned,
                files_failed = stats.files_failed,
                matches = stats.matches,
                skipped_large = stats.skipped_large,
                "scan finished"
            );
        }
    }

    Ok(())
}

/// 并行扫描：
/// - Rayon 线程池大小与引擎实例数一致，每个 worker 使用自己的引擎
/// - 记录经通道送回当前线程，单线程写 JSON Lines
fn run_scan<W: Write + Send>(input: &Path, cfg: &ScanConfig, out: W) -> Result<(ScanStats, W)> {
    use rayon::prelude::*;

    let (reporter, rx) = ChannelReporter::bounded(256);
    let scanner = FileScanner::init(cfg, Arc::new(reporter)).context("initialize scanner")?;
    let threads = scanner.engines().len();
    info!(scanner = scanner.name(), threads, "rules compiled");

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => { warn!(error = %e, "walk error"); continue; }
        };
        if entry.file_type().is_file() { files.push(entry.into_path()); }
    }
    // 按路径排序，确保调度顺序稳定
    files.sort();

    let scanned = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().context("build rayon pool")?;

    // scanner（以及其中的通道发送端）随扫描线程结束而释放，接收端随之关闭
    let scan_thread = {
        let scanned = Arc::clone(&scanned);
        let failed = Arc::clone(&failed);
        std::thread::spawn(move || {
            pool.install(|| {
                files.par_iter().for_each(|path| {
                    let mut handle = match OsFile::open(path) {
                        Ok(h) => h,
                        Err(e) => {
                            warn!(file = %path.display(), error = %e, "open failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                    };
                    match scanner.scan_file(&mut handle) {
                        Ok(()) => { scanned.fetch_add(1, Ordering::Relaxed); }
                        Err(e) => {
                            warn!(file = %path.display(), error = %e, "scan failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            });
        })
    };

    let sink = JsonLinesReporter::new(out);
    let mut stats = ScanStats::default();
    for finding in rx.iter() {
        match finding.kind {
            FindingKind::RuleMatch => stats.matches += 1,
            FindingKind::LargeFileSkip => stats.skipped_large += 1,
            FindingKind::FileInfoError | FindingKind::FileReadError => {}
        }
        sink.record(finding);
    }

    if scan_thread.join().is_err() {
        anyhow::bail!("scan thread panicked");
    }
    stats.files_scanned = scanned.load(Ordering::Relaxed);
    stats.files_failed = failed.load(Ordering::Relaxed);
    Ok((stats, sink.into_inner()))
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
