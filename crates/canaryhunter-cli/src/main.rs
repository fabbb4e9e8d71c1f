use anyhow::{Context, Result};
use canaryhunter_core::{
    analyze_dir_and_write, format_canary, inspect, leak_canary, load_profile, BatchOptions, ByteOrder,
    FileLeakSource, HeuristicOptions, LeakError, LeakSource, WordClass, DEFAULT_WINDOW_BYTES,
};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

/// 退出码：与原始利用工具保持一致
const EXIT_ACQUISITION: u8 = 1;
const EXIT_NO_CANARY: u8 = 2;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "canaryhunter", version, about = "从泄露的栈数据中找出 __stack_chk_guard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 从单个转储中选出最可能的栈金丝雀
    Select {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        heuristics: HeuristicArgs,

        /// 无候选时重新获取并分析的总次数（泄露内容每次可能不同）
        #[arg(long, default_value_t = 1)]
        attempts: u32,

        /// 以 JSON 输出候选（值、打分、下标）
        #[arg(long)]
        json: bool,
    },
    /// 打印单个转储中每个字的分类
    Inspect {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        heuristics: HeuristicArgs,

        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 分析目录下的全部转储并生成 result.json
    Batch {
        /// 输入目录（每个文件一份转储）
        #[arg(long)]
        input: PathBuf,

        /// 输出文件（JSON 数组）
        #[arg(long, default_value = "./result.json")]
        output: PathBuf,

        /// 线程数（"auto"=CPU 核心数）
        #[arg(long, default_value = "auto")]
        threads: String,

        /// 最大文件大小（单位字节）；超过则跳过
        #[arg(long)]
        max_file_size: Option<u64>,

        /// 每个转储内的窗口起点（字节）
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// 窗口大小（字节）；0 表示读取起点之后的全部内容
        #[arg(long, default_value_t = DEFAULT_WINDOW_BYTES)]
        window: usize,

        #[command(flatten)]
        heuristics: HeuristicArgs,
    },
}

/// 单个转储的读取窗口
#[derive(Args, Debug)]
struct WindowArgs {
    /// 转储文件（原始泄露字节）
    #[arg(long)]
    input: PathBuf,

    /// 窗口起点（字节）
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// 窗口大小（字节）；0 表示读取起点之后的全部内容
    #[arg(long, default_value_t = DEFAULT_WINDOW_BYTES)]
    window: usize,
}

/// 启发式参数：先读配置文件，再由命令行覆盖
#[derive(Args, Debug)]
struct HeuristicArgs {
    /// 启发式配置文件（TOML）
    #[arg(long)]
    profile: Option<PathBuf>,

    /// 熵阈值（覆盖配置文件）
    #[arg(long)]
    threshold: Option<f32>,

    /// 字节序：native、little 或 big（覆盖配置文件）
    #[arg(long)]
    byte_order: Option<ByteOrder>,
}

fn main() -> ExitCode {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ACQUISITION)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Select { window, heuristics, attempts, json } => {
            let opts = resolve_heuristics(&heuristics)?;
            let mut source = file_source(&window, &opts);
            info!(source = %source.describe(), attempts, "selecting canary");

            let attempts = attempts.max(1);
            for attempt in 1..=attempts {
                match leak_canary(&mut source, &opts) {
                    Ok(c) => {
                        if json {
                            println!("{}", serde_json::to_string(&c)?);
                        } else {
                            println!("__stack_chk_guard: {}", format_canary(c.value));
                        }
                        info!(index = c.index, score = c.score, attempt, "canary selected");
                        return Ok(ExitCode::SUCCESS);
                    }
                    Err(LeakError::Selection(e)) => {
                        warn!(attempt, attempts, "{e}");
                    }
                    Err(e @ LeakError::Acquisition(_)) => {
                        eprintln!("error: {e}");
                        return Ok(ExitCode::from(EXIT_ACQUISITION));
                    }
                }
            }
            eprintln!("error: no stack canary found in leaked data");
            Ok(ExitCode::from(EXIT_NO_CANARY))
        }
        Commands::Inspect { window, heuristics, json } => {
            let opts = resolve_heuristics(&heuristics)?;
            let mut source = file_source(&window, &opts);
            let buffer = match source.acquire() {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("error: acquisition failed: {e}");
                    return Ok(ExitCode::from(EXIT_ACQUISITION));
                }
            };
            let reports = inspect(&buffer, &opts);

            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            if json {
                serde_json::to_writer(&mut out, &reports)?;
                writeln!(out)?;
            } else {
                for r in &reports {
                    let entropy = match r.class {
                        WordClass::LowEntropy(e) | WordClass::Candidate(e) => format!("{e:.3}"),
                        _ => "-".to_string(),
                    };
                    let mark = if r.selected { "  <= __stack_chk_guard" } else { "" };
                    writeln!(
                        out,
                        "{:>4}  +{:#06x}  {}  {:<14} {:>6}{}",
                        r.index,
                        window.offset as usize + r.index * 8,
                        format_canary(r.value),
                        r.class.label(),
                        entropy,
                        mark
                    )?;
                }
            }
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch { input, output, threads, max_file_size, offset, window, heuristics } => {
            info!(?input, ?output, "starting batch analysis");
            let opts = resolve_heuristics(&heuristics)?;

            // 以缓冲方式打开输出文件，按 JSON 数组流式写入
            let mut out = BufWriter::new(File::create(&output).context("create output file")?);
            let batch = BatchOptions {
                heuristics: opts,
                offset,
                window: (window > 0).then_some(window),
                max_file_size,
                threads: parse_threads(&threads),
            };
            let stats = analyze_dir_and_write(&input, &mut out, &batch).context("batch analysis failed")?;
            out.flush().context("flush output file")?;

            info!(
                files_analyzed = stats.files_analyzed,
                canaries_found = stats.canaries_found,
                no_candidate = stats.no_candidate,
                acquisition_failed = stats.acquisition_failed,
                files_skipped = stats.files_skipped,
                "batch finished"
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug
    // 日志写 stderr，stdout 只留给结果
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 合并配置文件与命令行覆盖项
fn resolve_heuristics(args: &HeuristicArgs) -> Result<HeuristicOptions> {
    let mut opts = match &args.profile {
        Some(path) => load_profile(path)?,
        None => HeuristicOptions::default(),
    };
    if let Some(t) = args.threshold {
        anyhow::ensure!((0.0..4.0).contains(&t), "threshold {t} must be within [0, 4)");
        opts.entropy_threshold = t;
    }
    if let Some(order) = args.byte_order {
        opts.byte_order = order;
    }
    Ok(opts)
}

fn file_source(args: &WindowArgs, opts: &HeuristicOptions) -> FileLeakSource {
    FileLeakSource::new(&args.input)
        .with_offset(args.offset)
        .with_window((args.window > 0).then_some(args.window))
        .with_byte_order(opts.byte_order)
}

/// 解析线程参数
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") {
        return None;
    }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}
