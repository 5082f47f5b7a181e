// パス: src/bin/algw_trace.rs
// 役割: ソースの型を推論して表示する CLI（イベントトレースの JSON 出力つき）
// 意図: ライブラリの pipeline をそのまま呼び、可視化器へ渡すトレースを手元で確認できるようにする
// 関連ファイル: src/pipeline.rs, src/events.rs, src/lexer.rs

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};

use algw::events::{render_stack_line, step_count, Event};
use algw::lexer::{LexConfig, JS};
use algw::pipeline::infer_source;

#[derive(Parser)]
#[command(
    name = "algw-trace",
    version,
    about = "Algorithm W type inference with an event trace"
)]
struct Cli {
    /// 入力ファイル（`-e` と排他）
    file: Option<PathBuf>,

    /// 式を直接与える
    #[arg(short = 'e', long = "expr", conflicts_with = "file")]
    expr: Option<String>,

    /// トレース全体を JSON で出力する
    #[arg(long)]
    events: bool,

    /// 説明スタックとステップ数を表示する
    #[arg(long)]
    steps: bool,

    /// 字句解析設定（JSON ファイル）
    #[arg(long)]
    lex_config: Option<PathBuf>,

    /// ログ出力（-v: debug, -vv: trace）
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 標準エラーへ 1 行ずつ書くだけのロガー。
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<LexConfig, String> {
    match path {
        None => Ok(JS.clone()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("{} を読めません: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("字句解析設定が不正です: {e}"))
        }
    }
}

fn read_source(cli: &Cli) -> Result<String, String> {
    match (&cli.expr, &cli.file) {
        (Some(expr), _) => Ok(expr.clone()),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| format!("{} を読めません: {e}", path.display())),
        (None, None) => Err("入力ファイルか -e で式を指定してください".to_string()),
    }
}

fn print_steps(events: &[Event]) {
    let mut depth = 0usize;
    for event in events {
        match event {
            Event::StackPush { value, .. } => {
                println!("{}{}", "  ".repeat(depth), render_stack_line(value));
                depth += 1;
            }
            Event::StackPop => depth = depth.saturating_sub(1),
            Event::StackBreak { title } => println!("{}-- {title}", "  ".repeat(depth)),
            Event::Unify {
                one, two, subst, ..
            } if !subst.is_empty() => {
                println!("{}unify {one} ~ {two}", "  ".repeat(depth));
            }
            _ => {}
        }
    }
    println!("steps: {}", step_count(events));
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli.lex_config.as_ref())?;
    let source = read_source(cli)?;
    match infer_source(&config, &source) {
        Ok(inference) => {
            if cli.steps {
                print_steps(&inference.trace.events);
            }
            if cli.events {
                let json = serde_json::to_string_pretty(&inference.trace)
                    .map_err(|e| e.to_string())?;
                println!("{json}");
            }
            println!("{}", inference.display);
            Ok(())
        }
        Err(err) => {
            if let Some(trace) = err.trace() {
                if cli.steps {
                    print_steps(&trace.events);
                }
                if cli.events {
                    let json = serde_json::to_string_pretty(trace).map_err(|e| e.to_string())?;
                    println!("{json}");
                }
            }
            Err(err.info(&source).to_string())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    if let Err(message) = run(&cli) {
        eprintln!("{message}");
        process::exit(1);
    }
}
