//! page-translator 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use page_translator::core::{print_error_message, print_info_message, translate_document};
use page_translator::env::{self, EnvVar};
use page_translator::translation::config::{ConfigManager, OutputPlacement, TranslationConfig};

#[derive(Parser, Debug)]
#[command(name = "page-translator")]
#[command(version)]
#[command(about = "Translate the text of an HTML page and inject the result next to the original")]
struct Cli {
    /// HTML file to translate, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Write the translated document to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Input document charset (detected from <meta> when omitted)
    #[arg(short = 'E', long, value_name = "CHARSET")]
    encoding: Option<String>,

    /// Source language
    #[arg(short, long, value_name = "LANG")]
    source: Option<String>,

    /// Target language
    #[arg(short, long, value_name = "LANG")]
    target: Option<String>,

    /// Translation endpoint URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// CSS selector of elements to translate (repeatable)
    #[arg(long = "selector", value_name = "SELECTOR")]
    selectors: Vec<String>,

    /// CSS selector of regions to leave untouched (repeatable)
    #[arg(long = "exclude", value_name = "SELECTOR")]
    excludes: Vec<String>,

    /// Where to put the translation: wrap or sibling
    #[arg(long, value_name = "MODE")]
    placement: Option<OutputPlacement>,

    /// Maximum number of concurrent requests
    #[arg(short = 'j', long, value_name = "N")]
    max_concurrent: Option<usize>,

    /// Retries per segment after the first attempt
    #[arg(short = 'r', long, value_name = "N")]
    max_retries: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Delay between retries in milliseconds
    #[arg(long, value_name = "MS")]
    retry_delay: Option<u64>,

    /// Minimum milliseconds between the starts of two requests
    #[arg(long, value_name = "MS")]
    min_interval: Option<u64>,

    /// Maximum segment length in characters
    #[arg(long, value_name = "CHARS")]
    segment_length: Option<usize>,

    /// Load configuration from this file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,

    /// Print supported environment variables and exit
    #[arg(long)]
    env_docs: bool,

    /// Suppress the statistics summary
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置文件与环境变量
    fn apply_to(&self, config: &mut TranslationConfig) {
        if let Some(source) = &self.source {
            config.source_lang = source.clone();
        }
        if let Some(target) = &self.target {
            config.target_lang = target.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if !self.selectors.is_empty() {
            config.discovery.selectors = self.selectors.clone();
        }
        if !self.excludes.is_empty() {
            config.discovery.exclude_selectors = self.excludes.clone();
        }
        if let Some(placement) = self.placement {
            config.discovery.placement = placement;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.max_concurrent_requests = max_concurrent;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_ms = timeout.saturating_mul(1000);
        }
        if let Some(retry_delay) = self.retry_delay {
            config.retry_delay_ms = retry_delay;
        }
        if let Some(min_interval) = self.min_interval {
            config.min_request_interval_ms = min_interval;
        }
        if let Some(segment_length) = self.segment_length {
            config.max_segment_length = segment_length;
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        match env::core::LogLevel::get().as_deref() {
            Ok("trace") => Level::TRACE,
            Ok("debug") => Level::DEBUG,
            Ok("info") => Level::INFO,
            Ok("error") => Level::ERROR,
            _ => Level::WARN,
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_ansi(!env::core::NoColor::get_or_default(false))
        .init();
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
        Ok(data)
    } else {
        fs::read(input)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.env_docs {
        print!("{}", env::generate_env_docs());
        return Ok(());
    }

    if let Some(path) = &cli.generate_config {
        ConfigManager::generate_example_config(path)?;
        if !cli.quiet {
            print_info_message(&format!("示例配置已写入 {}", path.display()));
        }
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        print_error_message("缺少输入文件（使用 - 表示标准输入）");
        std::process::exit(2);
    };

    let loaded = match &cli.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new(),
    };
    let mut config = match loaded {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            print_error_message(&e.to_string());
            std::process::exit(1);
        }
    };
    // 先叠加命令行参数，再统一校验
    cli.apply_to(&mut config);
    if let Err(e) = config.validate() {
        print_error_message(&e.to_string());
        std::process::exit(1);
    }

    let data = match read_input(input) {
        Ok(data) => data,
        Err(e) => {
            print_error_message(&format!("无法读取 {}: {}", input, e));
            std::process::exit(1);
        }
    };

    let result = translate_document(&data, cli.encoding.as_deref(), config).await?;

    match &cli.output {
        Some(path) => fs::write(path, &result.html)?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&result.html)?;
            stdout.flush()?;
        }
    }

    if !cli.quiet {
        print_info_message(&result.stats.to_string());
    }

    Ok(())
}
