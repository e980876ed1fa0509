//! kbinxml CLI - convert between kbin binary XML and XML text.
//!
//! Binary input is decoded to XML (or JSON); anything else is parsed as XML
//! text and encoded to kbin.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use rayon::prelude::*;
use walkdir::WalkDir;

use kbin::prelude::*;

/// kbinxml - kbin binary XML converter
#[derive(Parser)]
#[command(name = "kbinxml")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: ConvertArgs,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG also works
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert every file in a directory tree
    Batch {
        /// Input directory
        dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Filter pattern for relative paths (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        #[command(flatten)]
        codec: CodecArgs,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file, kbin or XML text
    input: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(Args, Clone)]
struct CodecArgs {
    /// Rename invalid node names and decode broken Shift-JIS as UTF-8
    #[arg(long, env = "KBIN_CONVERT_ILLEGAL")]
    convert_illegal: bool,

    /// Text encoding for encoded output
    #[arg(long, env = "KBIN_ENCODING", default_value = "shift_jis", value_parser = parse_encoding)]
    encoding: TextEncoding,

    /// Sixbit-pack node names in encoded output
    #[arg(long)]
    compressed: bool,

    /// Write decoded documents as JSON instead of XML
    #[arg(long)]
    json: bool,
}

impl CodecArgs {
    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::new()
            .encoding(self.encoding)
            .compressed(self.compressed)
    }

    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::new().convert_illegal(self.convert_illegal)
    }
}

fn parse_encoding(name: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_name(name).ok_or_else(|| {
        let known: Vec<_> = TextEncoding::ALL.iter().map(|e| e.name()).collect();
        format!("unknown encoding {:?}, expected one of {}", name, known.join(", "))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Some(Commands::Batch {
            dir,
            output,
            filter,
            codec,
        }) => {
            cmd_batch(&dir, &output, filter.as_deref(), &codec)?;
        }
        None => {
            let input = cli
                .convert
                .input
                .context("No input file given (see --help)")?;
            cmd_convert(&input, cli.convert.output.as_deref(), &cli.convert.codec)?;
        }
    }

    Ok(())
}

/// Result of converting one file.
struct Converted {
    bytes: Vec<u8>,
    extension: &'static str,
}

fn convert(data: &[u8], codec: &CodecArgs) -> Result<Converted> {
    if is_binary_xml(data) {
        let doc = from_binary(data, &codec.decode_options()).context("Failed to decode kbin")?;
        info!(
            "decoded kbin: encoding {}, compressed {}, {} data bytes, pool size {}",
            doc.encoding,
            doc.compressed,
            doc.data_size,
            kbin::xml::mem_size(&doc.root, doc.encoding, doc.compressed)
        );

        if codec.json {
            let json = serde_json::to_vec_pretty(&doc.root).context("Failed to write JSON")?;
            Ok(Converted {
                bytes: json,
                extension: "json",
            })
        } else {
            let xml = doc.root.to_xml_string().context("Failed to write XML")?;
            Ok(Converted {
                bytes: xml.into_bytes(),
                extension: "xml",
            })
        }
    } else {
        let root = Element::from_xml_bytes(data).context("Failed to parse XML")?;
        let bytes = to_binary(&root, &codec.encode_options()).context("Failed to encode kbin")?;
        info!(
            "encoded kbin: {} bytes, encoding {}, compressed {}",
            bytes.len(),
            codec.encoding,
            codec.compressed
        );
        Ok(Converted {
            bytes,
            extension: "bin",
        })
    }
}

fn cmd_convert(input: &Path, output: Option<&Path>, codec: &CodecArgs) -> Result<()> {
    let data = fs::read(input)
        .with_context(|| format!("Failed to read input file {}", input.display()))?;
    let converted = convert(&data, codec)?;

    match output {
        Some(path) => {
            fs::write(path, &converted.bytes).context("Failed to write output file")?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&converted.bytes)?;
            if converted.extension != "bin" {
                writeln!(stdout)?;
            }
        }
    }

    Ok(())
}

fn cmd_batch(dir: &Path, output: &Path, filter: Option<&str>, codec: &CodecArgs) -> Result<()> {
    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let relative = path.strip_prefix(dir).unwrap_or(path);
            pattern
                .as_ref()
                .map_or(true, |pattern| pattern.matches_path(relative))
        })
        .collect();

    println!("Converting {} files from {}...", files.len(), dir.display());
    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let errors = AtomicUsize::new(0);

    files.par_iter().for_each(|path| {
        if let Err(e) = convert_into(path, dir, output, codec) {
            pb.println(format!("Error converting {}: {:#}", path.display(), e));
            errors.fetch_add(1, Ordering::Relaxed);
        }
        pb.inc(1);
    });

    pb.finish_with_message("Done");
    let errors = errors.into_inner();
    println!(
        "Converted {} files in {:?} ({} errors)",
        files.len() - errors,
        start.elapsed(),
        errors
    );

    Ok(())
}

/// Convert one file of a batch, mirroring its relative path under `output`.
fn convert_into(path: &Path, dir: &Path, output: &Path, codec: &CodecArgs) -> Result<()> {
    let data = fs::read(path).context("Failed to read input file")?;
    let converted = convert(&data, codec)?;

    let relative = path.strip_prefix(dir).unwrap_or(path);
    let output_path = output.join(relative).with_extension(converted.extension);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&output_path, &converted.bytes).context("Failed to write output file")?;
    Ok(())
}
