use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use trix::index::BuilderOptions;
use trix::{output, utils, IndexBuilder, IndexFile, QueryFlags, SearchParams};

#[derive(Parser)]
#[command(name = "trix")]
#[command(about = "Trie-based full-text indexing and search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from files or directories
    Index {
        /// Files or directories to index
        paths: Vec<PathBuf>,

        /// Output index file
        #[arg(short, long, default_value = "trix.idx")]
        output: PathBuf,

        /// Retain full line texts so searches can quote matching lines
        #[arg(long)]
        quote_lines: bool,

        /// Drop per-line locations (smaller index, file counts only)
        #[arg(long)]
        no_lines: bool,
    },
    /// Search an index
    Search {
        /// Index file built with `trix index`
        index: PathBuf,

        /// Prefix to search for
        needle: String,

        /// Restrict file results to this path
        #[arg(long)]
        filepath: Option<String>,

        /// Suggestions only, no file results
        #[arg(short, long)]
        autocomplete: bool,

        /// Quote matching lines (requires an index built with --quote-lines)
        #[arg(short, long)]
        quote: bool,

        #[arg(long, default_value_t = 10)]
        max_autocomplete: usize,

        #[arg(long, default_value_t = 20)]
        max_files: usize,

        #[arg(long, default_value_t = 10)]
        max_lines: usize,

        /// Emit JSON instead of the terminal format
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics
    Stats {
        /// Index file
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Index {
            paths,
            output,
            quote_lines,
            no_lines,
        } => build_index(&paths, &output, quote_lines, no_lines),
        Commands::Search {
            index,
            needle,
            filepath,
            autocomplete,
            quote,
            max_autocomplete,
            max_files,
            max_lines,
            json,
        } => {
            let index = IndexFile::open(&index)
                .with_context(|| format!("failed to open index {}", index.display()))?;

            let mut flags = QueryFlags::AUTOCOMPLETE;
            if !autocomplete {
                flags |= QueryFlags::FILES | QueryFlags::FILE_LINES;
                if quote {
                    flags |= QueryFlags::QUOTE_LINE;
                }
            }

            let mut params = SearchParams::new(&needle);
            params.only_filepath = filepath.as_deref();
            params.flags = QueryFlags::new(flags);
            params.max_autocomplete = max_autocomplete;
            params.max_files = max_files;
            params.max_lines = max_lines;

            let result = index.search(&params)?;
            if json {
                output::print_results_json(&result)?;
            } else {
                output::print_results(&result, true)?;
            }
            Ok(())
        }
        Commands::Stats { index } => {
            let opened = IndexFile::open(&index)
                .with_context(|| format!("failed to open index {}", index.display()))?;
            println!("index:  {}", index.display());
            println!("size:   {} bytes", opened.size_bytes());
            println!("nodes:  {}", opened.node_count());
            println!("files:  {}", opened.files().len());
            println!(
                "caps:   line numbers: {}, line quotes: {}",
                opened.caps().has_line_numbers(),
                opened.caps().has_line_quotes()
            );
            Ok(())
        }
    }
}

fn build_index(paths: &[PathBuf], output: &Path, quote_lines: bool, no_lines: bool) -> Result<()> {
    if paths.is_empty() {
        anyhow::bail!("nothing to index: pass at least one file or directory");
    }

    let sink = BufWriter::new(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    let options = BuilderOptions {
        retain_line_numbers: !no_lines,
        retain_line_text: quote_lines,
    };
    let mut builder = IndexBuilder::with_options(sink, options);

    let mut indexed = 0usize;
    let mut skipped = 0usize;
    for path in paths {
        if path.is_file() {
            match add_file(&mut builder, path, path) {
                Ok(true) => indexed += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    eprintln!("skipping {}: {e:#}", path.display());
                    skipped += 1;
                }
            }
            continue;
        }

        let walker = WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.path().is_file() {
                continue;
            }
            match add_file(&mut builder, entry.path(), path) {
                Ok(true) => indexed += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    eprintln!("skipping {}: {e:#}", entry.path().display());
                    skipped += 1;
                }
            }
        }
    }

    println!("indexed {indexed} files ({skipped} skipped), {} trie nodes", builder.node_count());
    builder.serialize().context("failed to serialize index")?;
    println!("index written to {}", output.display());
    Ok(())
}

/// Register and stream one file into the builder. Returns false for files
/// skipped as binary.
fn add_file<W: std::io::Write>(
    builder: &mut IndexBuilder<W>,
    path: &Path,
    root: &Path,
) -> Result<bool> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let name = rel.to_string_lossy();

    let mut file = File::open(path)?;
    let mut buf = [0u8; 64 * 1024];

    // Sniff the first chunk before registering the file
    let first = file.read(&mut buf)?;
    if utils::is_binary(&buf[..first]) {
        return Ok(false);
    }

    let file_index = builder.index_file(&name, 0)?;
    builder.fill(file_index, &buf[..first])?;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        builder.fill(file_index, &buf[..n])?;
    }
    Ok(true)
}
