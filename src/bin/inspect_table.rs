use anyhow::{Context, Result};
use fingate::{pipeline::process_document, Config, NormalizedTable};
use std::{env, fs, path::Path, process::exit};
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Expect exactly one CLI argument: path to an HTML file.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <HTML_FILE>", args[0]);
        exit(1);
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = inspect_table(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn inspect_table(path: &Path) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let html = String::from_utf8_lossy(&bytes);
    let config = Config::load(None)?;
    let table = process_document(&html, &config.pipeline)?;

    println!("=== Table: {} ===", path.display());
    println!("Columns: {}", table.columns().len());
    println!("Rows:    {}", table.rows().len());
    println!();
    print_table(&table);
    Ok(())
}

fn print_table(table: &NormalizedTable) {
    let rendered: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|r| r.cells().iter().map(|c| c.to_string()).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rendered
                .iter()
                .filter_map(|r| r.get(i))
                .map(|s| s.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(i, (h, w))| pad(h, *w, i == 0))
        .collect();
    println!("{}", header.join(" | "));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &rendered {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (c, w))| pad(c, *w, i == 0))
            .collect();
        println!("{}", line.join(" | "));
    }
}

/// Label column left-aligned, figures right-aligned.
fn pad(value: &str, width: usize, left: bool) -> String {
    if left {
        format!("{:<width$}", value, width = width)
    } else {
        format!("{:>width$}", value, width = width)
    }
}
