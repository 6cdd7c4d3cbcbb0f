use std::path::PathBuf;
use std::process::ExitCode;

use ccx_deck::prelude::*;
use serde_json::json;

fn usage() -> ExitCode {
    eprintln!("usage: deck-check <file.inp> [--strict] [--normalize]");
    ExitCode::from(2)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ccx_deck=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut path: Option<PathBuf> = None;
    let mut strict = false;
    let mut normalize = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--strict" => strict = true,
            "--normalize" => normalize = true,
            flag if flag.starts_with("--") => return Ok(usage()),
            file => path = Some(PathBuf::from(file)),
        }
    }
    let Some(path) = path else {
        return Ok(usage());
    };

    let deck = match read_path(&path, &ReaderOptions { strict }) {
        Ok(deck) => deck,
        Err(err) => {
            eprintln!("{}", err);
            return Ok(ExitCode::FAILURE);
        }
    };
    let report = validate(&deck);

    if normalize {
        print!("{}", write_deck(&deck));
    } else {
        let summary = summarize(&deck);
        eprint!("{}", summary.format());
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "file": path,
                "summary": summary,
                "report": report,
            }))?
        );
    }

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
