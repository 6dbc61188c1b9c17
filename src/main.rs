use std::{
    io::{self, Write},
    path::PathBuf,
};

use clap::Parser;
use tagsoup::{io::read_source, Options, PushbackReader, Tokenizer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The document to tokenize
    location: PathBuf,

    /// Keep tag and attribute names as written
    #[arg(long)]
    case_sensitive: bool,

    /// Print the re-rendered markup instead of one token per line
    #[arg(long)]
    render: bool,

    /// Print error, recovery and warning counts when done
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let text = smol::block_on(read_source(&args.location))?;

    let reader = PushbackReader::with_name(text.chars(), args.location.display().to_string());
    let options = Options {
        case_sensitive: args.case_sensitive,
    };
    let mut tokenizer = Tokenizer::new(reader, options);

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for token in tokenizer.by_ref() {
        if args.render {
            write!(out, "{token}")?;
        } else {
            writeln!(out, "{}", token.describe())?;
        }
    }
    out.flush()?;

    if args.stats {
        let stats = tokenizer.diagnostics();
        eprintln!(
            "{} characters, {} errors, {} recoveries, {} warnings",
            tokenizer.char_count(),
            stats.errors,
            stats.recoveries,
            stats.warnings
        );
    }
    Ok(())
}
