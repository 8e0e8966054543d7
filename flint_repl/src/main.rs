mod host;

use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use flint::{Addr, Config, Dictionary, Error, Hooks, State};
use host::{Host, LineSource};
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Forth sources to run, in order, before the interactive session.
    files: Vec<PathBuf>,

    /// Start with nothing but the primitives.
    #[arg(long)]
    no_prelude: bool,

    /// Where `save` and `load` keep the dictionary image.
    #[arg(long, default_value = "flint.img")]
    image: PathBuf,

    /// A `tracing` filter such as `flint=debug`. `RUST_LOG` takes precedence.
    #[arg(long = "log", default_value = "warn")]
    log_filter: String,
}

/// Words backed by this host's `sys` selectors.
const HOST_WORDS: &str = ": save 3 sys ; : load 4 sys ; : words 5 sys ;";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let hooks = Hooks::default()
        .with_sys(host::sys)
        .with_input(host::refill);
    let host = Host::new(LineSource::Done, args.image);
    let mut state = State::from_config(Config::default(), host, hooks);

    if !args.no_prelude {
        flint::prelude::load(&mut state).context("prelude failed to load")?;
    }
    flint::parse(&mut state, HOST_WORDS)?;

    for path in &args.files {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        tracing::info!(path = %path.display(), "running file");
        state.host.lines = LineSource::Reader(Box::new(BufReader::new(file)));
        if session(&mut state, false) {
            return Ok(());
        }
    }

    state.host.lines = LineSource::Editor(DefaultEditor::new()?);
    session(&mut state, true);
    Ok(())
}

/// Interprets lines until the source runs out. Returns `true` on `bye`.
fn session(state: &mut State<Host>, interactive: bool) -> bool {
    while let Some(line) = state.host.next_line() {
        if line.trim().eq_ignore_ascii_case("bye") {
            return true;
        }

        match flint::parse(state, &line) {
            Ok(()) if interactive => {
                let status = if state.compiling() { "compiled" } else { "ok" };
                println!(" {}", status.green());
            }
            Ok(()) => {}
            Err(err) => {
                report(state, err);
                state.reset();
            }
        }
    }

    io::stdout().flush().ok();
    false
}

/// The line currently in the input buffer, if that is what was being read.
fn current_line(dict: &Dictionary) -> Option<String> {
    if dict.read(Dictionary::SOURCE) as Addr != Dictionary::INPUT_BUFFER {
        return None;
    }
    let len = dict.read(Dictionary::SOURCE_LEN) as Addr;
    let bytes = (0..len)
        .map(|i| dict.read_byte(Dictionary::INPUT_BUFFER + i))
        .collect();
    String::from_utf8(bytes).ok()
}

fn report(state: &State<Host>, err: Error) {
    println!();
    eprintln!("{}: {err}", "error".red().bold());

    let Error::WordNotFound(word) = err else {
        return;
    };
    let Some(line) = current_line(&state.dict) else {
        return;
    };
    let Some(start) = word.start().checked_sub(Dictionary::INPUT_BUFFER) else {
        return;
    };
    let span = start as usize..start as usize + word.len() as usize;
    if span.is_empty() || span.end > line.len() {
        return;
    }

    let idx = LineIndex::new(&line);
    let label = Label::new(span)
        .with_text("not found".red().to_string())
        .with_style(|s| s.red().to_string());
    let Some(block) = Block::new(&idx, [label]) else {
        return;
    };
    let block = block.map_code(|c| CodeWidth::new(c, c.len()));
    eprintln!("{}[input]", block.prologue());
    eprint!("{block}");
    eprintln!("{}", block.epilogue());
}
