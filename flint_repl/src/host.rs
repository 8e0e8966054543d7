use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use flint::{
    format_radix, Addr, Cell, Dictionary, DoubleCell, Entry, Error, Primitive, State, Token, CELL,
};
use rustyline::{error::ReadlineError, DefaultEditor};
use yansi::Paint;

pub enum LineSource {
    Editor(DefaultEditor),
    Reader(Box<dyn BufRead>),
    Done,
}

pub struct Host {
    pub lines: LineSource,
    pub image: PathBuf,
}

impl Host {
    pub fn new(lines: LineSource, image: PathBuf) -> Self {
        Self { lines, image }
    }

    /// The next line of the current source without its line ending, or
    /// `None` once the source runs dry.
    pub fn next_line(&mut self) -> Option<String> {
        match &mut self.lines {
            LineSource::Editor(editor) => match editor.readline("") {
                Ok(line) => {
                    editor.add_history_entry(line.as_str()).ok();
                    Some(line)
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
                Err(err) => {
                    tracing::warn!(%err, "cannot read from terminal");
                    None
                }
            },
            LineSource::Reader(reader) => {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => None,
                    Ok(_) => {
                        let len = line.trim_end_matches(&['\r', '\n'][..]).len();
                        line.truncate(len);
                        Some(line)
                    }
                    Err(err) => {
                        tracing::warn!(%err, "cannot read source");
                        None
                    }
                }
            }
            LineSource::Done => None,
        }
    }
}

/// Input hook: refills the input buffer from the current line source.
pub fn refill(state: &mut State<Host>) -> Result<(), Error> {
    let line = state.host.next_line().ok_or(Error::InputExhausted)?;
    state.dict.load_input(line.as_bytes())
}

pub fn sys(state: &mut State<Host>, selector: Cell) -> Result<(), Error> {
    let base = state.dict.base();
    match selector {
        0 => {
            let value = state.pop()?;
            print!("{} ", format_radix(value as DoubleCell, base));
        }
        1 => {
            let value = state.pop()?;
            print!("{} ", format_radix(value as Addr as DoubleCell, base));
        }
        2 => {
            let ch = state.pop()?;
            print!("{}", ch as u8 as char);
        }
        3 => save_image(state),
        4 => load_image(state),
        5 => list_words(&state.dict),
        _ => return Err(Error::UnhandledSys(selector)),
    }
    io::stdout().flush().ok();
    Ok(())
}

/// Writes the used part of the dictionary, `0..here`, to the image file.
fn save_image(state: &State<Host>) {
    let dict = &state.dict;
    let path = &state.host.image;
    let bytes = (0..dict.here())
        .map(|addr| dict.read_byte(addr))
        .collect::<Vec<_>>();

    match fs::write(path, &bytes) {
        Ok(()) => tracing::info!(path = %path.display(), len = bytes.len(), "saved image"),
        Err(err) => eprintln!("{} {}: {err}", "cannot save".red(), path.display()),
    }
}

/// Restores a saved image. The cells describing the line being interpreted
/// are kept so the rest of the current line still runs.
fn load_image(state: &mut State<Host>) {
    let path = &state.host.image;
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("{} {}: {err}", "cannot load".red(), path.display());
            return;
        }
    };
    tracing::info!(path = %path.display(), len = bytes.len(), "loading image");

    let session = Dictionary::COMPILING..Dictionary::BEGIN;
    for (addr, byte) in (0..=Addr::MAX).zip(bytes) {
        if !session.contains(&addr) {
            state.dict.write_byte(addr, byte);
        }
    }
}

fn entry_name(dict: &Dictionary, entry: &Entry) -> String {
    dict.word_bytes(entry.name).map(char::from).collect()
}

/// Prints every linked word, newest first, with its decoded body.
fn list_words(dict: &Dictionary) {
    let entries = dict.entries().collect::<Vec<_>>();
    let name_of = |body: Addr| {
        entries
            .iter()
            .find(|entry| entry.body == body)
            .map(|entry| entry_name(dict, entry))
    };

    let mut end = dict.here();
    for entry in &entries {
        let name = entry_name(dict, entry);
        if entry.immediate {
            print!("{}", name.yellow());
        } else {
            print!("{}", name.bold());
        }
        print!(" @ {:#06x}:", entry.body);

        let mut addr = entry.body;
        while addr < end {
            let token = Token::decode(dict.read(addr) as Addr);
            addr = addr.wrapping_add(CELL);
            match token {
                Token::Primitive(p @ (Primitive::Lit | Primitive::Jump | Primitive::Jump0)) => {
                    print!(" {} {}", p.name().cyan(), dict.read(addr));
                    addr = addr.wrapping_add(CELL);
                }
                Token::Primitive(p) => print!(" {}", p.name().cyan()),
                Token::Literal(value) => print!(" {value}"),
                Token::Call(body) => match name_of(body) {
                    Some(name) => print!(" {name}"),
                    None => print!(" {body:#06x}"),
                },
            }
        }
        println!();
        end = entry.addr;
    }
}
