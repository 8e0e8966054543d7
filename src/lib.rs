pub mod config;
pub mod corewords;
pub mod dictionary;
mod num;
pub mod parser;
pub mod prelude;
pub mod state;
mod word;

pub use config::Config;
pub use corewords::{Primitive, Token};
pub use dictionary::{Dictionary, Entry, MemoryStorage, Storage};
pub use num::{
    compose, decompose, format_radix, parse_number, Addr, Cell, DoubleAddr, DoubleCell, CELL,
};
pub use parser::{parse, parse_source};
pub use state::{Context, Hooks, InputFunc, ParseFunc, State, SysFunc};
pub use word::Word;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("return stack overflow")]
    ReturnStackOverflow,
    #[error("return stack underflow")]
    ReturnStackUnderflow,
    #[error("word not found: {0}")]
    WordNotFound(Word),
    #[error("dictionary full: cannot allot {requested} bytes at {here:#06x}")]
    DictionaryFull { here: Addr, requested: Cell },
    #[error("cannot link entry {entry:#06x} after latest entry {latest:#06x}")]
    BadLink { entry: Addr, latest: Addr },
    #[error("name too long: {0} bytes")]
    NameTooLong(usize),
    #[error("input line too long: {0} bytes")]
    InputTooLong(usize),
    #[error("out of input")]
    InputExhausted,
    #[error("division by zero")]
    DivisionByZero,
    #[error("unhandled sys call: {0}")]
    UnhandledSys(Cell),
    /// Unwinds out of the outermost word. [`State::execute`] never returns it.
    #[error("exit")]
    Exit,
}
