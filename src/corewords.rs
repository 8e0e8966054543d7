//! The primitive word set and the execution token encoding.
//!
//! Execution tokens split into three bands:
//!
//! ```text
//! 0 .. WORD_COUNT       primitive opcode
//! WORD_COUNT .. BEGIN   small literal, value = xt - WORD_COUNT
//! BEGIN ..              body address of a defined word
//! ```

use arbitrary::Arbitrary;

use crate::{
    dictionary::Dictionary,
    num::{compose, decompose, Addr, Cell, DoubleAddr, DoubleCell, CELL},
    parser,
    state::State,
    word::Word,
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
#[repr(u16)]
pub enum Primitive {
    Lit,
    Drop,
    Dup,
    Swap,
    Pick,
    Sys,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Peek,
    Poke,
    ToR,
    FromR,
    Equal,
    Less,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Colon,
    Tick,
    Execute,
    Exit,
    Semicolon,
    Jump0,
    Jump,
    Depth,
    RDepth,
    In,
    Evaluate,
    Find,
    Uma,
    ULess,
    UmMod,
}

/// Number of primitives, and the first token of the literal band.
pub const WORD_COUNT: Addr = Primitive::ALL.len() as Addr;

impl Primitive {
    /// Every primitive, indexed by its token.
    pub const ALL: [Primitive; 37] = {
        use Primitive::*;
        [
            Lit, Drop, Dup, Swap, Pick, Sys, Add, Sub, Mul, Div, Mod, Peek, Poke, ToR, FromR,
            Equal, Less, And, Or, Xor, Shl, Shr, Colon, Tick, Execute, Exit, Semicolon, Jump0,
            Jump, Depth, RDepth, In, Evaluate, Find, Uma, ULess, UmMod,
        ]
    };

    pub const fn token(self) -> Addr {
        self as Addr
    }

    pub fn from_token(xt: Addr) -> Option<Self> {
        Self::ALL.get(xt as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        use Primitive::*;
        match self {
            Lit => "_lit",
            Drop => "drop",
            Dup => "dup",
            Swap => "swap",
            Pick => "pick",
            Sys => "sys",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "_/",
            Mod => "_%",
            Peek => "_@",
            Poke => "_!",
            ToR => ">r",
            FromR => "r>",
            Equal => "=",
            Less => "<",
            And => "&",
            Or => "|",
            Xor => "^",
            Shl => "<<",
            Shr => ">>",
            Colon => ":",
            Tick => "_'",
            Execute => "execute",
            Exit => "exit",
            Semicolon => ";",
            Jump0 => "_jmp0",
            Jump => "_jmp",
            Depth => "depth",
            RDepth => "_rdepth",
            In => "_in",
            Evaluate => "_ev",
            Find => "find",
            Uma => "_uma",
            ULess => "u<",
            UmMod => "um/mod",
        }
    }

    pub const fn is_immediate(self) -> bool {
        matches!(self, Primitive::Semicolon)
    }

    /// Looks up a primitive by name, ignoring case.
    pub fn find(dict: &Dictionary, word: Word) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|primitive| dict.equal(word, primitive.name().as_bytes()))
    }
}

/// A decoded execution token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Primitive(Primitive),
    /// Only values in `0..LITERAL_LIMIT` have a token of their own.
    Literal(Cell),
    Call(Addr),
}

impl Token {
    /// Literals below this compile to a single token.
    pub const LITERAL_LIMIT: Cell = (Dictionary::BEGIN - WORD_COUNT) as Cell;

    pub fn decode(xt: Addr) -> Self {
        match Primitive::from_token(xt) {
            Some(primitive) => Token::Primitive(primitive),
            None if xt < Dictionary::BEGIN => Token::Literal((xt - WORD_COUNT) as Cell),
            None => Token::Call(xt),
        }
    }

    /// The compact token for `value`, if it has one.
    pub fn literal(value: Cell) -> Option<Self> {
        (0..Self::LITERAL_LIMIT)
            .contains(&value)
            .then_some(Token::Literal(value))
    }

    pub fn encode(self) -> Addr {
        match self {
            Token::Primitive(primitive) => primitive.token(),
            Token::Literal(value) => WORD_COUNT.wrapping_add(value as Addr),
            Token::Call(addr) => addr,
        }
    }
}

impl From<Primitive> for Token {
    fn from(primitive: Primitive) -> Self {
        Token::Primitive(primitive)
    }
}

fn flag(value: bool) -> Cell {
    if value {
        -1
    } else {
        0
    }
}

/// Reads the next word of input, asking the host for more lines until one
/// turns up.
pub(crate) fn next_word<T>(state: &mut State<T>) -> Result<Word, Error> {
    while !state.dict.has_input() {
        state.input()?;
    }
    Ok(state.dict.input())
}

/// Resolves `word` to an execution token and an immediate flag: `1` for
/// immediate words, `-1` for the rest, and `(0, 0)` when nothing matches.
fn resolve<T>(state: &State<T>, word: Word) -> (Cell, Cell) {
    let dict = &state.dict;
    if let Some(entry) = dict.find(word) {
        let imm = if dict.is_immediate(entry) { 1 } else { -1 };
        (dict.execution_token(entry) as Cell, imm)
    } else if let Some(primitive) = Primitive::find(dict, word) {
        let imm = if primitive.is_immediate() { 1 } else { -1 };
        (primitive.token() as Cell, imm)
    } else {
        (0, 0)
    }
}

/// Takes a relative branch whose offset sits in the cell after the opcode.
/// The offset counts from that cell.
fn jump<T>(state: &mut State<T>) {
    let offset = state.beyondip();
    let target = state.ip().wrapping_add(offset as Addr).wrapping_sub(CELL);
    state.set_ip(target);
}

/// Whether `ip` still has to move past the token just dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advance,
    Stay,
}

/// Dispatches one execution token.
///
/// A call pushes the return address and moves `ip` to the callee without
/// advancing. Everything else advances `ip` past the token (and any inline
/// operand) when done.
pub fn run<T>(state: &mut State<T>, xt: Addr) -> Result<(), Error> {
    let step = match Token::decode(xt) {
        Token::Call(addr) => {
            state.pushr(state.ip() as Cell)?;
            state.set_ip(addr);
            Step::Stay
        }
        Token::Literal(value) => {
            state.push(value)?;
            Step::Advance
        }
        Token::Primitive(primitive) => dispatch(state, primitive)?,
    };

    if step == Step::Advance {
        state.set_ip(state.ip().wrapping_add(CELL));
    }
    Ok(())
}

fn dispatch<T>(state: &mut State<T>, primitive: Primitive) -> Result<Step, Error> {
    use Primitive::*;

    match primitive {
        Lit => {
            let value = state.beyondip();
            state.push(value)?;
        }
        Drop => {
            state.pop()?;
        }
        Dup => {
            let top = state.top()?;
            state.push(top)?;
        }
        Swap => {
            let [a, b] = state.pop_n::<2>()?;
            state.push(b)?;
            state.push(a)?;
        }
        Pick => {
            let n = state.top()? as Addr as usize;
            let value = state.pick(n + 1)?;
            *state.top_mut()? = value;
        }
        Sys => {
            let selector = state.pop()?;
            state.sys(selector)?;
        }
        Add => binary(state, Cell::wrapping_add)?,
        Sub => binary(state, Cell::wrapping_sub)?,
        Mul => {
            let [a, b] = state.pop_n::<2>()?;
            let product = a as Addr as DoubleAddr * b as Addr as DoubleAddr;
            push_double(state, product as DoubleCell)?;
        }
        Div | Mod => {
            let [low, high, divisor] = state.pop_n::<3>()?;
            if divisor == 0 {
                return Err(Error::DivisionByZero);
            }
            let dividend = compose(low, high);
            let divisor = divisor as DoubleCell;
            let result = if primitive == Div {
                dividend.wrapping_div(divisor)
            } else {
                dividend.wrapping_rem(divisor)
            };
            state.push(result as Cell)?;
        }
        Peek => {
            let [addr, width] = state.pop_n::<2>()?;
            let value = if width != 0 {
                state.dict.read(addr as Addr)
            } else {
                state.dict.read_byte(addr as Addr) as Cell
            };
            state.push(value)?;
        }
        Poke => {
            let [value, addr, width] = state.pop_n::<3>()?;
            if width != 0 && addr as Addr == Dictionary::HERE {
                // moving Here is an allocation
                let amount = value.wrapping_sub(state.dict.here() as Cell);
                state.dict.allot(amount)?;
            } else if width != 0 {
                state.dict.write(addr as Addr, value);
            } else {
                state.dict.write_byte(addr as Addr, value as u8);
            }
        }
        ToR => {
            let value = state.top()?;
            state.pushr(value)?;
            state.pop()?;
        }
        FromR => {
            let value = state.popr()?;
            state.push(value)?;
        }
        Equal => binary(state, |a, b| flag(a == b))?,
        Less => binary(state, |a, b| flag(a < b))?,
        ULess => binary(state, |a, b| flag((a as Addr) < (b as Addr)))?,
        And => binary(state, |a, b| a & b)?,
        Or => binary(state, |a, b| a | b)?,
        Xor => binary(state, |a, b| a ^ b)?,
        Shl => binary(state, |a, n| {
            (a as Addr).checked_shl(n as Addr as u32).unwrap_or(0) as Cell
        })?,
        Shr => binary(state, |a, n| {
            (a as Addr).checked_shr(n as Addr as u32).unwrap_or(0) as Cell
        })?,
        Colon => {
            let entry = state.dict.align_here()?;
            state.push(entry as Cell)?;
            state.dict.write(Dictionary::COMP_TOKEN, entry as Cell);
            let word = next_word(state)?;
            state.dict.add_definition(word)?;
            state.set_compiling(true);
        }
        Semicolon => {
            let entry = state.top()? as Addr;
            state.dict.add(Exit.token() as Cell)?;
            state.pop()?;
            state.set_compiling(false);
            state.dict.link(entry)?;
        }
        Tick => {
            let word = next_word(state)?;
            let (xt, imm) = resolve(state, word);
            state.push(xt)?;
            state.push(imm)?;
        }
        Find => {
            let [addr, len] = state.pop_n::<2>()?;
            let word = Word::from_len(addr as Addr, len as Addr);
            let (xt, imm) = resolve(state, word);
            state.push(xt)?;
            state.push(imm)?;
        }
        Execute => {
            // the token run in our place moves `ip` itself
            let xt = state.pop()? as Addr;
            run(state, xt)?;
            return Ok(Step::Stay);
        }
        Exit => {
            let ip = state.popr()? as Addr;
            state.set_ip(ip);
            if ip == 0 {
                return Err(Error::Exit);
            }
        }
        Jump0 => {
            if state.pop()? == 0 {
                jump(state);
            } else {
                state.beyondip();
            }
        }
        Jump => jump(state),
        Depth => {
            let depth = state.depth() as Cell;
            state.push(depth)?;
        }
        RDepth => {
            let depth = state.rdepth() as Cell;
            state.push(depth)?;
        }
        In => state.input()?,
        Evaluate => {
            let saved = state.save();
            state.set_ip(0);
            let result = parser::parse_source(state);
            state.load(saved);
            result?;
        }
        Uma => {
            let [low, high, mul, add] = state.pop_n::<4>()?;
            let acc = (compose(low, high) as DoubleAddr)
                .wrapping_mul(mul as Addr as DoubleAddr)
                .wrapping_add(add as Addr as DoubleAddr);
            push_double(state, acc as DoubleCell)?;
        }
        UmMod => {
            let [low, high, divisor] = state.pop_n::<3>()?;
            if divisor == 0 {
                return Err(Error::DivisionByZero);
            }
            let dividend = compose(low, high) as DoubleAddr;
            let divisor = divisor as Addr as DoubleAddr;
            state.push((dividend % divisor) as Addr as Cell)?;
            state.push((dividend / divisor) as Addr as Cell)?;
        }
    }
    Ok(Step::Advance)
}

fn binary<T>(state: &mut State<T>, op: impl FnOnce(Cell, Cell) -> Cell) -> Result<(), Error> {
    let [a, b] = state.pop_n::<2>()?;
    state.push(op(a, b))
}

fn push_double<T>(state: &mut State<T>, value: DoubleCell) -> Result<(), Error> {
    let (low, high) = decompose(value);
    state.push(low)?;
    state.push(high)
}

#[cfg(test)]
mod tests {
    use super::{Primitive, Token, WORD_COUNT};
    use crate::{num::Cell, parser::parse, Dictionary, Error, State};
    use arbtest::arbtest;
    use assert2::{check, let_assert};
    use std::collections::HashSet;

    fn run(line: &str) -> Result<Vec<Cell>, Error> {
        let mut state = State::default();
        parse(&mut state, line)?;
        Ok(state.stack().to_vec())
    }

    #[test]
    fn token_bands() {
        check!(WORD_COUNT == 37);
        check!(Token::LITERAL_LIMIT == 59);
        check!(Token::decode(0) == Token::Primitive(Primitive::Lit));
        check!(Token::decode(36) == Token::Primitive(Primitive::UmMod));
        check!(Token::decode(37) == Token::Literal(0));
        check!(Token::decode(95) == Token::Literal(58));
        check!(Token::decode(96) == Token::Call(Dictionary::BEGIN));
    }

    #[test]
    fn primitives_round_trip() {
        let names = Primitive::ALL.map(Primitive::name);
        check!(names.iter().collect::<HashSet<_>>().len() == names.len());

        arbtest(|u| {
            let primitive: Primitive = u.arbitrary()?;
            check!(Primitive::ALL[primitive.token() as usize] == primitive);
            check!(Token::decode(primitive.token()) == Token::Primitive(primitive));
            Ok(())
        });
    }

    #[test]
    fn literal_compaction() {
        arbtest(|u| {
            let value: Cell = u.arbitrary()?;
            match Token::literal(value) {
                Some(token) => {
                    check!((0..59).contains(&value));
                    check!(Token::decode(token.encode()) == Token::Literal(value));
                }
                None => {
                    check!(!(0..59).contains(&value));
                }
            }
            Ok(())
        });
    }

    #[test]
    fn primitive_lookup_ignores_case() {
        let mut state = State::default();
        state.dict.load_input(b"DUP Um/Mod nope").unwrap();
        let word = state.dict.input();
        check!(Primitive::find(&state.dict, word) == Some(Primitive::Dup));
        let word = state.dict.input();
        check!(Primitive::find(&state.dict, word) == Some(Primitive::UmMod));
        let word = state.dict.input();
        check!(Primitive::find(&state.dict, word) == None);
    }

    #[test]
    fn arithmetic() {
        check!(run("2 3 +") == Ok(vec![5]));
        check!(run("2 3 -") == Ok(vec![-1]));
        check!(run("32767 1 +") == Ok(vec![-32768]));
        check!(run("300 300 *") == Ok(vec![0x5f90, 1]));
        check!(run("-1 -1 *") == Ok(vec![1, -2]));
        check!(run("7 0 2 _/") == Ok(vec![3]));
        check!(run("7 0 2 _%") == Ok(vec![1]));
        check!(run("-7 -1 2 _/") == Ok(vec![-3]));
        check!(run("7 0 0 _/") == Err(Error::DivisionByZero));
        check!(run("100 0 7 um/mod") == Ok(vec![2, 14]));
        check!(run("-1 0 2 um/mod") == Ok(vec![1, 0x7fff]));
        check!(run("5 0 3 4 _uma") == Ok(vec![19, 0]));
    }

    #[test]
    fn comparisons_and_bits() {
        check!(run("1 1 =") == Ok(vec![-1]));
        check!(run("1 2 =") == Ok(vec![0]));
        check!(run("-1 0 <") == Ok(vec![-1]));
        check!(run("-1 0 u<") == Ok(vec![0]));
        check!(run("12 10 & 12 10 | 12 10 ^") == Ok(vec![8, 14, 6]));
        check!(run("1 4 << -1 12 >>") == Ok(vec![16, 15]));
        check!(run("1 16 <<") == Ok(vec![0]));
    }

    #[test]
    fn stack_shuffles() {
        check!(run("1 2 swap") == Ok(vec![2, 1]));
        check!(run("1 2 3 2 pick") == Ok(vec![1, 2, 3, 1]));
        check!(run("1 dup drop") == Ok(vec![1]));
        check!(run("1 2 depth") == Ok(vec![1, 2, 2]));
        check!(run("5 >r _rdepth r>") == Ok(vec![1, 5]));
        check!(run("1 swap") == Err(Error::StackUnderflow));
        check!(run("r>") == Err(Error::ReturnStackUnderflow));
    }

    #[test]
    fn swap_underflow_changes_nothing() {
        let mut state = State::default();
        state.push(1).unwrap();
        let_assert!(Err(Error::StackUnderflow) = parse(&mut state, "swap"));
        check!(state.stack() == [1]);
    }

    #[test]
    fn memory_access() {
        check!(run("0 1 _@") == Ok(vec![10]));
        check!(run("513 200 1 _! 200 1 _@ 200 0 _@ 201 0 _@") == Ok(vec![513, 1, 2]));
        check!(run("-1 300 0 _! 300 1 _@") == Ok(vec![0xff]));
    }

    #[test]
    fn tick_and_execute() {
        check!(run("_' dup") == Ok(vec![Primitive::Dup.token() as Cell, -1]));
        check!(run("_' ;") == Ok(vec![Primitive::Semicolon.token() as Cell, 1]));
        check!(run("_' missing") == Ok(vec![0, 0]));
        check!(run("4 _' dup drop execute") == Ok(vec![4, 4]));
        check!(run(": twice dup + ; 3 _' twice drop execute") == Ok(vec![6]));
    }

    #[test]
    fn find_by_address_and_length() {
        let mut state = State::default();
        parse(&mut state, ": sq dup * ;").unwrap();
        let body = state.dict.entries().next().unwrap().body;

        // spell "SQ" into free memory and look it up
        parse(&mut state, "83 1000 0 _! 81 1001 0 _! 1000 2 find").unwrap();
        check!(state.stack() == [body as Cell, -1]);
    }

    #[test]
    fn exit_at_top_level_underflows() {
        check!(run("exit") == Err(Error::ReturnStackUnderflow));
    }

    #[test]
    fn default_sys_is_unhandled() {
        check!(run("9 sys") == Err(Error::UnhandledSys(9)));
        check!(run("_in") == Err(Error::InputExhausted));
    }
}
