//! The outer interpreter: tokenize, resolve, then compile or execute.

use crate::{
    corewords::{Primitive, Token},
    num::{parse_number, Addr, Cell},
    state::State,
    word::Word,
    Error,
};

/// Loads `text` as the current source and interprets all of it.
pub fn parse<T>(state: &mut State<T>, text: &str) -> Result<(), Error> {
    state.dict.load_input(text.as_bytes())?;
    parse_source(state)
}

/// Interprets whatever remains of the current source.
pub fn parse_source<T>(state: &mut State<T>) -> Result<(), Error> {
    while state.dict.has_input() {
        let word = state.dict.input();
        parse_word(state, word)?;
    }
    Ok(())
}

/// Resolves one word and either compiles or runs it.
///
/// Resolution order: the dictionary, then the primitives, then a number in
/// the current base, then the host's custom parse hook.
pub fn parse_word<T>(state: &mut State<T>, word: Word) -> Result<(), Error> {
    let (xt, immediate): (Addr, bool) = if let Some(entry) = state.dict.find(word) {
        (state.dict.execution_token(entry), state.dict.is_immediate(entry))
    } else if let Some(primitive) = Primitive::find(&state.dict, word) {
        (primitive.token(), primitive.is_immediate())
    } else if let Some(value) = parse_number(state.dict.word_bytes(word), state.dict.base()) {
        return process_literal(state, value);
    } else if let Some(result) = state.custom_parse(word) {
        return result;
    } else {
        tracing::debug!(%word, "word not found");
        return Err(Error::WordNotFound(word));
    };

    if state.compiling() && !immediate {
        state.dict.add(xt as Cell)
    } else {
        state.execute(xt)
    }
}

/// Compiles `value` as a literal, or pushes it when interpreting.
pub fn process_literal<T>(state: &mut State<T>, value: Cell) -> Result<(), Error> {
    if !state.compiling() {
        return state.push(value);
    }

    match Token::literal(value) {
        Some(token) => state.dict.add(token.encode() as Cell),
        None => {
            state.dict.add(Token::from(Primitive::Lit).encode() as Cell)?;
            state.dict.add(value)
        }
    }
}
