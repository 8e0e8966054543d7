//! Standard vocabulary written in Forth on top of the primitives.

use crate::{parser::parse, state::State, Error};

pub const SOURCE: &str = include_str!("prelude.fth");

/// Defines the prelude words in `state`'s dictionary, one line at a time.
pub fn load<T>(state: &mut State<T>) -> Result<(), Error> {
    for line in SOURCE.lines() {
        parse(state, line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load, SOURCE};
    use crate::{num::Cell, parser::parse, Dictionary, Error, State};
    use assert2::{check, let_assert};

    fn forth() -> State {
        let mut state = State::default();
        load(&mut state).unwrap();
        state
    }

    fn eval(line: &str) -> Vec<Cell> {
        let mut state = forth();
        parse(&mut state, line).unwrap();
        state.stack().to_vec()
    }

    #[test]
    fn loads_cleanly() {
        let state = forth();
        check!(state.depth() == 0);
        check!(!state.compiling());
        check!(SOURCE.lines().all(|line| line.len() <= Dictionary::INPUT_CAPACITY as usize));
        check!(state.dict.entries().count() > 50);
    }

    #[test]
    fn stack_words() {
        check!(eval("1 2 over") == [1, 2, 1]);
        check!(eval("1 2 3 rot") == [2, 3, 1]);
        check!(eval("1 2 nip 3 4 2dup") == [2, 3, 4, 3, 4]);
        check!(eval("5 1+ 5 1- 3 cells") == [6, 4, 6]);
    }

    #[test]
    fn arithmetic_words() {
        check!(eval("-7 2 / 7 2 mod") == [-3, 1]);
        check!(eval("5 negate -5 abs 5 abs") == [-5, 5, 5]);
        check!(eval("3 9 min 3 9 max") == [3, 9]);
        check!(eval("1 2 > 2 1 > 0 0= 3 0<") == [0, -1, -1, 0]);
        check!(eval("hex ff decimal 10") == [255, 10]);
    }

    #[test]
    fn conditionals() {
        let mut state = forth();
        parse(&mut state, ": sign dup 0< if drop -1 else 0= if 0 else 1 then then ;").unwrap();
        parse(&mut state, "-5 sign 0 sign 7 sign").unwrap();
        check!(state.stack() == [-1, 0, 1]);
    }

    #[test]
    fn loops() {
        let mut state = forth();
        parse(&mut state, ": count 0 begin 1+ dup 5 = until ;").unwrap();
        parse(&mut state, ": down begin dup while 1- repeat ;").unwrap();
        parse(&mut state, "count 3 down").unwrap();
        check!(state.stack() == [5, 0]);
    }

    #[test]
    fn variables_and_constants() {
        check!(eval("variable v 5 v ! v @ 3 v +! v @") == [5, 8]);
        check!(eval("42 constant answer answer answer") == [42, 42]);
    }

    #[test]
    fn immediate_words() {
        let mut state = forth();
        parse(&mut state, ": seven 7 ; immediate").unwrap();
        check!(state.dict.entries().next().unwrap().immediate);
        parse(&mut state, ": x seven literal ; : ten [ 2 5 * drop ] literal ;").unwrap();
        parse(&mut state, ": twice ['] dup execute + ;").unwrap();
        parse(&mut state, "x ten 3 twice ' dup").unwrap();
        check!(state.stack() == [7, 10, 6, 2]);
    }

    #[test]
    fn comments() {
        check!(eval("1 ( two ) 3 \\ 4") == [1, 3]);
        check!(eval(": c ( n -- n ) 1 + ; 1 c") == [2]);
    }

    #[test]
    fn evaluate_runs_a_string_in_memory() {
        let mut state = forth();
        let text = b"2 3 + dup";
        let addr = state.dict.allot(text.len() as Cell).unwrap();
        for (i, byte) in text.iter().enumerate() {
            state.dict.write_byte(addr + i as u16, *byte);
        }
        state.push(addr as Cell).unwrap();
        state.push(text.len() as Cell).unwrap();
        parse(&mut state, "evaluate 1").unwrap();
        check!(state.stack() == [5, 5, 1]);
        check!(state.rdepth() == 0);
    }

    #[test]
    fn allot_stays_inside_the_dictionary() {
        let mut state = forth();
        let here = state.dict.here();
        let_assert!(Err(Error::DictionaryFull { .. }) = parse(&mut state, "-2000 allot"));
        check!(state.dict.here() == here);

        state.reset();
        let_assert!(
            Err(Error::DictionaryFull { here: at, requested: 10000 }) =
                parse(&mut state, "30000 allot 30000 allot 10000 allot")
        );
        check!(at == here + 60000);
        check!(state.dict.here() == here + 60000);

        state.reset();
        parse(&mut state, ": x 7 ; x").unwrap();
        check!(state.stack() == [7]);
        check!(state.dict.here() > here + 60000);
    }

    #[test]
    fn definitions_cannot_nest() {
        let mut state = forth();
        let_assert!(Err(Error::BadLink { .. }) = parse(&mut state, ": a [ : b 1 ; ] 2 ;"));
        state.reset();
        parse(&mut state, "b").unwrap();
        check!(state.stack() == [1]);
        let_assert!(Err(Error::WordNotFound(_)) = parse(&mut state, "a"));
    }

    #[test]
    fn output_words_need_a_host() {
        let mut state = forth();
        let_assert!(Err(Error::UnhandledSys(0)) = parse(&mut state, "1 ."));
        let_assert!(Err(Error::UnhandledSys(2)) = parse(&mut state, "cr"));
    }
}
