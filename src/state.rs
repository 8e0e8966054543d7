//! Execution state: the stacks, the instruction pointer and the host hooks.

pub mod stack;

use crate::{
    config::Config,
    corewords,
    dictionary::{Dictionary, MemoryStorage},
    num::{Addr, Cell, CELL},
    word::Word,
    Error,
};
use stack::{Stack, StackError};

/// Handler for the `sys` primitive, called with the popped selector.
pub type SysFunc<T> = fn(&mut State<T>, Cell) -> Result<(), Error>;
/// Called when a word needs more input than the current source holds.
/// Implementations refill the input buffer, usually with
/// [`Dictionary::load_input`].
pub type InputFunc<T> = fn(&mut State<T>) -> Result<(), Error>;
/// Last resort for a word nothing else could resolve.
pub type ParseFunc<T> = fn(&mut State<T>, Word) -> Result<(), Error>;

/// The host's extension points.
pub struct Hooks<T> {
    pub sys: SysFunc<T>,
    pub input: InputFunc<T>,
    pub custom_parse: Option<ParseFunc<T>>,
}

// derive would require `T: Clone`
impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hooks<T> {}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            sys: unhandled_sys,
            input: no_input,
            custom_parse: None,
        }
    }
}

impl<T> Hooks<T> {
    pub fn with_sys(self, sys: SysFunc<T>) -> Self {
        Self { sys, ..self }
    }

    pub fn with_input(self, input: InputFunc<T>) -> Self {
        Self { input, ..self }
    }

    pub fn with_custom_parse(self, custom_parse: ParseFunc<T>) -> Self {
        Self {
            custom_parse: Some(custom_parse),
            ..self
        }
    }
}

fn unhandled_sys<T>(_: &mut State<T>, selector: Cell) -> Result<(), Error> {
    Err(Error::UnhandledSys(selector))
}

fn no_input<T>(_: &mut State<T>) -> Result<(), Error> {
    Err(Error::InputExhausted)
}

/// What [`State::save`] captures so a nested evaluation can run and then
/// hand control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub ip: Addr,
}

pub struct State<T = ()> {
    pub dict: Dictionary,
    pub host: T,
    hooks: Hooks<T>,
    data: Stack,
    rets: Stack,
    context: Context,
}

impl<T> State<T> {
    pub fn new(dict: Dictionary, host: T, hooks: Hooks<T>) -> Self {
        Self::with_stacks(dict, host, hooks, Config::default())
    }

    /// Builds a fresh, initialized dictionary sized by `config`.
    pub fn from_config(config: Config, host: T, hooks: Hooks<T>) -> Self {
        let mut dict = Dictionary::new(MemoryStorage::new(config.dictionary_size));
        dict.initialize();
        Self::with_stacks(dict, host, hooks, config)
    }

    fn with_stacks(dict: Dictionary, host: T, hooks: Hooks<T>, config: Config) -> Self {
        Self {
            dict,
            host,
            hooks,
            data: Stack::new(config.data_stack_size),
            rets: Stack::new(config.return_stack_size),
            context: Context::default(),
        }
    }

    pub fn push(&mut self, value: Cell) -> Result<(), Error> {
        self.data.push(value).map_err(data_error)
    }

    pub fn pop(&mut self) -> Result<Cell, Error> {
        self.data.pop().map_err(data_error)
    }

    /// Pops the top `N` cells and returns them deepest first. Fails without
    /// popping anything when fewer than `N` are there.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Cell; N], Error> {
        if N > 0 {
            self.pick(N - 1)?;
        }
        let mut cells = [0; N];
        for cell in cells.iter_mut().rev() {
            *cell = self.pop()?;
        }
        Ok(cells)
    }

    pub fn top(&self) -> Result<Cell, Error> {
        self.pick(0)
    }

    pub fn top_mut(&mut self) -> Result<&mut Cell, Error> {
        self.data.top_mut().map_err(data_error)
    }

    pub fn pick(&self, n: usize) -> Result<Cell, Error> {
        self.data.pick(n).map_err(data_error)
    }

    pub fn pushr(&mut self, value: Cell) -> Result<(), Error> {
        self.rets.push(value).map_err(return_error)
    }

    pub fn popr(&mut self) -> Result<Cell, Error> {
        self.rets.pop().map_err(return_error)
    }

    pub fn depth(&self) -> usize {
        self.data.depth()
    }

    pub fn rdepth(&self) -> usize {
        self.rets.depth()
    }

    /// The data stack, bottom first.
    pub fn stack(&self) -> &[Cell] {
        self.data.as_slice()
    }

    pub fn compiling(&self) -> bool {
        self.dict.read(Dictionary::COMPILING) != 0
    }

    pub fn set_compiling(&mut self, compiling: bool) {
        self.dict.write(Dictionary::COMPILING, compiling as Cell)
    }

    pub fn ip(&self) -> Addr {
        self.context.ip
    }

    pub fn set_ip(&mut self, ip: Addr) {
        self.context.ip = ip
    }

    /// Steps over the cell after the current instruction and returns it.
    pub fn beyondip(&mut self) -> Cell {
        self.context.ip = self.context.ip.wrapping_add(CELL);
        self.dict.read(self.context.ip)
    }

    pub fn save(&self) -> Context {
        self.context
    }

    pub fn load(&mut self, context: Context) {
        self.context = context
    }

    /// Runs the execution token `xt` to completion.
    ///
    /// Calls into a defined word keep fetching and dispatching until the
    /// outermost `exit` returns to address zero. Any error unwinds the whole
    /// call chain; the stacks are left as they were at the failure, so hosts
    /// are expected to [`reset`](Self::reset) afterwards.
    pub fn execute(&mut self, xt: Addr) -> Result<(), Error> {
        tracing::trace!(xt, ip = self.context.ip, "execute");
        match self.run_threaded(xt) {
            Ok(()) | Err(Error::Exit) => Ok(()),
            Err(err) => {
                self.context.ip = 0;
                Err(err)
            }
        }
    }

    fn run_threaded(&mut self, xt: Addr) -> Result<(), Error> {
        corewords::run(self, xt)?;

        if self.context.ip < Dictionary::BEGIN {
            // a primitive or literal, nothing left to run
            self.context.ip = 0;
            return Ok(());
        }

        loop {
            let xt = self.dict.read(self.context.ip) as Addr;
            corewords::run(self, xt)?;
        }
    }

    /// Empties both stacks and leaves compile mode. A definition that was
    /// still being compiled is dropped.
    pub fn reset(&mut self) {
        if self.compiling() {
            let entry = self.dict.read(Dictionary::COMP_TOKEN) as Addr;
            if entry >= Dictionary::BEGIN && entry <= self.dict.here() {
                self.dict.set_here(entry);
            }
        }

        self.data.clear();
        self.rets.clear();
        self.set_compiling(false);
        self.context = Context::default();
    }

    /// Asks the host for another line of input.
    pub fn input(&mut self) -> Result<(), Error> {
        let input = self.hooks.input;
        input(self)
    }

    pub fn sys(&mut self, selector: Cell) -> Result<(), Error> {
        let sys = self.hooks.sys;
        sys(self, selector)
    }

    pub(crate) fn custom_parse(&mut self, word: Word) -> Option<Result<(), Error>> {
        let custom_parse = self.hooks.custom_parse?;
        Some(custom_parse(self, word))
    }
}

impl Default for State<()> {
    fn default() -> Self {
        Self::from_config(Config::default(), (), Hooks::default())
    }
}

fn data_error(err: StackError) -> Error {
    match err {
        StackError::Overflow => Error::StackOverflow,
        StackError::Underflow => Error::StackUnderflow,
    }
}

fn return_error(err: StackError) -> Error {
    match err {
        StackError::Overflow => Error::ReturnStackOverflow,
        StackError::Underflow => Error::ReturnStackUnderflow,
    }
}
