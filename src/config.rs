use crate::dictionary::storage::MAX_CAPACITY;

/// Sizes used by [`State::from_config`](crate::State::from_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Cells on the data stack.
    pub data_stack_size: usize,
    /// Cells on the return stack.
    pub return_stack_size: usize,
    /// Bytes of dictionary memory, at most 65536.
    pub dictionary_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_stack_size: 64,
            return_stack_size: 64,
            dictionary_size: MAX_CAPACITY,
        }
    }
}

impl Config {
    pub fn with_dictionary_size(self, dictionary_size: usize) -> Self {
        Self {
            dictionary_size,
            ..self
        }
    }

    pub fn with_stack_sizes(self, data_stack_size: usize, return_stack_size: usize) -> Self {
        Self {
            data_stack_size,
            return_stack_size,
            ..self
        }
    }
}
