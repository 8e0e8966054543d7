use crate::num::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    Overflow,
    Underflow,
}

/// A bounded stack of cells. Index 0 is the bottom.
#[derive(Debug, Clone)]
pub struct Stack {
    cells: Box<[Cell]>,
    depth: usize,
}

impl Stack {
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size].into_boxed_slice(),
            depth: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.depth = 0;
    }

    pub fn push(&mut self, value: Cell) -> Result<(), StackError> {
        let slot = self
            .cells
            .get_mut(self.depth)
            .ok_or(StackError::Overflow)?;
        *slot = value;
        self.depth += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell, StackError> {
        let depth = self.depth.checked_sub(1).ok_or(StackError::Underflow)?;
        self.depth = depth;
        Ok(self.cells[depth])
    }

    pub fn top_mut(&mut self) -> Result<&mut Cell, StackError> {
        let depth = self.depth.checked_sub(1).ok_or(StackError::Underflow)?;
        Ok(&mut self.cells[depth])
    }

    /// The cell `n` below the top; `pick(0)` is the top itself.
    pub fn pick(&self, n: usize) -> Result<Cell, StackError> {
        let index = self
            .depth
            .checked_sub(n + 1)
            .ok_or(StackError::Underflow)?;
        Ok(self.cells[index])
    }

    /// Live cells, bottom first.
    pub fn as_slice(&self) -> &[Cell] {
        &self.cells[..self.depth]
    }
}

#[cfg(test)]
mod tests {
    use super::{Stack, StackError};
    use assert2::check;

    #[test]
    fn push_pop() {
        let mut stack = Stack::new(3);
        check!(stack.pop() == Err(StackError::Underflow));
        check!(stack.depth() == 0);

        for i in 1..=3 {
            check!(stack.push(i) == Ok(()));
        }
        check!(stack.push(4) == Err(StackError::Overflow));
        check!(stack.as_slice() == [1, 2, 3]);

        check!(stack.pick(0) == Ok(3));
        check!(stack.pick(2) == Ok(1));
        check!(stack.pick(3) == Err(StackError::Underflow));

        *stack.top_mut().unwrap() = 7;
        check!(stack.pop() == Ok(7));
        check!(stack.depth() == 2);

        stack.clear();
        check!(stack.as_slice().is_empty());
        check!(stack.top_mut().is_err());
    }
}
