/*!
Process commands: the closed set of things a synthetic instruction stream can
ask a CPU to do.

- `Alu` carries the absolute addresses of two operands already written to
  memory plus the arithmetic operation to apply.
- `Io` carries the duration (in ticks) of an IO transfer serviced by an IO
  controller.
- `Exit` ends the process.
*/

/// Arithmetic operation kind for `Command::Alu`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpType {
    Add,
    Sub,
    Div,
    Mul,
}

impl OpType {
    pub const COUNT: i64 = 4;

    /// Map a uniform draw in [0, COUNT) to an operation.
    pub fn from_index(index: i64) -> OpType {
        match index.rem_euclid(Self::COUNT) {
            0 => OpType::Add,
            1 => OpType::Sub,
            2 => OpType::Div,
            _ => OpType::Mul,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Arithmetic on two operands previously written at `addr1`/`addr2`.
    Alu {
        addr1: usize,
        addr2: usize,
        op: OpType,
    },
    /// IO transfer taking `duration` controller ticks.
    Io { duration: u64 },
    /// Process termination.
    Exit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_index_covers_all_variants() {
        let ops: Vec<OpType> = (0..OpType::COUNT).map(OpType::from_index).collect();
        assert_eq!(ops, vec![OpType::Add, OpType::Sub, OpType::Div, OpType::Mul]);
    }
}
