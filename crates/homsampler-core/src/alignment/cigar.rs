//! Compara CIGAR lines
//!
//! `M` columns carry sequence, `D` and `X` columns are gaps in this row, and
//! `I` consumes sequence that does not appear in the alignment. A missing
//! count means 1.

use homsampler_common::{HsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match(usize),
    Gap(usize),
    Skip(usize),
}

impl CigarOp {
    /// Alignment columns produced by this op
    pub fn columns(self) -> usize {
        match self {
            CigarOp::Match(n) | CigarOp::Gap(n) => n,
            CigarOp::Skip(_) => 0,
        }
    }

    /// Sequence bases consumed by this op
    pub fn bases(self) -> usize {
        match self {
            CigarOp::Match(n) | CigarOp::Skip(n) => n,
            CigarOp::Gap(_) => 0,
        }
    }
}

pub fn parse_cigar(line: &str) -> Result<Vec<CigarOp>> {
    let mut ops = Vec::new();
    let mut count: Option<usize> = None;

    for c in line.trim().chars() {
        if let Some(digit) = c.to_digit(10) {
            let n = count.unwrap_or(0);
            count = Some(
                n.checked_mul(10)
                    .and_then(|n| n.checked_add(digit as usize))
                    .ok_or_else(|| HsError::parse(format!("CIGAR count overflow in '{}'", line)))?,
            );
            continue;
        }

        let n = count.take().unwrap_or(1);
        let op = match c {
            'M' => CigarOp::Match(n),
            'D' | 'X' => CigarOp::Gap(n),
            'I' => CigarOp::Skip(n),
            other => {
                return Err(HsError::parse(format!(
                    "unknown CIGAR op '{}' in '{}'",
                    other, line
                )))
            },
        };
        ops.push(op);
    }

    if count.is_some() {
        return Err(HsError::parse(format!("CIGAR line '{}' ends with a count", line)));
    }
    Ok(ops)
}

/// Total alignment width of a parsed line
pub fn aligned_width(ops: &[CigarOp]) -> usize {
    ops.iter().map(|op| op.columns()).sum()
}
