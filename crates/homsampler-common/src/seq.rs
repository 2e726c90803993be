//! Nucleotide sequence helpers
//!
//! Sequences are plain byte vectors of IUPAC nucleotide codes. Alignment rows
//! additionally carry `-` (gap) and the mask symbol, both of which are their
//! own complement.

/// Symbol used for masked alignment columns
pub const MASK_CHAR: u8 = b'?';

/// Symbol used for alignment gaps
pub const GAP_CHAR: u8 = b'-';

/// Symbol used for unknown bases and filler columns
pub const UNKNOWN_BASE: u8 = b'N';

/// Default FASTA line width
pub const FASTA_LINE_WIDTH: usize = 60;

const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

/// Complement a single IUPAC nucleotide code, preserving case
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'U' => b'A',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        b'u' => b'a',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        // S, W, N, gaps and mask symbols are self-complementary
        other => other,
    }
}

/// Reverse complement in place
pub fn reverse_complement_in_place(seq: &mut [u8]) {
    seq.reverse();
    for base in seq.iter_mut() {
        *base = complement(*base);
    }
}

/// Reverse complement into a new vector
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Drop any trailing partial codon, then a terminal stop codon if present
///
/// The result length is always a multiple of three.
pub fn trim_to_complete_codons(seq: &mut Vec<u8>) {
    let whole = seq.len() - seq.len() % 3;
    seq.truncate(whole);

    if seq.len() >= 3 {
        let last = &seq[seq.len() - 3..];
        let is_stop = STOP_CODONS
            .iter()
            .any(|stop| last.eq_ignore_ascii_case(&stop[..]));
        if is_stop {
            seq.truncate(seq.len() - 3);
        }
    }
}

/// A named sequence ready for FASTA output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

impl FastaRecord {
    pub fn new(name: impl Into<String>, seq: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            seq,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Format as a FASTA record with the body wrapped at `width` columns
    pub fn to_fasta(&self, width: usize) -> String {
        let width = width.max(1);
        let mut out = String::with_capacity(self.seq.len() + self.seq.len() / width + self.name.len() + 3);
        out.push('>');
        out.push_str(&self.name);
        out.push('\n');
        for line in self.seq.chunks(width) {
            out.push_str(&String::from_utf8_lossy(line));
            out.push('\n');
        }
        out
    }
}

/// Format several records as one FASTA document
pub fn to_fasta(records: &[FastaRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_fasta(FASTA_LINE_WIDTH))
        .collect()
}
