use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use crate::sat::formula::{Idx, Lit};
use self::checker::OnlineChecker;

pub mod checker;


#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProofFormat {
    Text,
    Binary,
}

// Records are buffered and flushed in large blocks; 2 MiB keeps the
// emitter out of the profile even on proof-heavy instances.
const PROOF_BUFFER_BYTES: usize = 2 * 1024 * 1024;


/// Per-solver DRUP/DRAT proof pipeline: an optional log written to disk
/// and an optional online checker fed with the very same records. Every
/// clause added after input registration and every deleted clause
/// produces exactly one record, in the order the arena operations
/// happen.
pub struct Proof {
    writer: Option<BufWriter<fs::File>>,
    format: ProofFormat,
    checker: Option<OnlineChecker>,
    concluded: bool,
}

impl Proof {
    pub fn to_file<P: AsRef<Path>>(path: P, format: ProofFormat, check: bool) -> io::Result<Proof> {
        let file = fs::File::create(path)?;
        Ok(Proof {
            writer: Some(BufWriter::with_capacity(PROOF_BUFFER_BYTES, file)),
            format,
            checker: if check {
                Some(OnlineChecker::new())
            } else {
                None
            },
            concluded: false,
        })
    }

    /// Checker without a log file; used for self-verification runs.
    pub fn checking_only() -> Proof {
        Proof {
            writer: None,
            format: ProofFormat::Text,
            checker: Some(OnlineChecker::new()),
            concluded: false,
        }
    }

    pub fn checker(&self) -> Option<&OnlineChecker> {
        self.checker.as_ref()
    }

    /// Feeds an input clause to the checker. Input clauses are axioms of
    /// the proof and are not written to the log.
    pub fn register_original(&mut self, lits: &[Lit]) {
        if let Some(checker) = self.checker.as_mut() {
            checker.add_axiom(lits);
        }
    }

    pub fn add_clause(&mut self, lits: &[Lit]) {
        if self.concluded {
            return;
        }
        self.emit(true, lits);
        if let Some(checker) = self.checker.as_mut() {
            if let Err(violation) = checker.add_checked(lits) {
                error!("proof check failed on addition: {}", violation);
                panic!("proof check failed: {}", violation);
            }
        }
    }

    pub fn delete_clause(&mut self, lits: &[Lit]) {
        if self.concluded {
            return;
        }
        self.emit(false, lits);
        if let Some(checker) = self.checker.as_mut() {
            if let Err(violation) = checker.delete(lits) {
                error!("proof check failed on deletion: {}", violation);
                panic!("proof check failed: {}", violation);
            }
        }
    }

    /// Ends the proof with the empty clause. Idempotent; later records
    /// are dropped since the refutation is already complete.
    pub fn conclude_unsat(&mut self) {
        if self.concluded {
            return;
        }
        self.add_clause(&[]);
        self.concluded = true;
        self.finish();
    }

    pub fn finish(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .unwrap_or_else(|err| panic!("cannot flush proof stream: {}", err));
        }
    }

    fn emit(&mut self, add: bool, lits: &[Lit]) {
        let format = self.format;
        if let Some(writer) = self.writer.as_mut() {
            write_record(writer, format, add, lits)
                .unwrap_or_else(|err| panic!("cannot write proof record: {}", err));
        }
    }
}

impl Drop for Proof {
    fn drop(&mut self) {
        self.finish();
    }
}


fn write_record<W: Write>(
    writer: &mut W,
    format: ProofFormat,
    add: bool,
    lits: &[Lit],
) -> io::Result<()> {
    match format {
        ProofFormat::Text => {
            if !add {
                writer.write_all(b"d ")?;
            }
            for &lit in lits {
                let id = (lit.var().idx() + 1) as i64;
                write!(writer, "{} ", if lit.sign() { -id } else { id })?;
            }
            writer.write_all(b"0\n")
        }

        ProofFormat::Binary => {
            writer.write_all(if add { b"a" } else { b"d" })?;
            for &lit in lits {
                // 2·|l| + sign, variables numbered from one
                let code = 2 * (lit.var().idx() as u64 + 1) + (lit.sign() as u64);
                leb128::write::unsigned(writer, code)?;
            }
            writer.write_all(&[0])
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::formula::Var;

    fn lit(i: i32) -> Lit {
        Var::unidx((i.abs() - 1) as usize).lit(i < 0)
    }

    #[test]
    fn test_text_record_format() {
        let mut buf = Vec::new();
        write_record(&mut buf, ProofFormat::Text, true, &[lit(1), lit(-3)]).unwrap();
        write_record(&mut buf, ProofFormat::Text, false, &[lit(2)]).unwrap();
        write_record(&mut buf, ProofFormat::Text, true, &[]).unwrap();
        assert_eq!(&buf[..], b"1 -3 0\nd 2 0\n0\n".as_ref());
    }

    #[test]
    fn test_binary_record_format() {
        let mut buf = Vec::new();
        write_record(&mut buf, ProofFormat::Binary, true, &[lit(1), lit(-3)]).unwrap();
        // 'a', varint(2·1)=2, varint(2·3+1)=7, 0
        assert_eq!(&buf[..], &[b'a', 2, 7, 0][..]);

        buf.clear();
        write_record(&mut buf, ProofFormat::Binary, false, &[lit(64)]).unwrap();
        // 2·64 = 128 needs two varint bytes
        assert_eq!(&buf[..], &[b'd', 0x80, 0x01, 0][..]);
    }

    #[test]
    fn test_checker_pipeline() {
        let mut proof = Proof::checking_only();
        proof.register_original(&[lit(1), lit(2)]);
        proof.register_original(&[lit(1), lit(-2)]);
        proof.add_clause(&[lit(1)]);
        proof.delete_clause(&[lit(1), lit(2)]);
        assert!(!proof.checker().unwrap().is_refuted());
    }

    #[test]
    #[should_panic(expected = "proof check failed")]
    fn test_checker_rejects_bogus_addition() {
        let mut proof = Proof::checking_only();
        proof.register_original(&[lit(1), lit(2)]);
        proof.add_clause(&[lit(2)]);
    }
}
