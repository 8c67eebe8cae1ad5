use std::{fs, io, path, str};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use flate2::read::GzDecoder;
use crate::sat::{SolveRes, Solver};
use crate::sat::formula::{Lit, Var, VarMap};


fn read_possibly_gzipped<P: AsRef<path::Path>>(path: &P) -> io::Result<String> {
    let raw = fs::read(path)?;
    if raw.starts_with(&[0x1f, 0x8b]) {
        let mut text = String::new();
        GzDecoder::new(&raw[..]).read_to_string(&mut text)?;
        Ok(text)
    } else {
        String::from_utf8(raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}


pub fn parse_file<P: AsRef<path::Path>, S: Solver>(
    path: &P,
    solver: &mut S,
    validate: bool,
) -> io::Result<VarMap<i32>> {
    let text = read_possibly_gzipped(path)?;
    parse(&text, solver, validate)
}

pub fn parse<S: Solver>(text: &str, solver: &mut S, validate: bool) -> io::Result<VarMap<i32>> {
    let mut subst = Subst::new(solver);
    DimacsParser::parse(text, validate, |cl| subst.add_clause(cl))?;
    Ok(subst.backward_subst)
}

/// Parses into plain integer clauses, without touching a solver.
pub fn parse_raw(text: &str) -> io::Result<(usize, Vec<Vec<i32>>)> {
    let mut clauses = Vec::new();
    let mut max_var = 0;
    DimacsParser::parse(text, false, |cl| {
        for &lit in cl.iter() {
            max_var = max_var.max(lit.abs() as usize);
        }
        clauses.push(cl);
    })?;
    Ok((max_var, clauses))
}

pub fn write_cnf<W: io::Write>(
    stream: &mut W,
    vars: usize,
    clauses: &[Vec<i32>],
) -> io::Result<()> {
    writeln!(stream, "p cnf {} {}", vars, clauses.len())?;
    for clause in clauses {
        for lit in clause {
            write!(stream, "{} ", lit)?;
        }
        writeln!(stream, "0")?;
    }
    Ok(())
}


pub fn write_model<W: io::Write>(
    stream: &mut W,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<()> {
    for (var, &val) in model.iter() {
        let var_id = backward_subst[&var];
        write!(stream, "{} ", if val { var_id } else { -var_id })?;
    }
    writeln!(stream, "0")?;
    Ok(())
}

pub fn write_result<W: io::Write>(
    mut stream: W,
    result: &SolveRes,
    backward_subst: &VarMap<i32>,
) -> io::Result<()> {
    match result {
        SolveRes::UnSAT(_, _) => {
            writeln!(stream, "UNSAT")?;
        }
        SolveRes::Unknown(_, _) => {
            writeln!(stream, "INDET")?;
        }
        SolveRes::SAT(ref model, _) => {
            writeln!(stream, "SAT")?;
            write_model(&mut stream, backward_subst, model)?;
        }
    }
    Ok(())
}


pub fn validate_model_file<P: AsRef<path::Path>>(
    path: &P,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<bool> {
    let text = read_possibly_gzipped(path)?;
    validate_model(&text, backward_subst, model)
}

pub fn validate_model(
    text: &str,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<bool> {
    let mut lits = HashSet::new();
    for (var, &value) in model.iter() {
        let lit_id = {
            let var_id = backward_subst[&var];
            if value {
                var_id
            } else {
                -var_id
            }
        };

        if lits.contains(&(-lit_id)) {
            return Ok(false);
        }
        lits.insert(lit_id);
    }

    let mut ok = true;
    DimacsParser::parse(text, false, |cl| {
        if !cl.iter().any(|lit| lits.contains(lit)) {
            ok = false;
        }
    })?;

    Ok(ok)
}


struct Subst<'s, S: 's> {
    solver: &'s mut S,
    forward_subst: HashMap<i32, Var>,
    backward_subst: VarMap<i32>,
}

impl<'s, S: Solver> Subst<'s, S> {
    fn new(solver: &'s mut S) -> Self {
        Subst {
            solver,
            forward_subst: HashMap::new(),
            backward_subst: VarMap::new(),
        }
    }

    fn add_clause(&mut self, raw: Vec<i32>) {
        let lits: Vec<Lit> = raw.iter().map(|&lit_id| self.lit_by_id(lit_id)).collect();
        self.solver.add_clause(&lits[..]);
    }

    fn lit_by_id(&mut self, lit_id: i32) -> Lit {
        let var_id = lit_id.abs();
        if !self.forward_subst.contains_key(&var_id) {
            let v = self.solver.new_var(None, true);
            self.forward_subst.insert(var_id, v);
            self.backward_subst.insert(&v, var_id);
        }

        self.forward_subst[&var_id].lit(lit_id < 0)
    }
}


struct DimacsParser<'p> {
    reader: str::Chars<'p>,
    cur: Option<char>,
    vars: HashSet<i32>,
    clauses: usize,
}

impl<'p> DimacsParser<'p> {
    fn parse<F: FnMut(Vec<i32>)>(text: &'p str, validate: bool, clause: F) -> io::Result<()> {
        let mut p = DimacsParser {
            reader: text.chars(),
            cur: None,
            vars: HashSet::new(),
            clauses: 0,
        };
        p.next();
        p.parse_me(validate, clause)
    }

    fn parse_me<F: FnMut(Vec<i32>)>(&mut self, validate: bool, mut clause: F) -> io::Result<()> {
        enum State {
            Waiting,
            Parsing(usize, usize),
        }

        let mut state = State::Waiting;
        loop {
            self.skip_whitespace();
            match state {
                State::Waiting => match self.current() {
                    Some('c') => {
                        self.skip_line();
                    }

                    _ => {
                        self.consume("p cnf")?;
                        let vars = self.next_uint()?;
                        let clauses = self.next_uint()?;
                        state = State::Parsing(vars, clauses);
                    }
                },

                State::Parsing(vars, clauses) => match self.current() {
                    Some('c') => {
                        self.skip_line();
                    }

                    None => {
                        if validate {
                            if clauses != self.clauses {
                                return Err(parse_error(format!(
                                    "DIMACS header mismatch: {} clauses declared, {} found",
                                    clauses, self.clauses
                                )));
                            }

                            if vars < self.vars.len() {
                                return Err(parse_error(format!(
                                    "DIMACS header mismatch: {} vars declared, {} discovered",
                                    vars,
                                    self.vars.len()
                                )));
                            }
                        }
                        return Ok(());
                    }

                    _ => {
                        let c = self.parse_clause()?;
                        clause(c);
                    }
                },
            }
        }
    }

    fn parse_clause(&mut self) -> io::Result<Vec<i32>> {
        let mut lits = Vec::new();
        loop {
            let lit = self.next_int()?;
            if lit == 0 {
                self.clauses += 1;
                return Ok(lits);
            } else {
                self.vars.insert(lit.abs());
                lits.push(lit);
            }
        }
    }


    #[inline]
    fn next(&mut self) {
        self.cur = self.reader.next();
    }

    #[inline]
    fn current(&self) -> Option<char> {
        self.cur
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.cur {
            if !c.is_whitespace() {
                break;
            }
            self.next();
        }
    }

    fn skip_line(&mut self) {
        loop {
            match self.cur {
                None => break,
                Some('\n') => {
                    self.next();
                    break;
                }
                _ => self.next(),
            }
        }
    }

    fn consume(&mut self, target: &str) -> io::Result<()> {
        for tc in target.chars() {
            match self.cur {
                Some(c) if c == tc => self.next(),
                _ => {
                    return Err(parse_error(format!("failed to consume; expected '{}'", target)));
                }
            }
        }
        Ok(())
    }

    fn read_int_body(&mut self) -> io::Result<usize> {
        let mut len: usize = 0;
        let mut value = 0;
        loop {
            match self.cur.and_then(|c| c.to_digit(10)) {
                Some(d) => {
                    value = value * 10 + (d as usize);
                    len += 1;
                    self.next()
                }

                _ if len > 0 => return Ok(value),

                _ => {
                    return Err(parse_error("int expected".to_string()));
                }
            }
        }
    }

    fn next_int(&mut self) -> io::Result<i32> {
        self.skip_whitespace();
        let sign = match self.cur {
            Some('+') => {
                self.next();
                1
            }
            Some('-') => {
                self.next();
                -1
            }
            _ => 1,
        };

        let val = self.read_int_body()?;
        Ok(sign * (val as i32))
    }

    fn next_uint(&mut self) -> io::Result<usize> {
        self.skip_whitespace();
        if let Some('+') = self.cur {
            self.next();
        }
        self.read_int_body()
    }
}

fn parse_error(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("PARSE ERROR! {}", message))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw() {
        let (vars, clauses) = parse_raw("c comment\np cnf 3 2\n1 -3 0\n2 3 -1 0\n").unwrap();
        assert_eq!(vars, 3);
        assert_eq!(clauses, vec![vec![1, -3], vec![2, 3, -1]]);
    }

    #[test]
    fn test_parse_empty_formula() {
        let (vars, clauses) = parse_raw("p cnf 0 0\n").unwrap();
        assert_eq!(vars, 0);
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_header_validation() {
        let mut sink = RawSink::default();
        let text = "p cnf 1 3\n1 0\n";
        let err = DimacsParser::parse(text, true, |cl| sink.clauses.push(cl)).unwrap_err();
        assert!(err.to_string().contains("header mismatch"));
    }

    #[test]
    fn test_roundtrip() {
        let text = "p cnf 4 3\n1 -2 0\n-3 4 1 0\n2 0\n";
        let (vars, clauses) = parse_raw(text).unwrap();

        let mut out = Vec::new();
        write_cnf(&mut out, vars, &clauses).unwrap();
        let reparsed = parse_raw(str::from_utf8(&out).unwrap()).unwrap();
        assert_eq!(reparsed, (vars, clauses));
    }

    #[derive(Default)]
    struct RawSink {
        clauses: Vec<Vec<i32>>,
    }
}
