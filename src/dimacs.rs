use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Read, Write};
use std::{fs, path, str};
use flate2::read::GzDecoder;
use crate::formula::{Lit, Var, VarMap};
use crate::{SolveRes, Solver};


/// Opens `path`, transparently decompressing gzip input (detected by the
/// magic bytes rather than the file name).
fn open_reader<P: AsRef<path::Path>>(path: &P) -> io::Result<Box<dyn Read>> {
    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let gzipped = {
        let head = reader.fill_buf()?;
        head.len() >= 2 && head[0] == 0x1f && head[1] == 0x8b
    };
    if gzipped {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}


pub fn parse_file<P: AsRef<path::Path>, S: Solver>(
    path: &P,
    solver: &mut S,
    validate: bool,
) -> io::Result<VarMap<i32>> {
    parse(&mut open_reader(path)?, solver, validate)
}

pub fn parse<R: Read, S: Solver>(
    stream: &mut R,
    solver: &mut S,
    validate: bool,
) -> io::Result<VarMap<i32>> {
    let mut subst = Subst::new(solver);
    DimacsParser::parse(stream, validate, |cl| subst.add_clause(cl))?;
    Ok(subst.backward_subst)
}


/// Emits the current clause database as DIMACS CNF over a compact
/// renumbering of the surviving (non-eliminated) variables.
pub fn write_cnf<W: Write, S: Solver>(stream: &mut W, solver: &S) -> io::Result<()> {
    let clauses = solver.export_clauses();

    let mut numbering: VarMap<i32> = VarMap::new();
    let mut n_vars = 0i32;
    for clause in clauses.iter() {
        for lit in clause.iter() {
            if numbering.get(lit.var()).is_none() {
                n_vars += 1;
                numbering.insert(lit.var(), n_vars);
            }
        }
    }

    writeln!(stream, "p cnf {} {}", n_vars, clauses.len())?;
    for clause in clauses.iter() {
        for lit in clause.iter() {
            let id = numbering[lit.var()];
            write!(stream, "{} ", if lit.sign() { -id } else { id })?;
        }
        writeln!(stream, "0")?;
    }
    Ok(())
}

/// Smallest conventional encoding of an unsatisfiable formula, emitted
/// when simplification already refuted the input.
pub fn write_unsat_cnf<W: Write>(stream: &mut W) -> io::Result<()> {
    writeln!(stream, "p cnf 1 2")?;
    writeln!(stream, "1 0")?;
    writeln!(stream, "-1 0")?;
    Ok(())
}


pub fn write_result<W: Write, S: Solver>(
    mut stream: W,
    result: SolveRes<S>,
    backward_subst: &VarMap<i32>,
) -> io::Result<()> {
    match result {
        SolveRes::UnSAT(_) | SolveRes::AssumpsConfl(_, _) => {
            writeln!(stream, "UNSAT")?;
        }

        SolveRes::Interrupted(_, _) => {
            writeln!(stream, "INDET")?;
        }

        SolveRes::SAT(model, _) => {
            writeln!(stream, "SAT")?;
            write_model(&mut stream, backward_subst, &model)?;
        }
    }
    Ok(())
}

pub fn write_model<W: Write>(
    stream: &mut W,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<()> {
    for (var, &value) in model.iter() {
        let var_id = backward_subst[var];
        write!(stream, "{} ", if value { var_id } else { -var_id })?;
    }
    writeln!(stream, "0")?;
    Ok(())
}


pub fn validate_model_file<P: AsRef<path::Path>>(
    path: &P,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<bool> {
    validate_model(&mut open_reader(path)?, backward_subst, model)
}

/// Re-reads the formula and checks that the model satisfies every clause
/// and assigns no variable both ways.
pub fn validate_model<R: Read>(
    stream: &mut R,
    backward_subst: &VarMap<i32>,
    model: &VarMap<bool>,
) -> io::Result<bool> {
    let mut lits = HashSet::new();
    for (var, &value) in model.iter() {
        let lit_id = {
            let var_id = backward_subst[var];
            if value {
                var_id
            } else {
                -var_id
            }
        };

        lits.insert(lit_id);
        if lits.contains(&(-lit_id)) {
            return Ok(false);
        }
    }

    let mut ok = true;
    DimacsParser::parse(stream, false, |cl| {
        if !cl.iter().any(|lit| lits.contains(lit)) {
            ok = false;
        }
    })?;

    Ok(ok)
}


/// Maps DIMACS variable ids onto solver variables and back. Ids are
/// allocated densely so the solver's variable count matches the header.
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
        while self.solver.n_vars() < (lit_id.abs() as usize) {
            let var_id = (self.solver.n_vars() + 1) as i32;
            let v = self.solver.new_var(None, true);
            self.forward_subst.insert(var_id, v);
            self.backward_subst.insert(v, var_id);
        }

        self.forward_subst[&lit_id.abs()].lit(lit_id < 0)
    }
}


struct DimacsParser<'p> {
    reader: str::Chars<'p>,
    cur: Option<char>,
    line: usize,
    col: usize,
    vars: HashSet<i32>,
    clauses: usize,
}

impl<'p> DimacsParser<'p> {
    pub fn parse<R: Read, F: FnMut(Vec<i32>)>(
        reader: &mut R,
        validate: bool,
        clause: F,
    ) -> io::Result<()> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;

        let mut p = DimacsParser {
            reader: buf.chars(),
            cur: None,
            line: 1,
            col: 0,
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
                                return Err(self.error(format!(
                                    "DIMACS header mismatch: {} clauses declared, {} found",
                                    clauses, self.clauses
                                )));
                            }

                            if vars < self.vars.len() {
                                return Err(self.error(format!(
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


    fn next(&mut self) {
        if let Some('\n') = self.cur {
            self.line += 1;
            self.col = 0;
        }
        self.cur = self.reader.next();
        if self.cur.is_some() {
            self.col += 1;
        }
    }

    #[inline]
    fn current(&self) -> Option<char> {
        self.cur
    }

    fn error(&self, message: String) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("PARSE ERROR! line {}, col {}: {}", self.line, self.col, message),
        )
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
                    return Err(self.error(format!("expected '{}'", target)));
                }
            }
        }
        Ok(())
    }

    fn read_int_body(&mut self) -> io::Result<i64> {
        let mut len = 0;
        let mut value: i64 = 0;
        loop {
            match self.cur.and_then(|c| c.to_digit(10)) {
                Some(d) => {
                    value = value
                        .saturating_mul(10)
                        .saturating_add(d as i64);
                    len += 1;
                    self.next();
                }

                _ if len > 0 => {
                    return Ok(value);
                }

                _ => {
                    return Err(self.error("integer expected".to_string()));
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
        if val > i32::max_value() as i64 {
            return Err(self.error(format!("literal {} out of range", val)));
        }
        Ok(sign * (val as i32))
    }

    fn next_uint(&mut self) -> io::Result<usize> {
        self.skip_whitespace();
        if let Some('+') = self.cur {
            self.next();
        }
        Ok(self.read_int_body()? as usize)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct ClauseSink {
        n_vars: usize,
        clauses: Vec<Vec<Lit>>,
    }

    impl ClauseSink {
        fn new() -> Self {
            ClauseSink {
                n_vars: 0,
                clauses: Vec::new(),
            }
        }
    }

    impl Solver for ClauseSink {
        fn n_vars(&self) -> usize {
            self.n_vars
        }

        fn n_clauses(&self) -> usize {
            self.clauses.len()
        }

        fn new_var(&mut self, _: Option<bool>, _: bool) -> Var {
            self.n_vars += 1;
            Var::from_index(self.n_vars - 1)
        }

        fn add_clause(&mut self, clause: &[Lit]) -> bool {
            self.clauses.push(clause.to_vec());
            true
        }

        fn preprocess(&mut self, _: &crate::solver::budget::Budget) -> bool {
            true
        }

        fn solve_limited(
            self,
            _: &crate::solver::budget::Budget,
            _: &[Lit],
        ) -> SolveRes<Self> {
            SolveRes::Interrupted(0.0, self)
        }

        fn stats(&self) -> crate::Stats {
            Default::default()
        }

        fn export_clauses(&self) -> Vec<Vec<Lit>> {
            self.clauses.clone()
        }
    }

    #[test]
    fn parses_header_comments_and_clauses() {
        let mut sink = ClauseSink::new();
        let text = "c sample\np cnf 3 2\n1 -2 0\nc mid comment\n2 3 0\n";
        parse(&mut text.as_bytes(), &mut sink, true).expect("parse");

        assert_eq!(sink.n_vars, 3);
        assert_eq!(sink.clauses.len(), 2);
        assert_eq!(
            sink.clauses[0],
            vec![Var::from_index(0).pos_lit(), Var::from_index(1).neg_lit()]
        );
    }

    #[test]
    fn strict_mode_rejects_header_mismatch() {
        let mut sink = ClauseSink::new();
        let text = "p cnf 2 5\n1 2 0\n";
        let err = parse(&mut text.as_bytes(), &mut sink, true).unwrap_err();
        assert!(err.to_string().contains("header mismatch"));
    }

    #[test]
    fn malformed_input_reports_position() {
        let mut sink = ClauseSink::new();
        let text = "p cnf 1 1\n1 x 0\n";
        let err = parse(&mut text.as_bytes(), &mut sink, false).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "unexpected message: {}", msg);
    }

    #[test]
    fn cnf_round_trip() {
        let mut sink = ClauseSink::new();
        let text = "p cnf 3 3\n1 2 0\n-1 3 0\n-2 -3 0\n";
        parse(&mut text.as_bytes(), &mut sink, true).expect("parse");

        let mut out = Vec::new();
        write_cnf(&mut out, &sink).expect("write");

        let mut again = ClauseSink::new();
        parse(&mut &out[..], &mut again, true).expect("reparse");
        assert_eq!(sink.clauses, again.clauses);
    }

    #[test]
    fn model_validation() {
        let text = "p cnf 2 2\n1 2 0\n-1 2 0\n";

        let mut backward = VarMap::new();
        backward.insert(Var::from_index(0), 1);
        backward.insert(Var::from_index(1), 2);

        let mut good = VarMap::new();
        good.insert(Var::from_index(0), true);
        good.insert(Var::from_index(1), true);
        assert!(validate_model(&mut text.as_bytes(), &backward, &good).unwrap());

        let mut bad = VarMap::new();
        bad.insert(Var::from_index(0), true);
        bad.insert(Var::from_index(1), false);
        assert!(!validate_model(&mut text.as_bytes(), &backward, &bad).unwrap());
    }
}
