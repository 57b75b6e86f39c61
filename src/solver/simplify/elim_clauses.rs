use std::mem;
use crate::formula::{Lit, Var, VarMap};


/// Reconstruction stack for eliminated variables. Each record is a block
/// of literals with the eliminated variable's literal first; blocks are
/// replayed in reverse by `extend`, flipping the variable whenever the
/// recorded clause is falsified by the partial model.
pub struct ElimClauses {
    extend_model: bool,
    literals: Vec<Lit>,
    sizes: Vec<usize>,
}

impl ElimClauses {
    pub fn new(extend_model: bool) -> ElimClauses {
        ElimClauses {
            extend_model,
            literals: Vec::new(),
            sizes: Vec::new(),
        }
    }

    pub fn mk_elim_unit(&mut self, x: Lit) {
        self.literals.push(x);
        self.sizes.push(1);
    }

    pub fn mk_elim_clause(&mut self, v: Var, clause: &[Lit]) {
        assert!(clause.len() > 1);
        let first = self.literals.len();

        // Copy clause, remembering where 'v' occurs:
        let mut v_pos = None;
        for (n, &lit) in clause.iter().enumerate() {
            self.literals.push(lit);
            if lit.var() == v {
                v_pos = Some(first + n);
            }
        }

        // The literal containing 'v' must come first in the block:
        self.literals.swap(first, v_pos.expect("eliminated var not in clause"));
        self.sizes.push(clause.len());
    }

    pub fn extend(&self, model: &mut VarMap<bool>) {
        if !self.extend_model {
            return;
        }

        let mut end = self.literals.len();
        for &size in self.sizes.iter().rev() {
            let block = &self.literals[end - size..end];

            let satisfied = block[1..].iter().any(|&lit| match model.get(lit.var()) {
                Some(&value) => value != lit.sign(),
                None => false,
            });
            if !satisfied {
                let lit = block[0];
                model.insert(lit.var(), !lit.sign());
            }

            end -= size;
        }
    }

    pub fn log_size(&self) {
        let sz = self.literals.len() + self.sizes.len();
        if sz > 0 {
            info!(
                "|  Eliminated clauses:     {:10.2} Mb                                      |",
                ((sz * mem::size_of::<u32>()) as f64) / (1024.0 * 1024.0)
            );
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: usize, s: bool) -> Lit {
        Var::from_index(v).lit(s)
    }

    #[test]
    fn unit_sets_default_value() {
        let mut elim = ElimClauses::new(true);
        elim.mk_elim_unit(lit(0, true));

        let mut model = VarMap::new();
        elim.extend(&mut model);
        // lit was negative, so the variable goes false
        assert_eq!(model.get(Var::from_index(0)), Some(&false));
    }

    #[test]
    fn falsified_clause_flips_variable() {
        // v0 eliminated from (v0 | v1); default v0 = false.
        let mut elim = ElimClauses::new(true);
        elim.mk_elim_clause(Var::from_index(0), &[lit(0, false), lit(1, false)]);
        elim.mk_elim_unit(lit(0, true));

        // v1 false: the stored clause forces v0 back to true.
        let mut model = VarMap::new();
        model.insert(Var::from_index(1), false);
        elim.extend(&mut model);
        assert_eq!(model.get(Var::from_index(0)), Some(&true));

        // v1 true: the clause is satisfied, the default survives.
        let mut model = VarMap::new();
        model.insert(Var::from_index(1), true);
        elim.extend(&mut model);
        assert_eq!(model.get(Var::from_index(0)), Some(&false));
    }

    #[test]
    fn disabled_extension_is_a_noop() {
        let mut elim = ElimClauses::new(false);
        elim.mk_elim_unit(lit(0, false));

        let mut model = VarMap::new();
        elim.extend(&mut model);
        assert!(model.get(Var::from_index(0)).is_none());
    }
}
