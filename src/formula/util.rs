use super::{assignment::Assignment, Lit, Var, VarMap};


pub fn calc_abstraction(lits: &[Lit]) -> u32 {
    let mut abstraction: u32 = 0;
    for lit in lits {
        abstraction |= lit.abstraction();
    }
    abstraction
}


pub fn satisfied_with_assignment(clause: &[Lit], assigns: &Assignment) -> bool {
    clause.iter().any(|&lit| assigns.is_true(lit))
}

pub fn satisfied_with_model(clause: &[Lit], model: &VarMap<bool>) -> bool {
    for &lit in clause {
        match model.get(lit.var()) {
            Some(&value) if value != lit.sign() => {
                return true;
            }
            _ => {}
        }
    }
    false
}


/// Resolvent of `ps` and `qs` on `v`; `None` when it is a tautology.
pub fn merge(v: Var, ps: &[Lit], qs: &[Lit]) -> Option<Vec<Lit>> {
    let (longer, shorter) = if ps.len() < qs.len() { (qs, ps) } else { (ps, qs) };

    let mut res = Vec::with_capacity(longer.len() + shorter.len() - 2);
    for &qi in shorter {
        if qi.var() == v {
            continue;
        }

        let mut keep = true;
        for &pj in longer {
            if pj.var() == qi.var() {
                if pj == !qi {
                    return None;
                }
                keep = false;
                break;
            }
        }

        if keep {
            res.push(qi);
        }
    }

    for &lit in longer {
        if lit.var() != v {
            res.push(lit);
        }
    }

    Some(res)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: usize, s: bool) -> Lit {
        Var::from_index(v).lit(s)
    }

    #[test]
    fn abstraction_is_literal_set_hash() {
        let ps = [lit(0, false), lit(33, true)];
        // vars 0 and 33 collide modulo 32
        assert_eq!(calc_abstraction(&ps), calc_abstraction(&[lit(0, true), lit(33, false)]));
        assert_eq!(calc_abstraction(&[lit(0, false)]), 1);
        assert_eq!(calc_abstraction(&[lit(1, false)]), 2);
    }

    #[test]
    fn merge_resolves_on_pivot() {
        let v = Var::from_index(1);
        let ps = [lit(0, false), lit(1, false)];
        let qs = [lit(1, true), lit(2, false)];
        let res = merge(v, &ps, &qs).unwrap();
        assert_eq!(res.len(), 2);
        assert!(res.contains(&lit(0, false)));
        assert!(res.contains(&lit(2, false)));
    }

    #[test]
    fn merge_detects_tautology() {
        let v = Var::from_index(1);
        let ps = [lit(0, false), lit(1, false)];
        let qs = [lit(1, true), lit(0, true)];
        assert_eq!(merge(v, &ps, &qs), None);
    }

    #[test]
    fn merge_dedups_shared_literals() {
        let v = Var::from_index(1);
        let ps = [lit(0, false), lit(1, false), lit(2, false)];
        let qs = [lit(1, true), lit(2, false)];
        let res = merge(v, &ps, &qs).unwrap();
        assert_eq!(res.len(), 2);
    }
}
