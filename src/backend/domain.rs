//! In-memory CP backend.

use std::collections::HashMap;

use log::trace;

use super::cp::{CpBackend, DomainVar, Literal};
use crate::error::BackendError;

/// A CP backend that only stores domains and literals.
///
/// Boolean variable 0 is reserved for the constants: its positive literal is
/// `true`, its negative literal is `false`. Value-equality literals are
/// created once per `(variable, value)` pair and reused afterwards.
///
/// # Examples
///
/// ```
/// use u_hybrid::backend::{CpBackend, DomainStore};
///
/// let mut cp = DomainStore::new();
/// let x = cp.new_int(0, 3).unwrap();
/// let eq = cp.eq_literal(x, 2).unwrap();
/// assert_eq!(cp.eq_literal(x, 2).unwrap(), eq);
/// assert_eq!(cp.eq_literal(x, 9).unwrap(), cp.false_literal());
/// assert_eq!(cp.true_literal(), !cp.false_literal());
/// ```
#[derive(Debug, Clone)]
pub struct DomainStore {
    bools: u32,
    domains: Vec<(i64, i64)>,
    eq_literals: HashMap<(DomainVar, i64), Literal>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self {
            bools: 1,
            domains: Vec::new(),
            eq_literals: HashMap::new(),
        }
    }

    /// The `(variable, value)` pair a literal was created for, if any.
    pub fn eq_link(&self, lit: Literal) -> Option<(DomainVar, i64)> {
        self.eq_literals
            .iter()
            .find(|(_, &l)| l.var() == lit.var())
            .map(|(&key, _)| key)
    }
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CpBackend for DomainStore {
    fn false_literal(&self) -> Literal {
        Literal::new(0, false)
    }

    fn true_literal(&self) -> Literal {
        Literal::new(0, true)
    }

    fn new_bool(&mut self) -> Literal {
        let lit = Literal::new(self.bools, true);
        self.bools += 1;
        lit
    }

    fn new_int(&mut self, lb: i64, ub: i64) -> Result<DomainVar, BackendError> {
        if lb > ub {
            return Err(BackendError::EmptyDomain { lb, ub });
        }
        let var = DomainVar(self.domains.len() as u32);
        self.domains.push((lb, ub));
        trace!("new_int({var} in [{lb}, {ub}])");
        Ok(var)
    }

    fn eq_literal(&mut self, var: DomainVar, value: i64) -> Result<Literal, BackendError> {
        let (lb, ub) = self
            .bounds(var)
            .ok_or(BackendError::InvalidDomainVar(var.0))?;
        if value < lb || value > ub {
            return Ok(self.false_literal());
        }
        if lb == ub {
            return Ok(self.true_literal());
        }
        if let Some(&lit) = self.eq_literals.get(&(var, value)) {
            return Ok(lit);
        }
        let lit = self.new_bool();
        self.eq_literals.insert((var, value), lit);
        trace!("eq_literal({var} == {value}) -> {lit}");
        Ok(lit)
    }

    fn bounds(&self, var: DomainVar) -> Option<(i64, i64)> {
        self.domains.get(var.0 as usize).copied()
    }

    fn num_bools(&self) -> usize {
        self.bools as usize
    }

    fn num_ints(&self) -> usize {
        self.domains.len()
    }
}
