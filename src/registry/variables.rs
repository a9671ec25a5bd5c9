//! Variable registry implementation.

use std::collections::BTreeMap;

use log::trace;

use super::types::{BoolSlot, BoolVar, IntSlot, IntVar, SlotKind};
use crate::backend::{CpBackend, DomainVar, IpBackend, Literal, VarHandle, VarKind};
use crate::error::ModelError;

/// Canonical boolean and integer slots of a model.
///
/// Mutating methods receive the backends explicitly; the registry itself
/// holds nothing but handles, so it can be value-copied for a working copy
/// of the problem.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    bools: Vec<BoolSlot>,
    ints: Vec<IntSlot>,
    indicators: Vec<BTreeMap<i64, BoolVar>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the constant slots `false`, `true` and `0`.
    ///
    /// Must be called on an empty registry, before any other variable.
    pub fn seed_constants(
        &mut self,
        ip: &mut dyn IpBackend,
        cp: &mut dyn CpBackend,
    ) -> Result<(), ModelError> {
        debug_assert!(self.bools.is_empty() && self.ints.is_empty());

        let false_lit = cp.false_literal();
        let falsity = self.push_boolean(ip, "false", 0.0, false_lit)?;
        debug_assert_eq!(falsity, BoolVar::FALSE);
        let truth = self.negate(ip, falsity)?;
        debug_assert_eq!(truth, BoolVar::TRUE);
        debug_assert_eq!(self.bools[1].cp, cp.true_literal());

        let zero = self.create_integer(ip, cp, 0, 0, "zero")?;
        debug_assert_eq!(zero, IntVar::ZERO);
        Ok(())
    }

    /// Creates a new positive boolean with a fresh handle in each backend.
    pub fn create_boolean(
        &mut self,
        ip: &mut dyn IpBackend,
        cp: &mut dyn CpBackend,
        name: impl Into<String>,
    ) -> Result<BoolVar, ModelError> {
        let lit = cp.new_bool();
        self.push_boolean(ip, name, 1.0, lit)
    }

    /// Returns the negation of `var`, creating the alias slot on first use.
    ///
    /// The negation of an alias is its positive slot, so `negate` is its own
    /// inverse.
    pub fn negate(&mut self, ip: &mut dyn IpBackend, var: BoolVar) -> Result<BoolVar, ModelError> {
        let slot = self.bool_slot(var)?;
        let kind = slot.kind;
        match kind {
            SlotKind::Negated { positive } => Ok(positive),
            SlotKind::Positive {
                negation: Some(neg),
            } => Ok(neg),
            SlotKind::Positive { negation: None } => {
                let cp = !slot.cp;
                let name = format!("~{}", slot.name);
                let handle = ip.negated_var(slot.ip)?;
                let neg = BoolVar(self.bools.len());
                self.bools.push(BoolSlot {
                    ip: handle,
                    cp,
                    kind: SlotKind::Negated { positive: var },
                    name,
                });
                self.bools[var.0].kind = SlotKind::Positive {
                    negation: Some(neg),
                };
                trace!("negate({var}) -> {neg}");
                Ok(neg)
            }
        }
    }

    /// Creates an integer variable with domain `[lb, ub]` in both backends.
    pub fn create_integer(
        &mut self,
        ip: &mut dyn IpBackend,
        cp: &mut dyn CpBackend,
        lb: i64,
        ub: i64,
        name: impl Into<String>,
    ) -> Result<IntVar, ModelError> {
        if lb > ub {
            return Err(ModelError::InvalidDomain { lb, ub });
        }
        let name = name.into();
        let domain = cp.new_int(lb, ub)?;
        let handle = ip.create_var(&name, lb as f64, ub as f64, 0.0, VarKind::Integer)?;
        add_or_release(ip, handle)?;
        Ok(self.push_integer(Some(handle), domain, lb, ub, name))
    }

    /// Creates an integer variable that exists only in the CP backend.
    pub fn create_virtual_integer(
        &mut self,
        cp: &mut dyn CpBackend,
        lb: i64,
        ub: i64,
        name: impl Into<String>,
    ) -> Result<IntVar, ModelError> {
        if lb > ub {
            return Err(ModelError::InvalidDomain { lb, ub });
        }
        let domain = cp.new_int(lb, ub)?;
        Ok(self.push_integer(None, domain, lb, ub, name.into()))
    }

    /// Returns the boolean standing for `var == value`.
    ///
    /// Values outside the domain map to [`BoolVar::FALSE`] and the value of a
    /// fixed variable maps to [`BoolVar::TRUE`]. Other indicators are created
    /// once and reused.
    pub fn indicator(
        &mut self,
        ip: &mut dyn IpBackend,
        cp: &mut dyn CpBackend,
        var: IntVar,
        value: i64,
    ) -> Result<BoolVar, ModelError> {
        let slot = self.int_slot(var)?;
        if value < slot.lb || value > slot.ub {
            return Ok(BoolVar::FALSE);
        }
        if slot.is_fixed() {
            return Ok(BoolVar::TRUE);
        }
        if let Some(&existing) = slot
            .indicators
            .and_then(|table| self.indicators[table].get(&value))
        {
            return Ok(existing);
        }

        let domain = slot.cp;
        let name = format!("[{} == {value}]", slot.name);
        let lit = cp.eq_literal(domain, value)?;
        let indicator = self.push_boolean(ip, name, 1.0, lit)?;

        let table = match self.ints[var.0].indicators {
            Some(table) => table,
            None => {
                self.indicators.push(BTreeMap::new());
                let table = self.indicators.len() - 1;
                self.ints[var.0].indicators = Some(table);
                table
            }
        };
        self.indicators[table].insert(value, indicator);
        Ok(indicator)
    }

    /// Indicators created so far for `var`, keyed by value.
    pub fn indicators_of(&self, var: IntVar) -> Option<&BTreeMap<i64, BoolVar>> {
        self.ints
            .get(var.0)
            .and_then(|slot| slot.indicators)
            .map(|table| &self.indicators[table])
    }

    /// Whether `var` owns its handles.
    ///
    /// # Panics
    /// Panics if `var` is not a slot of this registry.
    pub fn is_positive(&self, var: BoolVar) -> bool {
        self.bools[var.0].is_positive()
    }

    pub fn bool_count(&self) -> usize {
        self.bools.len()
    }

    pub fn int_count(&self) -> usize {
        self.ints.len()
    }

    pub fn bool_slot(&self, var: BoolVar) -> Result<&BoolSlot, ModelError> {
        self.bools.get(var.0).ok_or(ModelError::UnknownBool(var.0))
    }

    pub fn int_slot(&self, var: IntVar) -> Result<&IntSlot, ModelError> {
        self.ints.get(var.0).ok_or(ModelError::UnknownInt(var.0))
    }

    pub fn bools(&self) -> &[BoolSlot] {
        &self.bools
    }

    pub fn ints(&self) -> &[IntSlot] {
        &self.ints
    }

    pub(crate) fn bools_mut(&mut self) -> &mut [BoolSlot] {
        &mut self.bools
    }

    pub(crate) fn ints_mut(&mut self) -> &mut [IntSlot] {
        &mut self.ints
    }

    fn push_boolean(
        &mut self,
        ip: &mut dyn IpBackend,
        name: impl Into<String>,
        ub: f64,
        lit: Literal,
    ) -> Result<BoolVar, ModelError> {
        let name = name.into();
        let handle = ip.create_var(&name, 0.0, ub, 0.0, VarKind::Binary)?;
        add_or_release(ip, handle)?;
        let var = BoolVar(self.bools.len());
        self.bools.push(BoolSlot {
            ip: handle,
            cp: lit,
            kind: SlotKind::Positive { negation: None },
            name,
        });
        trace!("create_boolean({}) -> {var}", self.bools[var.0].name);
        Ok(var)
    }

    fn push_integer(
        &mut self,
        ip: Option<VarHandle>,
        cp: DomainVar,
        lb: i64,
        ub: i64,
        name: String,
    ) -> IntVar {
        let var = IntVar(self.ints.len());
        trace!("create_integer({name} in [{lb}, {ub}]) -> {var}");
        self.ints.push(IntSlot {
            ip,
            cp,
            lb,
            ub,
            name,
            indicators: None,
        });
        var
    }
}

/// Adds a freshly created variable to the problem, dropping the creator's
/// reference again if the problem refuses it.
fn add_or_release(ip: &mut dyn IpBackend, handle: VarHandle) -> Result<(), ModelError> {
    if let Err(err) = ip.add_var(handle) {
        ip.release_var(handle)?;
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DomainStore, MemoryIp};
    use crate::error::BackendError;

    fn backends() -> (MemoryIp, DomainStore) {
        let mut ip = MemoryIp::new();
        ip.create_problem("test").unwrap();
        (ip, DomainStore::new())
    }

    fn seeded() -> (VariableRegistry, MemoryIp, DomainStore) {
        let (mut ip, mut cp) = backends();
        let mut reg = VariableRegistry::new();
        reg.seed_constants(&mut ip, &mut cp).unwrap();
        (reg, ip, cp)
    }

    #[test]
    fn test_seed_constants() {
        let (reg, ip, cp) = seeded();
        assert_eq!(reg.bool_count(), 2);
        assert_eq!(reg.int_count(), 1);
        assert!(reg.is_positive(BoolVar::FALSE));
        assert!(!reg.is_positive(BoolVar::TRUE));
        assert_eq!(
            reg.bool_slot(BoolVar::TRUE).unwrap().back_reference(),
            Some(BoolVar::FALSE)
        );
        assert_eq!(reg.bools()[0].cp(), cp.false_literal());
        assert_eq!(reg.bools()[1].cp(), cp.true_literal());

        let zero = reg.int_slot(IntVar::ZERO).unwrap();
        assert_eq!((zero.lb(), zero.ub()), (0, 0));
        assert!(!zero.is_virtual());
        assert_eq!(ip.problem_size(), (2, 0));
    }

    #[test]
    fn test_negate_is_involution() {
        let (mut reg, mut ip, mut cp) = seeded();
        let x = reg.create_boolean(&mut ip, &mut cp, "x").unwrap();
        let not_x = reg.negate(&mut ip, x).unwrap();

        assert_ne!(x, not_x);
        assert_eq!(reg.negate(&mut ip, not_x).unwrap(), x);
        assert_eq!(reg.negate(&mut ip, x).unwrap(), not_x);
        assert!(reg.is_positive(x));
        assert!(!reg.is_positive(not_x));
        assert_eq!(reg.bools()[not_x.0].cp(), !reg.bools()[x.0].cp());
        assert_eq!(reg.bools()[not_x.0].name(), "~x");
        assert_eq!(reg.bool_count(), 4);
    }

    #[test]
    fn test_negate_constants() {
        let (mut reg, mut ip, _cp) = seeded();
        assert_eq!(reg.negate(&mut ip, BoolVar::FALSE).unwrap(), BoolVar::TRUE);
        assert_eq!(reg.negate(&mut ip, BoolVar::TRUE).unwrap(), BoolVar::FALSE);
        assert_eq!(reg.bool_count(), 2);
    }

    #[test]
    fn test_negate_unknown() {
        let (mut reg, mut ip, _cp) = seeded();
        assert_eq!(
            reg.negate(&mut ip, BoolVar(42)),
            Err(ModelError::UnknownBool(42))
        );
    }

    #[test]
    fn test_integer_domains() {
        let (mut reg, mut ip, mut cp) = seeded();
        let x = reg.create_integer(&mut ip, &mut cp, -3, 7, "x").unwrap();
        let slot = reg.int_slot(x).unwrap();
        assert_eq!((slot.lb(), slot.ub()), (-3, 7));
        assert_eq!(cp.bounds(slot.cp()), Some((-3, 7)));

        assert_eq!(
            reg.create_integer(&mut ip, &mut cp, 5, 4, "bad"),
            Err(ModelError::InvalidDomain { lb: 5, ub: 4 })
        );

        let v = reg.create_virtual_integer(&mut cp, 0, 9, "v").unwrap();
        assert!(reg.int_slot(v).unwrap().is_virtual());
        assert_eq!(reg.int_count(), 3);
        assert_eq!(ip.problem_size(), (3, 0));
    }

    #[test]
    fn test_indicators() {
        let (mut reg, mut ip, mut cp) = seeded();
        let x = reg.create_integer(&mut ip, &mut cp, 0, 3, "x").unwrap();

        assert_eq!(reg.indicator(&mut ip, &mut cp, x, 9).unwrap(), BoolVar::FALSE);
        assert_eq!(
            reg.indicator(&mut ip, &mut cp, IntVar::ZERO, 0).unwrap(),
            BoolVar::TRUE
        );
        assert!(reg.indicators_of(x).is_none());

        let eq2 = reg.indicator(&mut ip, &mut cp, x, 2).unwrap();
        assert_eq!(reg.indicator(&mut ip, &mut cp, x, 2).unwrap(), eq2);
        let eq1 = reg.indicator(&mut ip, &mut cp, x, 1).unwrap();
        assert_ne!(eq1, eq2);
        assert_eq!(reg.bool_slot(eq2).unwrap().name(), "[x == 2]");

        let table = reg.indicators_of(x).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&2), Some(&eq2));
        assert_eq!(cp.eq_link(reg.bools()[eq2.0].cp()), Some((reg.ints()[x.0].cp(), 2)));
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let mut ip = MemoryIp::new().with_allocation_limit(3);
        ip.create_problem("test").unwrap();
        let mut cp = DomainStore::new();
        let mut reg = VariableRegistry::new();
        reg.seed_constants(&mut ip, &mut cp).unwrap();

        let err = reg.create_boolean(&mut ip, &mut cp, "x").unwrap_err();
        assert!(matches!(err, ModelError::Backend(BackendError::Allocation(_))));
        assert_eq!(reg.bool_count(), 2);
    }
}
