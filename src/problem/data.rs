//! Problem data container.

use log::trace;

use crate::backend::{ConsHandle, IpBackend};
use crate::error::BackendError;
use crate::registry::{BoolSlot, BoolVar, IntSlot, IntVar, VariableRegistry};

/// Name of the constraint handler that bridges CP propagation into the IP
/// search.
pub const BRIDGE_HANDLER: &str = "cp-bridge";

/// The variable registry plus the bridge constraint, as seen by one copy of
/// the problem.
///
/// The model owns the primary instance. The IP backend owns one value-copy
/// per live working copy, with every handle re-resolved into that copy.
#[derive(Debug, Clone, Default)]
pub struct ProblemData {
    registry: VariableRegistry,
    bridge: Option<ConsHandle>,
    objective: IntVar,
}

impl ProblemData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut VariableRegistry {
        &mut self.registry
    }

    /// The bridge constraint, present only for branch-and-check.
    pub fn bridge(&self) -> Option<ConsHandle> {
        self.bridge
    }

    pub(crate) fn set_bridge(&mut self, bridge: Option<ConsHandle>) {
        self.bridge = bridge;
    }

    /// Variable being minimized. [`IntVar::ZERO`] until a solve starts.
    pub fn objective(&self) -> IntVar {
        self.objective
    }

    pub(crate) fn set_objective(&mut self, objective: IntVar) {
        self.objective = objective;
    }

    pub fn boolean_count(&self) -> usize {
        self.registry.bool_count()
    }

    pub fn int_count(&self) -> usize {
        self.registry.int_count()
    }

    /// # Panics
    /// Panics if `var` is out of range.
    pub fn is_positive(&self, var: BoolVar) -> bool {
        self.registry.is_positive(var)
    }

    pub fn bools(&self) -> &[BoolSlot] {
        self.registry.bools()
    }

    pub fn ints(&self) -> &[IntSlot] {
        self.registry.ints()
    }

    /// Back-reference of every boolean slot, `None` for positive slots.
    ///
    /// Two containers with equal back-references have the same slot
    /// topology regardless of their handle values.
    pub fn back_references(&self) -> Vec<Option<BoolVar>> {
        self.bools().iter().map(BoolSlot::back_reference).collect()
    }

    /// Includes the bridge handler and attaches a single bridge constraint to
    /// the problem.
    pub(crate) fn attach_bridge(&mut self, ip: &mut dyn IpBackend) -> Result<(), BackendError> {
        debug_assert!(self.bridge.is_none(), "bridge constraint attached twice");
        ip.include_handler(BRIDGE_HANDLER)?;
        let cons = ip.create_cons(BRIDGE_HANDLER, "cp")?;
        self.bridge = Some(cons);
        ip.add_cons(cons)?;
        trace!("attached bridge constraint {cons}");
        Ok(())
    }

    /// Drops every backend reference this container holds, each exactly once.
    ///
    /// Negated slots are aliases of their positive partner and are skipped.
    pub(crate) fn release(mut self, ip: &mut dyn IpBackend) -> Result<(), BackendError> {
        if let Some(cons) = self.bridge.take() {
            ip.release_cons(cons)?;
        }
        for slot in self.registry.bools().iter().filter(|s| s.is_positive()) {
            ip.release_var(slot.ip())?;
        }
        for handle in self.registry.ints().iter().filter_map(IntSlot::ip) {
            ip.release_var(handle)?;
        }
        Ok(())
    }
}
