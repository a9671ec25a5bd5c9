//! Fork and discard of working copies.
//!
//! When the IP backend forks the problem for a search node, every handle in
//! the container has to be re-resolved into the new copy. Positive slots and
//! the bridge constraint are transformed one by one; negated slots are
//! re-derived from their already transformed partner so the negation
//! pairing survives the copy. A fork either resolves every handle or
//! releases whatever it captured and reports the failure.

use std::thread::{self, ThreadId};

use log::{debug, error, warn};

use super::data::ProblemData;
use crate::backend::{IpBackend, TransformHooks};
use crate::error::BackendError;
use crate::registry::SlotKind;

/// The [`TransformHooks`] installed by every model.
///
/// Working copies have no defined behavior under concurrent access, so the
/// hooks insist on being called from the thread that created them.
#[derive(Debug, Clone)]
pub struct TransformLifecycle {
    owner: ThreadId,
}

impl TransformLifecycle {
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    fn check_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "problem data touched from a thread other than its owner"
        );
    }
}

impl Default for TransformLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformHooks for TransformLifecycle {
    fn on_fork(
        &self,
        ip: &mut dyn IpBackend,
        source: &ProblemData,
    ) -> Result<ProblemData, BackendError> {
        self.check_thread();
        fork(ip, source)
    }

    fn on_discard(&self, ip: &mut dyn IpBackend, data: ProblemData) -> Result<(), BackendError> {
        self.check_thread();
        discard(ip, data)
    }
}

/// How far a fork got before failing.
#[derive(Debug, Default)]
struct Progress {
    bridge: bool,
    bools: usize,
    ints: usize,
}

/// Value-copies `source` and re-resolves every handle into the copy.
pub fn fork(ip: &mut dyn IpBackend, source: &ProblemData) -> Result<ProblemData, BackendError> {
    let mut target = source.clone();
    let mut progress = Progress::default();
    match resolve(ip, &mut target, &mut progress) {
        Ok(()) => {
            debug!(
                "forked problem data: {} booleans, {} integers, bridge: {}",
                target.boolean_count(),
                target.int_count(),
                target.bridge().is_some()
            );
            Ok(target)
        }
        Err(err) => {
            warn!("fork failed ({err}), rolling back {progress:?}");
            rollback(ip, &target, &progress);
            Err(err)
        }
    }
}

/// Releases the handles of a working copy and drops it.
pub fn discard(ip: &mut dyn IpBackend, data: ProblemData) -> Result<(), BackendError> {
    let (bools, ints) = (data.boolean_count(), data.int_count());
    data.release(ip)?;
    debug!("discarded problem data: {bools} booleans, {ints} integers");
    Ok(())
}

fn resolve(
    ip: &mut dyn IpBackend,
    target: &mut ProblemData,
    progress: &mut Progress,
) -> Result<(), BackendError> {
    if let Some(cons) = target.bridge() {
        target.set_bridge(Some(ip.transform_cons(cons)?));
        progress.bridge = true;
    }

    let bools = target.registry_mut().bools_mut();
    for idx in 0..bools.len() {
        let kind = bools[idx].kind;
        match kind {
            SlotKind::Positive { .. } => {
                bools[idx].ip = ip.transform_var(bools[idx].ip)?;
            }
            SlotKind::Negated { positive } => {
                debug_assert!(positive.index() < idx);
                bools[idx].ip = ip.negated_var(bools[positive.index()].ip)?;
            }
        }
        progress.bools = idx + 1;
    }

    for (idx, slot) in target.registry_mut().ints_mut().iter_mut().enumerate() {
        if let Some(handle) = slot.ip {
            slot.ip = Some(ip.transform_var(handle)?);
        }
        progress.ints = idx + 1;
    }
    Ok(())
}

fn rollback(ip: &mut dyn IpBackend, target: &ProblemData, progress: &Progress) {
    let report = |result: Result<(), BackendError>| {
        if let Err(err) = result {
            error!("release during fork rollback failed: {err}");
        }
    };
    if progress.bridge {
        if let Some(cons) = target.bridge() {
            report(ip.release_cons(cons));
        }
    }
    for slot in target.bools()[..progress.bools]
        .iter()
        .filter(|s| s.is_positive())
    {
        report(ip.release_var(slot.ip()));
    }
    for handle in target.ints()[..progress.ints].iter().filter_map(|s| s.ip()) {
        report(ip.release_var(handle));
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::backend::{DomainStore, MemoryIp};
    use crate::registry::BoolVar;

    struct Fixture {
        ip: MemoryIp,
        data: ProblemData,
    }

    fn fixture(with_bridge: bool) -> Fixture {
        let mut ip = MemoryIp::new();
        ip.create_problem("test").unwrap();
        let mut cp = DomainStore::new();
        let mut data = ProblemData::new();
        let reg = data.registry_mut();
        reg.seed_constants(&mut ip, &mut cp).unwrap();
        let x = reg.create_boolean(&mut ip, &mut cp, "x").unwrap();
        let y = reg.create_boolean(&mut ip, &mut cp, "y").unwrap();
        reg.negate(&mut ip, y).unwrap();
        reg.negate(&mut ip, x).unwrap();
        reg.create_integer(&mut ip, &mut cp, 0, 5, "z").unwrap();
        reg.create_virtual_integer(&mut cp, 1, 2, "v").unwrap();
        if with_bridge {
            data.attach_bridge(&mut ip).unwrap();
        }
        ip.set_transform_hooks(Rc::new(TransformLifecycle::new()))
            .unwrap();
        Fixture { ip, data }
    }

    #[test]
    fn test_fork_preserves_topology() {
        let Fixture { mut ip, data } = fixture(true);
        let copy = fork(&mut ip, &data).unwrap();

        assert_eq!(copy.back_references(), data.back_references());
        assert_eq!(copy.boolean_count(), data.boolean_count());
        assert_eq!(copy.int_count(), data.int_count());
        for (orig, new) in data.bools().iter().zip(copy.bools()) {
            assert_ne!(orig.ip(), new.ip());
            assert_eq!(orig.cp(), new.cp());
            assert!(ip.is_transformed(new.ip()));
        }
        assert_ne!(copy.bridge(), data.bridge());
        assert!(copy.ints()[1].ip().is_some());
        assert!(copy.ints()[2].ip().is_none());

        discard(&mut ip, copy).unwrap();
    }

    #[test]
    fn test_fork_rederives_negations() {
        let Fixture { mut ip, data } = fixture(false);
        let copy = fork(&mut ip, &data).unwrap();
        for (idx, slot) in copy.bools().iter().enumerate() {
            if let Some(positive) = slot.back_reference() {
                assert!(positive.index() < idx);
                let partner = copy.bools()[positive.index()].ip();
                assert_eq!(ip.negated_var(partner).unwrap(), slot.ip());
            }
        }
        assert_eq!(copy.bools()[1].back_reference(), Some(BoolVar::FALSE));
        discard(&mut ip, copy).unwrap();
    }

    #[test]
    fn test_discard_releases_once() {
        let Fixture { mut ip, data } = fixture(true);
        let ledger = ip.ledger();
        let copy = fork(&mut ip, &data).unwrap();
        discard(&mut ip, copy).unwrap();

        // positive booleans: false, x, y; integers with an IP handle: zero, z
        assert_eq!(ledger.var_releases(), 5);
        assert_eq!(ledger.cons_releases(), 1);

        data.release(&mut ip).unwrap();
        ip.free().unwrap();
        assert_eq!(ip.leaked_blocks(), 0);
    }

    #[test]
    fn test_nested_copies_through_backend() {
        let Fixture { mut ip, data } = fixture(true);
        assert_eq!(ip.transform_problem(&data).unwrap(), 1);
        let first = ip.transformed_data().unwrap().bools()[2].ip();
        assert_eq!(ip.transform_problem(&data).unwrap(), 2);
        let second = ip.transformed_data().unwrap().bools()[2].ip();
        assert_ne!(first, second);
        assert_eq!(
            ip.transformed_data().unwrap().back_references(),
            data.back_references()
        );

        assert!(ip.free_transformed().unwrap());
        assert_eq!(ip.transformed_depth(), 1);
        data.release(&mut ip).unwrap();
        ip.free().unwrap();
        assert_eq!(ip.transformed_depth(), 0);
        assert_eq!(ip.leaked_blocks(), 0);
    }

    #[test]
    fn test_failed_fork_rolls_back() {
        for budget in 0..8 {
            let Fixture { mut ip, data } = fixture(true);
            let blocks = ip.leaked_blocks();
            ip.set_allocation_limit(Some(budget));
            assert!(
                fork(&mut ip, &data).is_err(),
                "fork with a budget of {budget} blocks should fail"
            );
            assert_eq!(ip.leaked_blocks(), blocks, "budget {budget}");

            ip.set_allocation_limit(None);
            data.release(&mut ip).unwrap();
            ip.free().unwrap();
            assert_eq!(ip.leaked_blocks(), 0, "budget {budget}");
        }
    }

    #[test]
    fn test_hooks_reject_foreign_thread() {
        let hooks = TransformLifecycle::new();
        let result = std::thread::spawn(move || {
            let mut ip = MemoryIp::new();
            let _ = hooks.on_fork(&mut ip, &ProblemData::default());
        })
        .join();
        assert!(result.is_err());
    }
}
