//! In-memory IP backend.
//!
//! Tracks exactly what a native LP/IP session tracks about the objects the
//! model layer hands it: use counts, negation aliases, problem membership,
//! transformed working copies and the blocks still alive. It never solves
//! anything.

use std::cell::Cell;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use log::{debug, trace};

use super::ip::{ConsHandle, IpBackend, ObjSense, Setting, TransformHooks, VarHandle, VarKind};
use crate::error::BackendError;
use crate::problem::ProblemData;

/// Session settings of a [`MemoryIp`].
///
/// Defaults are those of an untuned engine: parallel, with multi-aggregation
/// and unlimited presolve restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub max_threads: u32,
    pub lp_threads: u32,
    pub multi_aggregation: bool,
    pub max_restarts: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_threads: 8,
            lp_threads: 0,
            multi_aggregation: true,
            max_restarts: -1,
        }
    }
}

/// Counters of the calls a [`MemoryIp`] received.
///
/// Shared through an `Rc` so tests can keep observing a backend after it was
/// moved into a model.
#[derive(Debug, Default)]
pub struct Ledger {
    var_releases: Cell<usize>,
    cons_releases: Cell<usize>,
    forks: Cell<usize>,
    discards: Cell<usize>,
}

impl Ledger {
    /// Number of `release_var` calls.
    pub fn var_releases(&self) -> usize {
        self.var_releases.get()
    }

    /// Number of `release_cons` calls.
    pub fn cons_releases(&self) -> usize {
        self.cons_releases.get()
    }

    /// Number of working copies created.
    pub fn forks(&self) -> usize {
        self.forks.get()
    }

    /// Number of working copies discarded.
    pub fn discards(&self) -> usize {
        self.discards.get()
    }

    fn bump(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Original,
    Transformed,
}

#[derive(Debug, Clone, Copy)]
enum VarLink {
    Positive { negation: Option<VarHandle> },
    Negation { of: VarHandle },
}

#[derive(Debug, Clone)]
struct VarEntry {
    name: String,
    lb: f64,
    ub: f64,
    obj: f64,
    kind: VarKind,
    space: Space,
    uses: u32,
    link: VarLink,
}

#[derive(Debug, Clone)]
struct ConsEntry {
    name: String,
    handler: String,
    uses: u32,
}

#[derive(Debug)]
struct Problem {
    name: String,
    sense: ObjSense,
    integral: bool,
    vars: Vec<VarHandle>,
    conss: Vec<ConsHandle>,
}

/// In-memory [`IpBackend`].
///
/// Slots of freed variables and constraints are reused by later
/// allocations, so a handle must not be used once its last reference was
/// released.
///
/// # Examples
///
/// ```
/// use u_hybrid::backend::{IpBackend, MemoryIp, VarKind};
///
/// let mut ip = MemoryIp::new();
/// ip.create_problem("demo").unwrap();
/// let x = ip.create_var("x", 0.0, 1.0, 0.0, VarKind::Binary).unwrap();
/// ip.add_var(x).unwrap();
/// let not_x = ip.negated_var(x).unwrap();
/// assert_eq!(ip.negated_var(not_x).unwrap(), x);
///
/// ip.release_var(x).unwrap();
/// ip.free().unwrap();
/// assert_eq!(ip.leaked_blocks(), 0);
/// ```
pub struct MemoryIp {
    vars: Vec<Option<VarEntry>>,
    conss: Vec<Option<ConsEntry>>,
    free_vars: Vec<u32>,
    free_conss: Vec<u32>,
    settings: Settings,
    problem: Option<Problem>,
    handlers: Vec<String>,
    hooks: Option<Rc<dyn TransformHooks>>,
    copies: Vec<ProblemData>,
    ledger: Rc<Ledger>,
    allocation_limit: Option<usize>,
    allocations: usize,
}

impl MemoryIp {
    pub fn new() -> Self {
        Self {
            vars: Vec::new(),
            conss: Vec::new(),
            free_vars: Vec::new(),
            free_conss: Vec::new(),
            settings: Settings::default(),
            problem: None,
            handlers: Vec::new(),
            hooks: None,
            copies: Vec::new(),
            ledger: Rc::new(Ledger::default()),
            allocation_limit: None,
            allocations: 0,
        }
    }

    /// Makes every allocation after the first `limit` ones fail.
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = Some(limit);
        self
    }

    /// Changes the allocation limit of a live session. `None` lifts it.
    pub fn set_allocation_limit(&mut self, limit: Option<usize>) {
        self.allocation_limit = limit.map(|l| self.allocations + l);
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn ledger(&self) -> Rc<Ledger> {
        Rc::clone(&self.ledger)
    }

    /// Whether a constraint handler with this name was included.
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.iter().any(|h| h == name)
    }

    /// Current use count of a variable, `None` once it has been freed.
    pub fn var_uses(&self, var: VarHandle) -> Option<u32> {
        self.var_entry(var).ok().map(|e| e.uses)
    }

    /// Current use count of a constraint, `None` once it has been freed.
    pub fn cons_uses(&self, cons: ConsHandle) -> Option<u32> {
        self.cons_entry(cons).ok().map(|e| e.uses)
    }

    /// Whether `var` lives in a transformed working copy.
    pub fn is_transformed(&self, var: VarHandle) -> bool {
        self.var_entry(var)
            .map(|e| e.space == Space::Transformed)
            .unwrap_or(false)
    }

    /// Number of variables and constraints the problem holds.
    pub fn problem_size(&self) -> (usize, usize) {
        self.problem
            .as_ref()
            .map(|p| (p.vars.len(), p.conss.len()))
            .unwrap_or((0, 0))
    }

    fn allocate(&mut self, what: &str) -> Result<(), BackendError> {
        if let Some(limit) = self.allocation_limit {
            if self.allocations >= limit {
                return Err(BackendError::Allocation(format!(
                    "{what}: limit of {limit} blocks reached"
                )));
            }
        }
        self.allocations += 1;
        Ok(())
    }

    fn problem_mut(&mut self) -> Result<&mut Problem, BackendError> {
        self.problem.as_mut().ok_or(BackendError::NoProblem)
    }

    fn var_entry(&self, var: VarHandle) -> Result<&VarEntry, BackendError> {
        self.vars
            .get(var.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(BackendError::InvalidVar(var.0))
    }

    fn var_entry_mut(&mut self, var: VarHandle) -> Result<&mut VarEntry, BackendError> {
        self.vars
            .get_mut(var.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(BackendError::InvalidVar(var.0))
    }

    fn cons_entry(&self, cons: ConsHandle) -> Result<&ConsEntry, BackendError> {
        self.conss
            .get(cons.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(BackendError::InvalidCons(cons.0))
    }

    fn cons_entry_mut(&mut self, cons: ConsHandle) -> Result<&mut ConsEntry, BackendError> {
        self.conss
            .get_mut(cons.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(BackendError::InvalidCons(cons.0))
    }

    fn push_var(&mut self, entry: VarEntry) -> VarHandle {
        if let Some(idx) = self.free_vars.pop() {
            self.vars[idx as usize] = Some(entry);
            return VarHandle(idx);
        }
        let handle = VarHandle(self.vars.len() as u32);
        self.vars.push(Some(entry));
        handle
    }

    fn push_cons(&mut self, entry: ConsEntry) -> ConsHandle {
        if let Some(idx) = self.free_conss.pop() {
            self.conss[idx as usize] = Some(entry);
            return ConsHandle(idx);
        }
        let handle = ConsHandle(self.conss.len() as u32);
        self.conss.push(Some(entry));
        handle
    }

    fn unref_var(&mut self, var: VarHandle) -> Result<(), BackendError> {
        let entry = self.var_entry_mut(var)?;
        let negation = match entry.link {
            VarLink::Negation { .. } => return Err(BackendError::AliasRelease(var.0)),
            VarLink::Positive { negation } => negation,
        };
        entry.uses -= 1;
        if entry.uses == 0 {
            trace!("free var {var} ({})", entry.name);
            self.vars[var.0 as usize] = None;
            self.free_vars.push(var.0);
            if let Some(neg) = negation {
                self.vars[neg.0 as usize] = None;
                self.free_vars.push(neg.0);
            }
        }
        Ok(())
    }

    fn unref_cons(&mut self, cons: ConsHandle) -> Result<(), BackendError> {
        let entry = self.cons_entry_mut(cons)?;
        entry.uses -= 1;
        if entry.uses == 0 {
            trace!("free cons {cons} ({})", entry.name);
            self.conss[cons.0 as usize] = None;
            self.free_conss.push(cons.0);
        }
        Ok(())
    }

    fn write_lp(&self, problem: &Problem, out: &mut impl Write) -> Result<(), BackendError> {
        writeln!(out, "\\ Problem name: {}", problem.name)?;
        if problem.integral {
            writeln!(out, "\\ Objective is integral")?;
        }
        match problem.sense {
            ObjSense::Minimize => writeln!(out, "Minimize")?,
            ObjSense::Maximize => writeln!(out, "Maximize")?,
        }
        let mut terms = Vec::new();
        for &var in &problem.vars {
            let entry = self.var_entry(var)?;
            if entry.obj != 0.0 {
                terms.push(format!("{:+} {}", entry.obj, lp_name(&entry.name, var)));
            }
        }
        if terms.is_empty() {
            writeln!(out, " obj: 0")?;
        } else {
            writeln!(out, " obj: {}", terms.join(" "))?;
        }

        writeln!(out, "Subject To")?;
        for &cons in &problem.conss {
            let entry = self.cons_entry(cons)?;
            writeln!(out, "\\ {} [{}] has no linear form", entry.name, entry.handler)?;
        }

        writeln!(out, "Bounds")?;
        let mut binaries = Vec::new();
        let mut generals = Vec::new();
        for &var in &problem.vars {
            let entry = self.var_entry(var)?;
            let name = lp_name(&entry.name, var);
            if entry.lb == entry.ub {
                writeln!(out, " {name} = {}", entry.lb)?;
            } else {
                writeln!(out, " {} <= {name} <= {}", entry.lb, entry.ub)?;
            }
            match entry.kind {
                VarKind::Binary => binaries.push(name),
                VarKind::Integer => generals.push(name),
                VarKind::Continuous => {}
            }
        }
        if !binaries.is_empty() {
            writeln!(out, "Binaries")?;
            writeln!(out, " {}", binaries.join(" "))?;
        }
        if !generals.is_empty() {
            writeln!(out, "Generals")?;
            writeln!(out, " {}", generals.join(" "))?;
        }
        writeln!(out, "End")?;
        Ok(())
    }
}

impl Default for MemoryIp {
    fn default() -> Self {
        Self::new()
    }
}

/// LP-safe variable name, made unique by the handle index.
fn lp_name(name: &str, var: VarHandle) -> String {
    let clean: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{clean}_{}", var.0)
}

impl IpBackend for MemoryIp {
    fn apply(&mut self, setting: Setting) -> Result<(), BackendError> {
        match setting {
            Setting::MaxThreads(0) => {
                return Err(BackendError::InvalidSetting("max threads must be positive".into()))
            }
            Setting::MaxThreads(n) => self.settings.max_threads = n,
            Setting::LpThreads(n) => self.settings.lp_threads = n,
            Setting::MultiAggregation(on) => self.settings.multi_aggregation = on,
            Setting::MaxRestarts(n) => self.settings.max_restarts = n,
        }
        trace!("apply({setting:?})");
        Ok(())
    }

    fn create_problem(&mut self, name: &str) -> Result<(), BackendError> {
        if self.problem.is_some() {
            return Err(BackendError::ProblemExists);
        }
        self.problem = Some(Problem {
            name: name.to_string(),
            sense: ObjSense::Minimize,
            integral: false,
            vars: Vec::new(),
            conss: Vec::new(),
        });
        Ok(())
    }

    fn set_objective_sense(&mut self, sense: ObjSense) -> Result<(), BackendError> {
        self.problem_mut()?.sense = sense;
        Ok(())
    }

    fn set_objective_integral(&mut self) -> Result<(), BackendError> {
        self.problem_mut()?.integral = true;
        Ok(())
    }

    fn create_var(
        &mut self,
        name: &str,
        lb: f64,
        ub: f64,
        obj: f64,
        kind: VarKind,
    ) -> Result<VarHandle, BackendError> {
        self.problem_mut()?;
        self.allocate(name)?;
        let var = self.push_var(VarEntry {
            name: name.to_string(),
            lb,
            ub,
            obj,
            kind,
            space: Space::Original,
            uses: 1,
            link: VarLink::Positive { negation: None },
        });
        trace!("create_var({name}) -> {var}");
        Ok(var)
    }

    fn add_var(&mut self, var: VarHandle) -> Result<(), BackendError> {
        let entry = self.var_entry_mut(var)?;
        if matches!(entry.link, VarLink::Negation { .. }) {
            return Err(BackendError::InvalidVar(var.0));
        }
        entry.uses += 1;
        self.problem_mut()?.vars.push(var);
        Ok(())
    }

    fn negated_var(&mut self, var: VarHandle) -> Result<VarHandle, BackendError> {
        let entry = self.var_entry(var)?;
        let link = entry.link;
        match link {
            VarLink::Negation { of } => Ok(of),
            VarLink::Positive {
                negation: Some(neg),
            } => Ok(neg),
            VarLink::Positive { negation: None } => {
                let negated = VarEntry {
                    name: format!("~{}", entry.name),
                    lb: 1.0 - entry.ub,
                    ub: 1.0 - entry.lb,
                    obj: -entry.obj,
                    kind: entry.kind,
                    space: entry.space,
                    uses: 0,
                    link: VarLink::Negation { of: var },
                };
                self.allocate(&negated.name)?;
                let neg = self.push_var(negated);
                self.var_entry_mut(var)?.link = VarLink::Positive {
                    negation: Some(neg),
                };
                trace!("negated_var({var}) -> {neg}");
                Ok(neg)
            }
        }
    }

    fn transform_var(&mut self, var: VarHandle) -> Result<VarHandle, BackendError> {
        let entry = self.var_entry(var)?;
        let link = entry.link;
        if let VarLink::Negation { of } = link {
            let positive = self.transform_var(of)?;
            return self.negated_var(positive);
        }
        let copy = VarEntry {
            space: Space::Transformed,
            uses: 1,
            link: VarLink::Positive { negation: None },
            ..entry.clone()
        };
        self.allocate(&copy.name)?;
        let target = self.push_var(copy);
        trace!("transform_var({var}) -> {target}");
        Ok(target)
    }

    fn release_var(&mut self, var: VarHandle) -> Result<(), BackendError> {
        Ledger::bump(&self.ledger.var_releases);
        self.unref_var(var)
    }

    fn include_handler(&mut self, name: &str) -> Result<(), BackendError> {
        if self.has_handler(name) {
            return Err(BackendError::DuplicateHandler(name.to_string()));
        }
        self.handlers.push(name.to_string());
        Ok(())
    }

    fn create_cons(&mut self, handler: &str, name: &str) -> Result<ConsHandle, BackendError> {
        if !self.has_handler(handler) {
            return Err(BackendError::UnknownHandler(handler.to_string()));
        }
        self.problem_mut()?;
        self.allocate(name)?;
        let cons = self.push_cons(ConsEntry {
            name: name.to_string(),
            handler: handler.to_string(),
            uses: 1,
        });
        trace!("create_cons({handler}, {name}) -> {cons}");
        Ok(cons)
    }

    fn add_cons(&mut self, cons: ConsHandle) -> Result<(), BackendError> {
        self.cons_entry_mut(cons)?.uses += 1;
        self.problem_mut()?.conss.push(cons);
        Ok(())
    }

    fn transform_cons(&mut self, cons: ConsHandle) -> Result<ConsHandle, BackendError> {
        let copy = ConsEntry {
            uses: 1,
            ..self.cons_entry(cons)?.clone()
        };
        self.allocate(&copy.name)?;
        let target = self.push_cons(copy);
        trace!("transform_cons({cons}) -> {target}");
        Ok(target)
    }

    fn release_cons(&mut self, cons: ConsHandle) -> Result<(), BackendError> {
        Ledger::bump(&self.ledger.cons_releases);
        self.unref_cons(cons)
    }

    fn set_transform_hooks(&mut self, hooks: Rc<dyn TransformHooks>) -> Result<(), BackendError> {
        self.hooks = Some(hooks);
        Ok(())
    }

    fn transform_problem(&mut self, source: &ProblemData) -> Result<usize, BackendError> {
        self.problem_mut()?;
        let hooks = self.hooks.clone().ok_or(BackendError::NoHooks)?;
        let parent = self.copies.last().cloned();
        let copy = hooks.on_fork(self, parent.as_ref().unwrap_or(source))?;
        self.copies.push(copy);
        Ledger::bump(&self.ledger.forks);
        debug!("transformed problem, {} live copies", self.copies.len());
        Ok(self.copies.len())
    }

    fn free_transformed(&mut self) -> Result<bool, BackendError> {
        let Some(hooks) = self.hooks.clone() else {
            return Ok(false);
        };
        let Some(copy) = self.copies.pop() else {
            return Ok(false);
        };
        hooks.on_discard(self, copy)?;
        Ledger::bump(&self.ledger.discards);
        debug!("freed transformed problem, {} live copies", self.copies.len());
        Ok(true)
    }

    fn transformed_depth(&self) -> usize {
        self.copies.len()
    }

    fn transformed_data(&self) -> Option<&ProblemData> {
        self.copies.last()
    }

    fn write_original_problem(&self, path: &Path) -> Result<(), BackendError> {
        let problem = self.problem.as_ref().ok_or(BackendError::NoProblem)?;
        let mut out = BufWriter::new(File::create(path)?);
        self.write_lp(problem, &mut out)?;
        out.flush()?;
        debug!("wrote problem '{}' to {}", problem.name, path.display());
        Ok(())
    }

    fn free(&mut self) -> Result<(), BackendError> {
        while self.free_transformed()? {}
        if let Some(problem) = self.problem.take() {
            for cons in problem.conss {
                self.unref_cons(cons)?;
            }
            for var in problem.vars {
                self.unref_var(var)?;
            }
        }
        self.handlers.clear();
        self.hooks = None;
        debug!("freed session, {} blocks alive", self.leaked_blocks());
        Ok(())
    }

    fn leaked_blocks(&self) -> usize {
        let vars = self.vars.iter().flatten().count();
        let conss = self.conss.iter().flatten().count();
        vars + conss + self.copies.len() + usize::from(self.problem.is_some())
    }
}
