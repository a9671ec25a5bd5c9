//! The hybrid model.

use std::fmt;
use std::mem;
use std::rc::Rc;
use std::thread;

use log::{debug, error, info};

use super::config::{Method, ModelConfig};
use super::strategy::{SolveContext, Strategies, Strategy};
use super::timer::Timer;
use super::types::{Outcome, Solution, Status};
use crate::backend::{CpBackend, DomainStore, IpBackend, MemoryIp, ObjSense, Setting};
use crate::error::ModelError;
use crate::problem::{ProblemData, TransformLifecycle};
use crate::registry::{BoolVar, IntVar};

/// Settings every IP session runs with.
///
/// The search is single-threaded and problem copies must stay in sync with
/// the registry, so the backend may neither aggregate variables away nor
/// restart presolving.
pub(crate) const SESSION_SETTINGS: [Setting; 4] = [
    Setting::MaxThreads(1),
    Setting::LpThreads(1),
    Setting::MultiAggregation(false),
    Setting::MaxRestarts(0),
];

/// A hybrid MIP/CP model.
///
/// Owns one IP session, one CP session and the primary [`ProblemData`].
/// Dropping the model releases every handle it created and frees the IP
/// session.
///
/// # Examples
///
/// ```
/// use u_hybrid::model::{Method, Model, ModelConfig, Status};
///
/// let mut model = Model::new(ModelConfig::default().with_method(Method::Mip)).unwrap();
/// let x = model.add_bool_var("x").unwrap();
/// let not_x = model.negate(x).unwrap();
/// assert_eq!(model.negate(not_x).unwrap(), x);
///
/// let cost = model.add_int_var(0, 10, "cost").unwrap();
/// assert_eq!(model.int_name(cost).unwrap(), "cost");
/// assert_eq!(model.status(), Status::Unknown);
/// ```
pub struct Model {
    config: ModelConfig,
    ip: Box<dyn IpBackend>,
    cp: Box<dyn CpBackend>,
    data: ProblemData,
    strategies: Strategies,
    outcome: Outcome,
    timer: Timer,
    run_time: f64,
}

impl Model {
    /// Creates a model on the in-memory backends.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        Self::with_backends(
            config,
            Box::new(MemoryIp::new()),
            Box::new(DomainStore::new()),
        )
    }

    /// Creates a model on the given backend sessions.
    ///
    /// On failure everything created so far is released again.
    pub fn with_backends(
        config: ModelConfig,
        ip: Box<dyn IpBackend>,
        cp: Box<dyn CpBackend>,
    ) -> Result<Self, ModelError> {
        config.validate().map_err(ModelError::Config)?;
        let mut model = Model {
            config,
            ip,
            cp,
            data: ProblemData::new(),
            strategies: Strategies::new(),
            outcome: Outcome::default(),
            timer: Timer::new(),
            run_time: 0.0,
        };
        model.initialize()?;
        info!(
            "created {} model '{}'",
            model.config.method, model.config.problem_name
        );
        Ok(model)
    }

    fn initialize(&mut self) -> Result<(), ModelError> {
        for setting in SESSION_SETTINGS {
            self.ip.apply(setting)?;
        }
        self.ip.create_problem(&self.config.problem_name)?;
        self.ip.set_objective_sense(ObjSense::Minimize)?;
        if self.config.integral_objective {
            self.ip.set_objective_integral()?;
        }

        self.data
            .registry_mut()
            .seed_constants(self.ip.as_mut(), self.cp.as_mut())?;
        if self.config.method.needs_bridge() {
            self.data.attach_bridge(self.ip.as_mut())?;
        }
        self.ip
            .set_transform_hooks(Rc::new(TransformLifecycle::new()))?;
        Ok(())
    }

    // ---- strategies ----

    /// Registers the procedure [`Model::minimize`] runs for `method`.
    pub fn set_strategy(&mut self, method: Method, strategy: impl Strategy + 'static) {
        self.strategies.set(method, Box::new(strategy));
    }

    /// Minimizes `objective` within `time_limit` seconds using the strategy
    /// registered for the model's method.
    ///
    /// # Panics
    /// Panics before touching any state if no strategy is registered for the
    /// method, `objective` is not a variable of this model, or
    /// `time_limit <= 0`.
    pub fn minimize(&mut self, objective: IntVar, time_limit: f64) {
        let method = self.config.method;
        assert!(time_limit > 0.0, "time limit {time_limit} is invalid");
        let name = match self.data.registry().int_slot(objective) {
            Ok(slot) => slot.name().to_string(),
            Err(err) => panic!("cannot minimize: {err}"),
        };
        let Some(strategy) = self.strategies.slot_mut(method).as_deref_mut() else {
            panic!("no strategy registered for method {method}");
        };

        self.data.set_objective(objective);
        self.timer.start(time_limit);
        info!("minimizing '{name}' with {method}, time limit {time_limit}s");

        let mut ctx = SolveContext {
            method,
            ip: self.ip.as_mut(),
            cp: self.cp.as_mut(),
            data: &self.data,
            timer: &self.timer,
            outcome: &mut self.outcome,
        };
        strategy.solve(&mut ctx, objective, time_limit);

        let elapsed = self.timer.cpu_time();
        self.run_time += elapsed;
        info!(
            "{method} finished after {elapsed:.3}s: {}, objective {}, bound {}",
            self.outcome.status(),
            self.outcome.objective(),
            self.outcome.bound()
        );
    }

    // ---- timer ----

    /// Starts the time budget.
    ///
    /// # Panics
    /// Panics unless `time_limit > 0`.
    pub fn start_timer(&mut self, time_limit: f64) {
        self.timer.start(time_limit);
    }

    /// Wall-clock seconds since the timer was started.
    pub fn cpu_time(&self) -> f64 {
        self.timer.cpu_time()
    }

    /// Seconds left in the budget, negative once it is exceeded.
    pub fn time_remaining(&self) -> f64 {
        self.timer.time_remaining()
    }

    // ---- variables ----

    pub fn add_bool_var(&mut self, name: impl Into<String>) -> Result<BoolVar, ModelError> {
        self.data
            .registry_mut()
            .create_boolean(self.ip.as_mut(), self.cp.as_mut(), name)
    }

    /// Integer variable with domain `[lb, ub]` in both backends.
    pub fn add_int_var(
        &mut self,
        lb: i64,
        ub: i64,
        name: impl Into<String>,
    ) -> Result<IntVar, ModelError> {
        self.data
            .registry_mut()
            .create_integer(self.ip.as_mut(), self.cp.as_mut(), lb, ub, name)
    }

    /// Integer variable that lives in the CP backend only.
    pub fn add_virtual_int_var(
        &mut self,
        lb: i64,
        ub: i64,
        name: impl Into<String>,
    ) -> Result<IntVar, ModelError> {
        self.data
            .registry_mut()
            .create_virtual_integer(self.cp.as_mut(), lb, ub, name)
    }

    pub fn negate(&mut self, var: BoolVar) -> Result<BoolVar, ModelError> {
        self.data.registry_mut().negate(self.ip.as_mut(), var)
    }

    /// The boolean standing for `var == value`.
    pub fn indicator(&mut self, var: IntVar, value: i64) -> Result<BoolVar, ModelError> {
        self.data
            .registry_mut()
            .indicator(self.ip.as_mut(), self.cp.as_mut(), var, value)
    }

    pub fn bool_name(&self, var: BoolVar) -> Result<&str, ModelError> {
        Ok(self.data.registry().bool_slot(var)?.name())
    }

    pub fn int_name(&self, var: IntVar) -> Result<&str, ModelError> {
        Ok(self.data.registry().int_slot(var)?.name())
    }

    // ---- results ----

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn status(&self) -> Status {
        self.outcome.status()
    }

    /// Objective of the best solution, `+inf` until one is found.
    pub fn objective(&self) -> f64 {
        self.outcome.objective()
    }

    /// Best lower bound, `-inf` until one is proven.
    pub fn objective_bound(&self) -> f64 {
        self.outcome.bound()
    }

    pub fn solution(&self) -> &Solution {
        self.outcome.solution()
    }

    /// Value of `var` in the best solution, `None` if there is none.
    ///
    /// Only positive slots are read from the solution: a negated slot is the
    /// negation of its partner and the constants are fixed.
    pub fn bool_value(&self, var: BoolVar) -> Option<bool> {
        let slot = self.data.registry().bool_slot(var).ok()?;
        let negated = slot.back_reference();
        let positive = negated.unwrap_or(var);
        let bools = &self.solution().bools;
        let stored = if positive == BoolVar::FALSE {
            bools.first().map(|_| false)
        } else {
            bools.get(positive.index()).copied()
        };
        stored.map(|value| value != negated.is_some())
    }

    /// Value of `var` in the best solution, `None` if there is none.
    pub fn int_value(&self, var: IntVar) -> Option<i64> {
        self.solution().ints.get(var.index()).copied()
    }

    /// Total seconds spent in [`Model::minimize`].
    pub fn run_time(&self) -> f64 {
        self.run_time
    }

    pub fn data(&self) -> &ProblemData {
        &self.data
    }

    pub fn ip(&self) -> &dyn IpBackend {
        self.ip.as_ref()
    }

    pub fn cp(&self) -> &dyn CpBackend {
        self.cp.as_ref()
    }

    /// Writes the original IP problem to the configured LP path.
    pub fn write_lp(&self) -> Result<(), ModelError> {
        self.ip.write_original_problem(&self.config.lp_path)?;
        debug!("wrote problem to {}", self.config.lp_path.display());
        Ok(())
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        let data = mem::take(&mut self.data);
        let result = data
            .release(self.ip.as_mut())
            .and_then(|()| self.ip.free());
        if let Err(err) = result {
            if thread::panicking() {
                error!("model teardown failed: {err}");
                return;
            }
            panic!("model teardown failed: {err}");
        }

        let leaked = self.ip.leaked_blocks();
        debug!("model torn down, {leaked} blocks still alive");
        if !thread::panicking() {
            debug_assert_eq!(leaked, 0, "IP session leaked {leaked} blocks");
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("data", &self.data)
            .field("strategies", &self.strategies)
            .field("outcome", &self.outcome)
            .field("run_time", &self.run_time)
            .finish_non_exhaustive()
    }
}
