//! Solver backends.
//!
//! A hybrid model lives in two independent engines at once:
//!
//! - **IP backend** ([`IpBackend`]): the LP/IP engine that runs branch-and-bound.
//!   Variables and constraints are reference counted, negations are aliases
//!   owned by their positive variable, and the engine may fork the problem
//!   into transformed copies during search, calling back into
//!   [`TransformHooks`] for each copy it creates or discards.
//! - **CP backend** ([`CpBackend`]): the domain-propagation engine. Integer
//!   variables carry explicit domains and booleans are [`Literal`]s that
//!   negate with `!`.
//!
//! # Reference backends
//!
//! [`MemoryIp`] and [`DomainStore`] are in-memory implementations of the two
//! traits. They keep the bookkeeping a native engine would keep (use counts,
//! negation links, transformed copies, leak accounting) without doing any
//! solving, and are the default backends of [`Model::new`](crate::model::Model::new).

mod cp;
mod domain;
mod ip;
mod memory;

pub use cp::{CpBackend, DomainVar, Literal};
pub use domain::DomainStore;
pub use ip::{ConsHandle, IpBackend, ObjSense, Setting, TransformHooks, VarHandle, VarKind};
pub use memory::{Ledger, MemoryIp, Settings};
