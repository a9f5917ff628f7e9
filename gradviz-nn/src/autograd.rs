use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::tensor::{Tensor, TensorData};

/// One step of a tensor's backward-operation chain.
///
/// The chain is the native, deterministic record of which computation
/// produced a tensor. A step is either an interior operation linking to the
/// steps that produced its inputs, or an accumulate terminal wrapping the
/// leaf tensor a chain bottoms out on. Walking `upstream` links recovers the
/// whole history of a tensor; no gradient values are ever computed here.
#[derive(Debug)]
pub struct GradFn {
    name: &'static str,
    kind: StepKind,
}

#[derive(Debug)]
enum StepKind {
    Op {
        /// Links to the steps of this operation's inputs, in input
        /// enumeration order. `None` for untracked inputs.
        upstream: Vec<Option<Rc<GradFn>>>,
    },
    Accumulate {
        /// The originating leaf tensor. Weak so a chain never keeps a
        /// tensor alive on its own.
        source: Weak<RefCell<TensorData>>,
    },
}

impl GradFn {
    pub(crate) fn op(name: &'static str, upstream: Vec<Option<Rc<GradFn>>>) -> GradFn {
        GradFn {
            name,
            kind: StepKind::Op { upstream },
        }
    }

    fn accumulate(source: Weak<RefCell<TensorData>>) -> GradFn {
        GradFn {
            name: "AccumulateGrad",
            kind: StepKind::Accumulate { source },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True for a pass-through terminal that merely wraps a leaf tensor.
    pub fn is_accumulate(&self) -> bool {
        matches!(self.kind, StepKind::Accumulate { .. })
    }

    /// Upstream links of an interior step; empty for terminals.
    pub fn upstream(&self) -> &[Option<Rc<GradFn>>] {
        match &self.kind {
            StepKind::Op { upstream } => upstream,
            StepKind::Accumulate { .. } => &[],
        }
    }

    /// The leaf tensor an accumulate terminal wraps, if it is still alive.
    pub fn source(&self) -> Option<Tensor> {
        match &self.kind {
            StepKind::Accumulate { source } => source.upgrade().map(Tensor),
            StepKind::Op { .. } => None,
        }
    }
}

/// The identity of a chain step: the address of its shared allocation.
pub fn step_id(step: &Rc<GradFn>) -> usize {
    Rc::as_ptr(step) as usize
}

impl Tensor {
    /// Returns this tensor's accumulate terminal, creating and caching it on
    /// first use so repeated consumers link to the same step.
    pub(crate) fn accumulator(&self) -> Rc<GradFn> {
        let mut td = self.0.borrow_mut();
        if let Some(acc) = &td.accumulator {
            return acc.clone();
        }
        let acc = Rc::new(GradFn::accumulate(Rc::downgrade(&self.0)));
        td.accumulator = Some(acc.clone());
        acc
    }

    /// The chain step an operation consuming this tensor should link to:
    /// the producing step if there is one, the accumulate terminal for a
    /// tracked leaf, nothing for an untracked tensor.
    pub(crate) fn history_step(&self) -> Option<Rc<GradFn>> {
        if let Some(gf) = self.0.borrow().grad_fn.clone() {
            return Some(gf);
        }
        if self.requires_grad() {
            return Some(self.accumulator());
        }
        None
    }
}

/// Wires the chain step for a freshly computed operation output. A step is
/// attached only when at least one input is tracked; the output then starts
/// requiring gradients as well.
pub(crate) fn record_step(out: &Tensor, name: &'static str, inputs: &[&Tensor]) {
    if !inputs.iter().any(|t| t.is_tracked()) {
        return;
    }
    let upstream = inputs.iter().map(|t| t.history_step()).collect();
    let mut td = out.0.borrow_mut();
    td.requires_grad = true;
    td.grad_fn = Some(Rc::new(GradFn::op(name, upstream)));
}
