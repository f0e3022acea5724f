#![forbid(unsafe_code)]

//! The collaborator bundle bindings run against.

use std::cell::RefCell;
use std::rc::Rc;

use keyloom_state::Scheduler;
use keyloom_tree::{Applicator, NodeTree};

/// Everything a binding needs to do its work: the node tree, the
/// attribute/style applicator, and the cooperative scheduler for deferred
/// unit swaps. Cheap clone; all parts are shared handles.
#[derive(Clone)]
pub struct Host {
    tree: Rc<RefCell<dyn NodeTree>>,
    applicator: Rc<RefCell<dyn Applicator>>,
    scheduler: Scheduler,
}

impl Host {
    /// Bundle a tree, an applicator, and a scheduler.
    #[must_use]
    pub fn new(
        tree: Rc<RefCell<dyn NodeTree>>,
        applicator: Rc<RefCell<dyn Applicator>>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            tree,
            applicator,
            scheduler,
        }
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &Rc<RefCell<dyn NodeTree>> {
        &self.tree
    }

    /// The attribute/style applicator.
    #[must_use]
    pub fn applicator(&self) -> &Rc<RefCell<dyn Applicator>> {
        &self.applicator
    }

    /// The cooperative scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("pending_tasks", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}
