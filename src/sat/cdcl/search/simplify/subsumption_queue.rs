use std::collections::vec_deque::VecDeque;
use crate::sat::formula::Lit;
use crate::sat::formula::assignment::Assignment;
use crate::sat::formula::clause::*;


/// Work queue of the backward subsumption pass. Jobs are either whole
/// clauses or ground-level units that appeared since the last run.
pub struct SubsumptionQueue {
    queue: VecDeque<ClauseRef>,
    bwdsub_assigns: usize,
}

pub enum SubsumptionJob {
    Clause(ClauseRef),
    Assign(Lit),
}

impl SubsumptionQueue {
    pub fn new() -> Self {
        SubsumptionQueue {
            queue: VecDeque::new(),
            bwdsub_assigns: 0,
        }
    }

    pub fn pop(&mut self, ca: &ClauseAllocator, assigns: &Assignment) -> Option<SubsumptionJob> {
        loop {
            match self.queue.pop_front() {
                Some(cr) => {
                    if !ca.is_deleted(cr) {
                        return Some(SubsumptionJob::Clause(cr));
                    }
                }

                None if self.bwdsub_assigns < assigns.number_of_ground_assigns() => {
                    let lit = assigns.assign_at(self.bwdsub_assigns);
                    self.bwdsub_assigns += 1;
                    return Some(SubsumptionJob::Assign(lit));
                }

                None => {
                    return None;
                }
            }
        }
    }

    pub fn push(&mut self, cr: ClauseRef) {
        self.queue.push_back(cr);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn assigns_left(&self, assigns: &Assignment) -> usize {
        assigns.number_of_ground_assigns() - self.bwdsub_assigns
    }

    pub fn clear(&mut self, assigns: &Assignment) {
        self.queue.clear();
        self.bwdsub_assigns = assigns.number_of_ground_assigns();
    }

    // Temporarily flips the touched marks of queued clauses so that the
    // touched-variable sweep does not enqueue them a second time.
    pub fn remark_touched(&mut self, ca: &mut ClauseAllocator, src: bool) {
        for &cr in self.queue.iter() {
            let c = ca.edit(cr);
            if c.is_touched() == src {
                c.set_touched(!src);
            }
        }
    }

    pub fn gc(&mut self, gc: &mut ClauseGC) {
        let mut rewritten = VecDeque::with_capacity(self.queue.len());
        for &cr in self.queue.iter() {
            if let Some(new_cr) = gc.relocate(cr) {
                rewritten.push_back(new_cr);
            }
        }
        self.queue = rewritten;
    }
}
