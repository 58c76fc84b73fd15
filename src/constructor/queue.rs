use std::collections::VecDeque;

/// Work list of states that still need their transitions to be created.
pub(crate) trait ExplorationQueue<I> {
    fn push(&mut self, item: I);
    fn pop(&mut self) -> Option<I>;
}

pub(crate) struct BfsQueue<I> {
    queue: VecDeque<I>,
}

impl<I> BfsQueue<I> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        BfsQueue {
            queue: VecDeque::with_capacity(capacity),
        }
    }
}

impl<I> ExplorationQueue<I> for BfsQueue<I> {
    fn push(&mut self, item: I) {
        self.queue.push_back(item);
    }

    fn pop(&mut self) -> Option<I> {
        self.queue.pop_front()
    }
}

pub(crate) struct DfsQueue<I> {
    queue: Vec<I>,
}

impl<I> DfsQueue<I> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        DfsQueue {
            queue: Vec::with_capacity(capacity),
        }
    }
}

impl<I> ExplorationQueue<I> for DfsQueue<I> {
    fn push(&mut self, item: I) {
        self.queue.push(item);
    }

    fn pop(&mut self) -> Option<I> {
        self.queue.pop()
    }
}
