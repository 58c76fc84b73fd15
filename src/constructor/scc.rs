//! Strongly connected components with an iterative variant of Tarjan's algorithm.

/// SCC decomposition of the part of a graph reachable from a set of roots.
///
/// Components are numbered in the order in which they are completed,
/// so every component only reaches components with a smaller number.
#[derive(Debug, Clone)]
pub(crate) struct SccDecomposition {
    component: Vec<Option<usize>>,
    sizes: Vec<usize>,
    trivial: Vec<bool>,
}

impl SccDecomposition {
    pub(crate) fn new<I>(successors: &[Vec<usize>], roots: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let n = successors.len();
        let mut sccs = SccDecomposition {
            component: vec![None; n],
            sizes: Vec::new(),
            trivial: Vec::new(),
        };
        let mut discovery: Vec<Option<usize>> = vec![None; n];
        let mut lowlink = vec![0; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut call_stack: Vec<(usize, usize)> = Vec::new();
        let mut counter = 0;

        for root in roots {
            if discovery[root].is_some() {
                continue;
            }
            discovery[root] = Some(counter);
            lowlink[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;
            call_stack.push((root, 0));

            while let Some((node, pos)) = call_stack.pop() {
                if let Some(&succ) = successors[node].get(pos) {
                    call_stack.push((node, pos + 1));
                    match discovery[succ] {
                        None => {
                            discovery[succ] = Some(counter);
                            lowlink[succ] = counter;
                            counter += 1;
                            stack.push(succ);
                            on_stack[succ] = true;
                            call_stack.push((succ, 0));
                        }
                        Some(d) if on_stack[succ] => {
                            lowlink[node] = lowlink[node].min(d);
                        }
                        Some(_) => (),
                    }
                    continue;
                }
                // all successors explored
                if let Some(&(parent, _)) = call_stack.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if discovery[node] == Some(lowlink[node]) {
                    let c = sccs.sizes.len();
                    let mut size = 0;
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        sccs.component[w] = Some(c);
                        size += 1;
                        if w == node {
                            break;
                        }
                    }
                    sccs.sizes.push(size);
                    sccs.trivial
                        .push(size == 1 && !successors[node].contains(&node));
                }
            }
        }
        sccs
    }

    /// The component of the node, or `None` if it is not reachable from the roots.
    pub(crate) fn component(&self, node: usize) -> Option<usize> {
        self.component.get(node).copied().flatten()
    }

    pub(crate) fn num_components(&self) -> usize {
        self.sizes.len()
    }

    #[cfg(test)]
    fn size(&self, component: usize) -> usize {
        self.sizes[component]
    }

    /// A component is trivial if it consists of a single node without a self-loop.
    pub(crate) fn is_trivial(&self, component: usize) -> bool {
        self.trivial[component]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        // 0 -> 1 <-> 2 -> 3 -> 3, 4 -> 0 unreachable from 0
        let successors = vec![vec![1], vec![2], vec![1, 3], vec![3], vec![0]];
        let sccs = SccDecomposition::new(&successors, vec![0]);
        assert_eq!(sccs.num_components(), 3);
        assert_eq!(sccs.component(1), sccs.component(2));
        assert_eq!(sccs.component(4), None);

        let loop_scc = sccs.component(3).unwrap();
        let pair_scc = sccs.component(1).unwrap();
        let init_scc = sccs.component(0).unwrap();
        assert!(loop_scc < pair_scc && pair_scc < init_scc);
        assert_eq!(sccs.size(pair_scc), 2);
        assert!(sccs.is_trivial(init_scc));
        assert!(!sccs.is_trivial(loop_scc));
        assert!(!sccs.is_trivial(pair_scc));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let n = 100_000;
        let successors: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + 1) % n]).collect();
        let sccs = SccDecomposition::new(&successors, vec![0]);
        assert_eq!(sccs.num_components(), 1);
        assert_eq!(sccs.size(0), n);
    }
}
