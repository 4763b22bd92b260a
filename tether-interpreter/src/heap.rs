//! Handle table backing every interpreter value.

use std::collections::HashSet;

use crate::sexp::{Node, Object, Sexp};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Slot table with generation-checked handles and a mark & sweep collector.
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    allocations: u64,
}

impl Heap {
    pub fn new() -> Self {
        let mut heap = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            allocations: 0,
        };

        // Fixed slots for the singletons
        let null = heap.alloc(Node::new(Object::Null));
        let missing = heap.alloc(Node::new(Object::MissingArg));
        debug_assert_eq!(null, Sexp::NULL);
        debug_assert_eq!(missing, Sexp::MISSING_ARG);

        heap
    }

    pub fn alloc(&mut self, node: Node) -> Sexp {
        self.live += 1;
        self.allocations += 1;

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                Sexp {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                Sexp {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub fn get(&self, sexp: Sexp) -> Option<&Node> {
        self.slots
            .get(sexp.index as usize)
            .filter(|slot| slot.generation == sexp.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, sexp: Sexp) -> Option<&mut Node> {
        self.slots
            .get_mut(sexp.index as usize)
            .filter(|slot| slot.generation == sexp.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, sexp: Sexp) -> bool {
        self.get(sexp).is_some()
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Free every object not reachable from `roots`. Returns the number freed.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = Sexp>) -> usize {
        let mut marked: HashSet<u32> = HashSet::new();
        let mut pending: Vec<Sexp> = roots.into_iter().collect();
        pending.push(Sexp::NULL);
        pending.push(Sexp::MISSING_ARG);

        while let Some(sexp) = pending.pop() {
            let Some(node) = self.get(sexp) else {
                continue;
            };
            if marked.insert(sexp.index) {
                node.object.children(&mut pending);
            }
        }

        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.is_some() && !marked.contains(&(index as u32)) {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }

        self.live -= freed;
        freed
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
