use super::composite::{CompositeFunction, InstructionNode};
use super::instruction::Instruction;

/// One operation over the instruction hierarchy: one required method per
/// concrete node kind, no default bodies. Adding a node kind breaks every
/// existing visitor at compile time instead of letting an incomplete
/// visitor silently no-op at run time.
///
/// Adding a new *operation* is just another impl of this trait; the tree
/// types never change for that.
pub trait InstructionVisitor {
    fn visit_instruction(&mut self, inst: &Instruction);
    fn visit_composite(&mut self, composite: &CompositeFunction);
}

impl InstructionNode {
    /// Double dispatch: the match selects the concrete node kind, the
    /// trait call selects the operation. Visiting never mutates the tree.
    ///
    /// `accept` does not recurse into composites; a visitor that wants the
    /// whole subtree either drives the recursion itself from
    /// `visit_composite` or uses [`CompositeFunction::walk`].
    pub fn accept(&self, visitor: &mut dyn InstructionVisitor) {
        match self {
            InstructionNode::Leaf(inst) => visitor.visit_instruction(inst),
            InstructionNode::Composite(comp) => visitor.visit_composite(comp),
        }
    }
}

impl CompositeFunction {
    /// Pre-order traversal driver: notifies the visitor of this composite,
    /// then visits every child, descending into nested composites. Meant
    /// for flat visitors that do not recurse themselves.
    pub fn walk(&self, visitor: &mut dyn InstructionVisitor) {
        visitor.visit_composite(self);
        for child in &self.children {
            match child {
                InstructionNode::Leaf(inst) => visitor.visit_instruction(inst),
                InstructionNode::Composite(comp) => comp.walk(visitor),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        leaves: usize,
        composites: usize,
    }

    impl InstructionVisitor for Counter {
        fn visit_instruction(&mut self, _inst: &Instruction) {
            self.leaves += 1;
        }

        fn visit_composite(&mut self, _composite: &CompositeFunction) {
            self.composites += 1;
        }
    }

    #[test]
    fn walk_visits_every_node_once() {
        let mut inner = CompositeFunction::new("inner");
        inner.add_instruction(Instruction::new("X", vec![0]));

        let mut outer = CompositeFunction::new("outer");
        outer.add_instruction(Instruction::new("H", vec![0]));
        outer.add_composite(inner);

        let mut counter = Counter::default();
        outer.walk(&mut counter);
        assert_eq!(counter.leaves, 2);
        assert_eq!(counter.composites, 2);
    }

    #[test]
    fn walked_count_matches_computed_count() {
        let mut inner = CompositeFunction::new("inner");
        inner.add_instruction(Instruction::new("X", vec![0]));
        inner.add_instruction(Instruction::new("Z", vec![1]));
        let mut outer = CompositeFunction::new("outer");
        outer.add_composite(inner);
        outer.add_instruction(Instruction::new("MEASURE", vec![0, 1]));

        let mut counter = Counter::default();
        outer.walk(&mut counter);
        assert_eq!(counter.leaves, outer.total_instructions());
    }

    #[test]
    fn accept_dispatches_on_concrete_kind() {
        let mut counter = Counter::default();
        InstructionNode::Leaf(Instruction::new("H", vec![0])).accept(&mut counter);
        InstructionNode::Composite(CompositeFunction::new("k")).accept(&mut counter);
        assert_eq!((counter.leaves, counter.composites), (1, 1));
    }
}
