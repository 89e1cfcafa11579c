use serde::{Deserialize, Serialize};

use super::IrError;
use super::instruction::Instruction;

/// A node of the instruction tree: either a leaf [`Instruction`] or a
/// nested [`CompositeFunction`]. Nodes are owned by exactly one parent, so
/// the tree is acyclic by construction; anything that needs to relate two
/// nodes does so through bit indices, never through node links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionNode {
    Leaf(Instruction),
    Composite(CompositeFunction),
}

impl InstructionNode {
    pub fn name(&self) -> &str {
        match self {
            InstructionNode::Leaf(inst) => &inst.name,
            InstructionNode::Composite(comp) => &comp.name,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, InstructionNode::Composite(_))
    }

    /// Composites are always enabled; only leaves carry the soft-delete
    /// flag.
    pub fn is_enabled(&self) -> bool {
        match self {
            InstructionNode::Leaf(inst) => inst.enabled,
            InstructionNode::Composite(_) => true,
        }
    }
}

impl From<Instruction> for InstructionNode {
    fn from(inst: Instruction) -> Self {
        InstructionNode::Leaf(inst)
    }
}

impl From<CompositeFunction> for InstructionNode {
    fn from(comp: CompositeFunction) -> Self {
        InstructionNode::Composite(comp)
    }
}

/// A kernel: a named, ordered tree of instructions representing one
/// executable program unit. Counts are always computed from the children
/// list, never cached, so they cannot drift under mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompositeFunction {
    pub name: String,
    #[serde(default)]
    pub children: Vec<InstructionNode>,
    /// Kernel-level free symbolic variables, bound at execution time.
    #[serde(default)]
    pub variables: Vec<String>,
}

impl CompositeFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, inst: Instruction) {
        self.children.push(InstructionNode::Leaf(inst));
    }

    pub fn add_composite(&mut self, comp: CompositeFunction) {
        self.children.push(InstructionNode::Composite(comp));
    }

    pub fn add_variable(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.variables.contains(&name) {
            self.variables.push(name);
        }
    }

    pub fn insert(&mut self, index: usize, node: InstructionNode) -> Result<(), IrError> {
        if index > self.children.len() {
            return Err(IrError::IndexOutOfBounds {
                index,
                len: self.children.len(),
            });
        }
        self.children.insert(index, node);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<InstructionNode, IrError> {
        if index >= self.children.len() {
            return Err(IrError::IndexOutOfBounds {
                index,
                len: self.children.len(),
            });
        }
        Ok(self.children.remove(index))
    }

    /// Replace the child at `index`, returning the old node.
    pub fn replace(
        &mut self,
        index: usize,
        node: InstructionNode,
    ) -> Result<InstructionNode, IrError> {
        let len = self.children.len();
        match self.children.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, node)),
            None => Err(IrError::IndexOutOfBounds { index, len }),
        }
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaf instructions reachable by deep traversal.
    pub fn total_instructions(&self) -> usize {
        self.leaves().count()
    }

    /// Nesting depth: 1 for a flat kernel.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(|child| match child {
                InstructionNode::Composite(comp) => Some(comp.depth()),
                InstructionNode::Leaf(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Deep pre-order iteration over leaf instructions, disabled ones
    /// included.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.children.iter()],
        }
    }

    /// Deep pre-order iteration over enabled leaf instructions.
    pub fn enabled_leaves(&self) -> impl Iterator<Item = &Instruction> {
        self.leaves().filter(|inst| inst.enabled)
    }

    /// Re-address every leaf's bits through `map`. Fails without touching
    /// the tree if any referenced bit falls outside the map.
    pub fn map_bits(&mut self, map: &[usize]) -> Result<(), IrError> {
        for inst in self.leaves() {
            for bit in &inst.bits {
                if *bit >= map.len() {
                    return Err(IrError::BitOutOfRange {
                        bit: *bit,
                        len: map.len(),
                    });
                }
            }
        }
        self.map_bits_unchecked(map);
        Ok(())
    }

    fn map_bits_unchecked(&mut self, map: &[usize]) {
        for child in &mut self.children {
            match child {
                InstructionNode::Leaf(inst) => {
                    for bit in &mut inst.bits {
                        *bit = map[*bit];
                    }
                }
                InstructionNode::Composite(comp) => comp.map_bits_unchecked(map),
            }
        }
    }

    /// Highest bit index referenced by any leaf, if any bits are used.
    pub fn max_bit(&self) -> Option<usize> {
        self.leaves().flat_map(|inst| inst.bits.iter().copied()).max()
    }
}

/// Iterator behind [`CompositeFunction::leaves`]: an explicit stack of
/// child slices instead of recursion.
pub struct Leaves<'a> {
    stack: Vec<std::slice::Iter<'a, InstructionNode>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Instruction;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(iter) = self.stack.last_mut() {
            match iter.next() {
                Some(InstructionNode::Leaf(inst)) => return Some(inst),
                Some(InstructionNode::Composite(comp)) => {
                    self.stack.push(comp.children.iter());
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}
