use std::fmt::Write;

use itertools::Itertools;

use super::Ir;
use super::composite::CompositeFunction;
use super::instruction::Instruction;
use super::visitor::InstructionVisitor;

/// A visitor that accumulates native assembly text while it walks a
/// kernel.
pub trait AsmVisitor: InstructionVisitor {
    /// The text accumulated so far.
    fn native(&self) -> &str;
}

/// Supplies the per-instruction-kind rendering for one backend dialect.
/// Rendering never mutates the IR, and a given (IR, renderer) pair always
/// produces the same text.
pub trait AsmRenderer {
    /// A stable identifier for the dialect this renderer emits.
    fn dialect(&self) -> &str;

    /// Build a fresh visitor to render one kernel.
    fn make_visitor(&self) -> Box<dyn AsmVisitor>;
}

impl Ir {
    /// Render every kernel, in name order, through the renderer's visitor.
    pub fn to_assembly(&self, renderer: &dyn AsmRenderer) -> String {
        let mut out = String::new();
        for kernel in self.kernels() {
            let mut visitor = renderer.make_visitor();
            visitor.visit_composite(kernel);
            out.push_str(visitor.native());
        }
        out
    }
}

/// The stock renderer: `.kernel` headers, one instruction per line,
/// operands spelled as `<buffer>[<bit>]`, nested composites as indented
/// `.begin`/`.end` blocks.
#[derive(Debug, Clone)]
pub struct DefaultRenderer {
    /// Name the rendered text uses for the accelerator buffer variable.
    pub buffer_name: String,
}

impl DefaultRenderer {
    pub fn new(buffer_name: impl Into<String>) -> Self {
        Self {
            buffer_name: buffer_name.into(),
        }
    }
}

impl Default for DefaultRenderer {
    fn default() -> Self {
        Self::new("q")
    }
}

impl AsmRenderer for DefaultRenderer {
    fn dialect(&self) -> &str {
        "quartz-asm"
    }

    fn make_visitor(&self) -> Box<dyn AsmVisitor> {
        Box::new(DefaultAsmVisitor {
            buffer_name: self.buffer_name.clone(),
            native: String::new(),
            depth: 0,
        })
    }
}

struct DefaultAsmVisitor {
    buffer_name: String,
    native: String,
    depth: usize,
}

impl DefaultAsmVisitor {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.native.push_str("  ");
        }
    }
}

impl InstructionVisitor for DefaultAsmVisitor {
    fn visit_instruction(&mut self, inst: &Instruction) {
        if !inst.enabled {
            return;
        }
        self.indent();
        self.native.push_str(&inst.name);
        if inst.is_parameterized() {
            let params = inst.parameters.iter().map(|p| p.to_string()).join(", ");
            let _ = write!(self.native, "({params})");
        }
        let operands = inst
            .bits
            .iter()
            .map(|bit| format!("{}[{bit}]", self.buffer_name))
            .join(", ");
        if !operands.is_empty() {
            self.native.push(' ');
            self.native.push_str(&operands);
        }
        self.native.push('\n');
    }

    // Drives its own recursion so it can emit block structure around the
    // children; not meant to be used with `walk`.
    fn visit_composite(&mut self, composite: &CompositeFunction) {
        self.indent();
        if self.depth == 0 {
            let _ = write!(self.native, ".kernel {}", composite.name);
            if !composite.variables.is_empty() {
                let vars = composite.variables.iter().map(|v| format!("%{v}")).join(", ");
                let _ = write!(self.native, "({vars})");
            }
            self.native.push('\n');
        } else {
            let _ = writeln!(self.native, ".begin {}", composite.name);
        }
        self.depth += 1;
        for child in &composite.children {
            // double dispatch per child; nested composites re-enter here
            child.accept(self);
        }
        self.depth -= 1;
        if self.depth > 0 {
            self.indent();
            let _ = writeln!(self.native, ".end {}", composite.name);
        }
    }
}

impl AsmVisitor for DefaultAsmVisitor {
    fn native(&self) -> &str {
        &self.native
    }
}
