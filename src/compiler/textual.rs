use logos::Logos;
use tracing::instrument;

use super::tokens::Token;
use super::{CompileError, Compiler};
use crate::accelerator::Accelerator;
use crate::ir::{CompositeFunction, Instruction, Ir, Parameter};

/// The reference front end: a line-oriented assembly dialect.
///
/// ```text
/// kernel bell {
///     H 0;
///     CNOT 0, 1;
///     MEASURE 0, 1;
/// }
/// ```
///
/// Statements are `NAME(params) bit, bit, ...;` where the parameter list
/// is optional and may hold integers, reals, quoted strings and `%var`
/// symbolic variables. Statements outside any `kernel` block go into an
/// implicit kernel named `main`. This compiler is a plugin like any other;
/// nothing in the core privileges it.
pub struct TextualCompiler;

impl TextualCompiler {
    pub const ID: &'static str = "textual";
}

struct Parser<'a> {
    tokens: Vec<(Token, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
    compiler: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source_len)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            compiler: self.compiler.to_string(),
            offset: self.offset(),
            message: message.into(),
        }
    }

    fn next(&mut self, expected: &str) -> Result<Token, CompileError> {
        match self.tokens.get(self.pos) {
            Some((token, _)) => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            None => Err(self.error(format!("expected {expected}, found end of input"))),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), CompileError> {
        let found = self.next(expected)?;
        if found == token {
            Ok(())
        } else {
            self.pos -= 1;
            Err(self.error(format!("expected {expected}, found {found}")))
        }
    }

    fn identifier(&mut self, expected: &str) -> Result<String, CompileError> {
        match self.next(expected)? {
            Token::Identifier(name) => Ok(name),
            found => {
                self.pos -= 1;
                Err(self.error(format!("expected {expected}, found {found}")))
            }
        }
    }

    /// `NAME ( params )? bits? ;`
    fn statement(&mut self) -> Result<Instruction, CompileError> {
        let name = self.identifier("instruction name")?;

        let mut parameters = Vec::new();
        if self.eat(&Token::LeftParen) {
            loop {
                let param = match self.next("parameter")? {
                    Token::Integer(value) => Parameter::Int(value),
                    Token::Float(value) => Parameter::Real(value),
                    Token::String(value) => Parameter::Str(value),
                    Token::Variable(name) => Parameter::Variable(name),
                    found => {
                        self.pos -= 1;
                        return Err(self.error(format!("expected parameter, found {found}")));
                    }
                };
                parameters.push(param);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightParen, "`)`")?;
        }

        let mut bits = Vec::new();
        if matches!(self.peek(), Some(Token::Integer(_))) {
            loop {
                match self.next("bit index")? {
                    Token::Integer(value) if value >= 0 => bits.push(value as usize),
                    Token::Integer(value) => {
                        self.pos -= 1;
                        return Err(
                            self.error(format!("bit index must be non-negative, got {value}"))
                        );
                    }
                    found => {
                        self.pos -= 1;
                        return Err(self.error(format!("expected bit index, found {found}")));
                    }
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        // `;` terminates a statement but may be omitted before `}` or at
        // the end of the input
        if !self.eat(&Token::Semicolon)
            && self.peek().is_some()
            && self.peek() != Some(&Token::RightBrace)
        {
            return Err(self.error("expected `;`"));
        }
        Ok(Instruction::with_parameters(name, parameters, bits))
    }

    /// `kernel NAME ( %vars )? { statements }`
    fn kernel(&mut self) -> Result<CompositeFunction, CompileError> {
        self.expect(Token::KeywordKernel, "`kernel`")?;
        let name = self.identifier("kernel name")?;
        let mut kernel = CompositeFunction::new(name);

        if self.eat(&Token::LeftParen) {
            loop {
                match self.next("variable declaration")? {
                    Token::Variable(var) => kernel.add_variable(var),
                    found => {
                        self.pos -= 1;
                        return Err(self.error(format!(
                            "expected variable declaration, found {found}"
                        )));
                    }
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightParen, "`)`")?;
        }

        self.expect(Token::LeftBrace, "`{`")?;
        while !self.eat(&Token::RightBrace) {
            if self.peek().is_none() {
                return Err(self.error("expected `}`, found end of input"));
            }
            let inst = self.statement()?;
            kernel.add_instruction(inst);
        }
        Ok(kernel)
    }
}

/// Ensure every symbolic variable an instruction uses is declared on the
/// kernel; implicit kernels collect them automatically.
fn collect_variables(kernel: &mut CompositeFunction) {
    let used: Vec<String> = kernel
        .leaves()
        .flat_map(|inst| inst.variables().map(str::to_string).collect::<Vec<_>>())
        .collect();
    for variable in used {
        kernel.add_variable(variable);
    }
}

impl Compiler for TextualCompiler {
    fn name(&self) -> &str {
        Self::ID
    }

    #[instrument(skip_all, fields(compiler = Self::ID))]
    fn compile(
        &self,
        source: &str,
        target: Option<&dyn Accelerator>,
    ) -> Result<Ir, CompileError> {
        let mut tokens = Vec::new();
        for (result, span) in Token::lexer(source).spanned() {
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(_) => {
                    return Err(CompileError::Syntax {
                        compiler: Self::ID.to_string(),
                        offset: span.start,
                        message: format!("unrecognized input {:?}", &source[span]),
                    });
                }
            }
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            source_len: source.len(),
            compiler: Self::ID,
        };

        let mut ir = Ir::new();
        let mut implicit = CompositeFunction::new("main");

        while parser.peek().is_some() {
            if parser.peek() == Some(&Token::KeywordKernel) {
                let mut kernel = parser.kernel()?;
                collect_variables(&mut kernel);
                ir.add_kernel(kernel).map_err(|source| CompileError::Ir {
                    compiler: Self::ID.to_string(),
                    source,
                })?;
            } else {
                let inst = parser.statement()?;
                implicit.add_instruction(inst);
            }
        }

        if !implicit.is_empty() {
            collect_variables(&mut implicit);
            ir.add_kernel(implicit).map_err(|source| CompileError::Ir {
                compiler: Self::ID.to_string(),
                source,
            })?;
        }

        if let Some(accelerator) = target {
            let capabilities = accelerator.capabilities();
            for kernel in ir.kernels() {
                for inst in kernel.enabled_leaves() {
                    if !capabilities.supports(&inst.name) {
                        return Err(CompileError::UnsupportedOperation {
                            compiler: Self::ID.to_string(),
                            instruction: inst.name.clone(),
                            kernel: kernel.name.clone(),
                            target: accelerator.name().to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(kernels = ir.len(), "compilation complete");
        Ok(ir)
    }
}
