//! Parser for the netlist language.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{DiscreteError, Result};

/// Parser for netlists.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<CircuitAst> {
        let mut ast = CircuitAst::new();

        while self.current.kind != TokenKind::Eof {
            // Skip empty lines
            if self.current.kind == TokenKind::Newline {
                self.advance()?;
                continue;
            }

            match &self.current.kind {
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let module = self.parse_module()?;
                    ast.modules.push(module);
                }
                _ => {
                    return Err(DiscreteError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            self.end_of_line()?;
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(DiscreteError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn end_of_line(&mut self) -> Result<()> {
        match self.current.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => Ok(()),
            _ => Err(DiscreteError::parse(
                self.current.line,
                format!("unexpected {:?} at end of line", self.current.text),
            )),
        }
    }

    fn number(&mut self) -> Result<f64> {
        let tok = self.expect(TokenKind::Number)?;
        parse_value(&tok.text)
            .ok_or_else(|| DiscreteError::parse(tok.line, format!("invalid number: {}", tok.text)))
    }

    /// `NAME` or `NAME:port`.
    fn reference(&mut self) -> Result<(String, usize)> {
        let name = self.expect(TokenKind::Identifier)?.text;
        let mut port = 0;
        if self.current.kind == TokenKind::Colon {
            self.advance()?;
            let tok = self.expect(TokenKind::Number)?;
            port = tok
                .text
                .parse::<usize>()
                .map_err(|_| DiscreteError::parse(tok.line, format!("invalid port: {}", tok.text)))?;
        }
        Ok((name, port))
    }

    fn parse_directive(&mut self, ast: &mut CircuitAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".param" => {
                let name = self.expect(TokenKind::Identifier)?.text;
                let value = self.number()?;
                ast.params.push(ParamDef { name, value, line });
            }
            ".input" => {
                let name = self.expect(TokenKind::Identifier)?.text;
                if ast.input.is_some() {
                    return Err(DiscreteError::parse(line, "only one .input is allowed"));
                }
                ast.input = Some(name);
            }
            ".output" => {
                let (node, port) = self.reference()?;
                let gain = if self.current.kind == TokenKind::Number {
                    self.number()?
                } else {
                    1.0
                };
                ast.outputs.push(OutputDef {
                    node,
                    port,
                    gain,
                    line,
                });
            }
            _ => {
                return Err(DiscreteError::parse(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn parse_module(&mut self) -> Result<ModuleDef> {
        let keyword = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        let kind = ModuleKind::from_keyword(&keyword).ok_or_else(|| {
            DiscreteError::UnknownModuleKind {
                kind: keyword.clone(),
                line,
            }
        })?;
        let name = self.expect(TokenKind::Identifier)?.text;

        let mut inputs = Vec::new();
        let mut options = HashMap::new();

        while !self.at_line_end() {
            match self.current.kind {
                TokenKind::Number => {
                    if !options.is_empty() {
                        return Err(DiscreteError::parse(line, "inputs must come before options"));
                    }
                    inputs.push(Input::Value(self.number()?));
                }
                TokenKind::Identifier => {
                    let (text, port) = self.reference()?;

                    // key=value
                    if port == 0 && self.current.kind == TokenKind::Equals {
                        self.advance()?;
                        let value = self.option_value(line)?;
                        if options.insert(text.to_lowercase(), value).is_some() {
                            return Err(DiscreteError::parse(
                                line,
                                format!("option '{}' given twice", text),
                            ));
                        }
                        continue;
                    }

                    if !options.is_empty() {
                        return Err(DiscreteError::parse(line, "inputs must come before options"));
                    }
                    inputs.push(Input::Ref { name: text, port });
                }
                _ => {
                    return Err(DiscreteError::parse(
                        line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ModuleDef {
            kind,
            name,
            inputs,
            options,
            line,
        })
    }

    fn option_value(&mut self, line: usize) -> Result<OptionValue> {
        match self.current.kind {
            TokenKind::Number => Ok(OptionValue::Number(self.number()?)),
            TokenKind::Identifier => Ok(OptionValue::Ident(self.expect(TokenKind::Identifier)?.text)),
            TokenKind::Str => Ok(OptionValue::Text(self.expect(TokenKind::Str)?.text)),
            TokenKind::OpenBracket => {
                self.advance()?;
                let mut values = Vec::new();
                while self.current.kind != TokenKind::CloseBracket {
                    if self.at_line_end() {
                        return Err(DiscreteError::parse(line, "unterminated list"));
                    }
                    values.push(self.number()?);
                    if self.current.kind == TokenKind::Comma {
                        self.advance()?;
                    }
                }
                self.advance()?;
                Ok(OptionValue::List(values))
            }
            _ => Err(DiscreteError::parse(line, "expected option value")),
        }
    }
}
