//! Parser for the netlist language.

use super::ast::*;
use super::lexer::{parse_time_value, parse_value, Lexer, Token, TokenKind};
use crate::devices::{ModelDef, ModelKind, ParamValue, Params};
use crate::error::{NetlistError, Result};
use crate::time::Time;

/// Parser for netlist descriptions.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    /// Create a new parser reading from `lexer`.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peeked: None,
        })
    }

    /// Parse the entire description.
    pub fn parse(&mut self) -> Result<NetlistAst> {
        let mut ast = NetlistAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => {
                    let device = self.parse_device()?;
                    ast.devices.push(device);
                }
                _ => {
                    return Err(NetlistError::parse(
                        self.current.line,
                        format!("unexpected '{}' at start of line", self.current.text),
                    ));
                }
            }
            self.end_of_line()?;
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(())
    }

    fn peek(&mut self) -> Result<&Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        match &self.peeked {
            Some(tok) => Ok(tok),
            None => Err(NetlistError::parse(self.current.line, "unexpected end of input")),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(NetlistError::parse(
                self.current.line,
                format!("expected {}, got '{}'", what, self.current.text),
            ))
        }
    }

    /// A name: identifiers, plus words that happen to look numeric.
    fn expect_name(&mut self, what: &str) -> Result<String> {
        match self.current.kind {
            TokenKind::Identifier | TokenKind::Number => {
                let text = self.current.text.clone();
                self.advance()?;
                Ok(text)
            }
            _ => Err(NetlistError::parse(
                self.current.line,
                format!("expected {}, got '{}'", what, self.current.text),
            )),
        }
    }

    fn at_end_of_line(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn end_of_line(&mut self) -> Result<()> {
        match self.current.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => Ok(()),
            _ => Err(NetlistError::parse(
                self.current.line,
                format!("unexpected '{}' at end of line", self.current.text),
            )),
        }
    }

    /// `key` `=` `value`, with `current` on the key.
    fn at_assignment(&mut self) -> Result<bool> {
        if self.current.kind != TokenKind::Identifier {
            return Ok(false);
        }
        Ok(self.peek()?.kind == TokenKind::Equals)
    }

    fn parse_assignment(&mut self) -> Result<(String, ParamValue)> {
        let key = self.expect(TokenKind::Identifier, "parameter name")?.text;
        self.expect(TokenKind::Equals, "'='")?;
        let value = self.parse_param_value()?;
        Ok((key, value))
    }

    fn parse_param_value(&mut self) -> Result<ParamValue> {
        let tok = self.current.clone();
        let value = match tok.kind {
            TokenKind::Number => parse_value(&tok.text)
                .map(ParamValue::Number)
                .ok_or_else(|| NetlistError::parse(tok.line, format!("invalid number '{}'", tok.text)))?,
            TokenKind::Identifier => ParamValue::Text(tok.text.clone()),
            _ => {
                return Err(NetlistError::parse(
                    tok.line,
                    format!("expected a value, got '{}'", tok.text),
                ))
            }
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_number(&mut self, what: &str) -> Result<f64> {
        let tok = self.expect(TokenKind::Number, what)?;
        parse_value(&tok.text)
            .ok_or_else(|| NetlistError::parse(tok.line, format!("invalid number '{}'", tok.text)))
    }

    /// `CLASS name [pin | value]... [key=value]...`
    fn parse_device(&mut self) -> Result<DeviceDef> {
        let line = self.current.line;
        let class = self.expect(TokenKind::Identifier, "device class")?.text;
        let name = self.expect(TokenKind::Identifier, "device name")?.text;

        let mut pins = Vec::new();
        let mut values = Vec::new();
        let mut params = Params::new();

        while !self.at_end_of_line() {
            if self.at_assignment()? {
                let (key, value) = self.parse_assignment()?;
                params.set(&key, value);
                continue;
            }
            if !params.is_empty() {
                return Err(NetlistError::parse(
                    self.current.line,
                    format!("positional '{}' after key=value parameters", self.current.text),
                ));
            }
            match self.current.kind {
                TokenKind::Number => values.push(self.parse_number("value")?),
                TokenKind::Identifier => {
                    pins.push(self.current.text.clone());
                    self.advance()?;
                }
                _ => {
                    return Err(NetlistError::parse(
                        self.current.line,
                        format!("unexpected '{}' in device line", self.current.text),
                    ))
                }
            }
        }

        Ok(DeviceDef {
            class,
            name,
            pins,
            values,
            params,
            line,
        })
    }

    fn parse_directive(&mut self, ast: &mut NetlistAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_ascii_lowercase().as_str() {
            ".connect" => {
                let mut pins = Vec::new();
                while !self.at_end_of_line() {
                    pins.push(self.expect_name("pin")?);
                }
                if pins.len() < 2 {
                    return Err(NetlistError::parse(line, "'.connect' needs two or more pins"));
                }
                ast.connections.push(ConnectDef { pins, line });
            }
            ".alias" => {
                let alias = self.expect_name("alias name")?;
                let pin = self.expect_name("pin")?;
                ast.aliases.push(AliasDef { alias, pin, line });
            }
            ".param" => {
                let target = self.expect(TokenKind::Identifier, "<device>.<param>")?.text;
                let (device, param) = target.rsplit_once('.').ok_or_else(|| {
                    NetlistError::parse(line, format!("expected <device>.<param>, got '{}'", target))
                })?;
                let value = self.parse_param_value()?;
                ast.params.push(ParamDef {
                    device: device.to_string(),
                    param: param.to_string(),
                    value,
                    line,
                });
            }
            ".model" => {
                let model = self.parse_model(line)?;
                if ast.models.iter().any(|m| m.model.name == model.name) {
                    return Err(NetlistError::DuplicateModel { name: model.name });
                }
                ast.models.push(ModelCard { model, line });
            }
            ".solver" => {
                while !self.at_end_of_line() {
                    let (key, value) = self.parse_assignment()?;
                    let value = solver_value(&value)
                        .ok_or_else(|| NetlistError::parse(line, format!("invalid value for solver '{}'", key)))?;
                    ast.solver.push(SolverSetting { key, value, line });
                }
            }
            ".probe" => {
                if self.at_end_of_line() {
                    return Err(NetlistError::parse(line, "'.probe' needs a pin"));
                }
                while !self.at_end_of_line() {
                    let pin = self.expect_name("pin")?;
                    ast.probes.push(ProbeDef { pin, line });
                }
            }
            ".stimulus" => {
                let device = self.expect(TokenKind::Identifier, "device name")?.text;
                let time = self.parse_time(line)?;
                let value = self.parse_number("stimulus value")?;
                ast.stimuli.push(Stimulus {
                    device,
                    time,
                    value,
                    line,
                });
            }
            _ => {
                return Err(NetlistError::parse(
                    line,
                    format!("unknown directive '{}'", directive),
                ));
            }
        }

        Ok(())
    }

    /// `name kind [(] key=value... [)]`
    fn parse_model(&mut self, line: usize) -> Result<ModelDef> {
        let name = self.expect_name("model name")?;
        let keyword = self.expect(TokenKind::Identifier, "model kind")?.text;
        let kind = ModelKind::from_keyword(&keyword)
            .ok_or_else(|| NetlistError::parse(line, format!("unknown model kind '{}'", keyword)))?;
        let mut model = ModelDef::new(name, kind);

        let parens = self.current.kind == TokenKind::OpenParen;
        if parens {
            self.advance()?;
        }
        while !self.at_end_of_line() && self.current.kind != TokenKind::CloseParen {
            let (key, value) = self.parse_assignment()?;
            match value {
                ParamValue::Number(v) => model.params.insert(key.to_ascii_uppercase(), v),
                ParamValue::Text(t) => {
                    return Err(NetlistError::parse(
                        line,
                        format!("model parameter {} must be numeric, got '{}'", key, t),
                    ))
                }
            };
        }
        if parens {
            self.expect(TokenKind::CloseParen, "')'")?;
        }
        Ok(model)
    }

    fn parse_time(&mut self, line: usize) -> Result<Time> {
        let text = self.expect_name("time")?;
        let seconds = parse_time_value(&text)
            .ok_or_else(|| NetlistError::parse(line, format!("invalid time '{}'", text)))?;
        if seconds < 0.0 {
            return Err(NetlistError::parse(line, format!("negative time '{}'", text)));
        }
        Ok(Time::from_double(seconds))
    }
}

/// Solver settings are numeric; flags also accept `true`/`false`/`on`/`off`.
fn solver_value(value: &ParamValue) -> Option<f64> {
    match value {
        ParamValue::Number(v) => Some(*v),
        ParamValue::Text(t) => match t.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => Some(1.0),
            "false" | "off" | "no" => Some(0.0),
            _ => parse_time_value(t),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(input: &str) -> Result<NetlistAst> {
        Parser::new(Lexer::new(input))?.parse()
    }

    #[test]
    fn test_device_line() {
        let ast = parse("TTL_7400_NAND U1 A.Q B.Q\nRES R1 10k\n").unwrap();
        assert_eq!(ast.devices.len(), 2);
        assert_eq!(ast.devices[0].class, "TTL_7400_NAND");
        assert_eq!(ast.devices[0].pins, vec!["A.Q", "B.Q"]);
        assert_eq!(ast.devices[1].line, 2);
        assert_relative_eq!(ast.devices[1].values[0], 10e3);
    }

    #[test]
    fn test_key_value_params() {
        let ast = parse("DIODE D1 model=1N914\nCLOCK CLK FREQ=1k").unwrap();
        assert_eq!(ast.devices[0].params.text("MODEL"), Some("1N914"));
        assert_eq!(
            ast.devices[1].params.get("freq"),
            Some(&ParamValue::Number(1e3))
        );
    }

    #[test]
    fn test_directives() {
        let src = "\
.connect U1.Y U2.A U3.A
.alias OUT U1.Y
.param R1.R 2.2k
.model 1N914 D (IS=2.52n N=1.752)
.solver accuracy=1e-9 dynamic_ts=true
.probe OUT
.stimulus VIN 10ms 2.5
";
        let ast = parse(src).unwrap();
        assert_eq!(ast.connections[0].pins.len(), 3);
        assert_eq!(ast.aliases[0].alias, "OUT");
        assert_eq!(ast.params[0].device, "R1");
        assert_eq!(ast.params[0].param, "R");
        assert_eq!(ast.models[0].model.kind, ModelKind::Diode);
        assert_relative_eq!(ast.models[0].model.get("IS", 0.0), 2.52e-9);
        assert_eq!(ast.solver.len(), 2);
        assert_eq!(ast.solver[1].value, 1.0);
        assert_eq!(ast.probes[0].pin, "OUT");
        assert_eq!(ast.stimuli[0].time, Time::from_msec(10));
        assert_relative_eq!(ast.stimuli[0].value, 2.5);
    }

    #[test]
    fn test_errors_carry_line() {
        match parse("RES R1 1k\n.bogus x\n") {
            Err(NetlistError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse(".connect A.Q").is_err());
        assert!(parse(".model X Q (IS=1)").is_err());
        assert!(parse(".stimulus VIN -1ms 1").is_err());
        assert!(parse("RES R1 R=1k 2k").is_err());
    }

    #[test]
    fn test_duplicate_model() {
        let src = ".model Q1 NPN (BF=100)\n.model Q1 PNP\n";
        assert!(matches!(parse(src), Err(NetlistError::DuplicateModel { .. })));
    }
}
