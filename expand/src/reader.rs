//! A small S-expression reader for the toy concrete syntax the CLI harness
//! accepts: integers, `#t`/`#f` booleans, `"strings"`, symbols, `(lists)`
//! and `[vectors]`. Just enough to drive `expand-core` end to end; it has
//! no relation to any real source language's grammar.

use std::fmt;
use std::sync::Arc;

use expand_core::{Payload, SrcLoc, Symbol, Syntax};

pub struct ReadError {
	pub message: String,
	pub line: u32,
	pub column: u32,
}

impl fmt::Display for ReadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}: {}", self.line, self.column, self.message)
	}
}

/// Reads every top-level form in `input`. `file` is only used to tag the
/// resulting syntax objects' source locations.
pub fn read_all(file: &str, input: &str) -> Result<Vec<Syntax>, ReadError> {
	let mut reader = Reader::new(file, input);
	let mut forms = Vec::new();
	reader.skip_whitespace();
	while !reader.at_end() {
		forms.push(reader.read_form()?);
		reader.skip_whitespace();
	}
	Ok(forms)
}

struct Reader {
	file: Arc<str>,
	chars: Vec<char>,
	pos: usize,
	line: u32,
	column: u32,
}

impl Reader {
	fn new(file: &str, input: &str) -> Reader {
		Reader {
			file: Arc::from(file),
			chars: input.chars().collect(),
			pos: 0,
			line: 1,
			column: 1,
		}
	}

	fn at_end(&self) -> bool {
		self.pos >= self.chars.len()
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn advance(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += 1;
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn err(&self, message: impl Into<String>) -> ReadError {
		ReadError {
			message: message.into(),
			line: self.line,
			column: self.column,
		}
	}

	fn skip_whitespace(&mut self) {
		loop {
			match self.peek() {
				Some(c) if c.is_whitespace() => {
					self.advance();
				}
				Some(';') => {
					while !matches!(self.peek(), None | Some('\n')) {
						self.advance();
					}
				}
				_ => break,
			}
		}
	}

	fn loc(&self, start_line: u32, start_column: u32) -> SrcLoc {
		SrcLoc::new(self.file.as_ref(), start_line, start_column, self.line, self.column)
	}

	fn read_form(&mut self) -> Result<Syntax, ReadError> {
		self.skip_whitespace();
		let start_line = self.line;
		let start_column = self.column;
		match self.peek() {
			None => Err(self.err("unexpected end of input")),
			Some('(') => self.read_seq('(', ')', start_line, start_column, Payload::List),
			Some('[') => self.read_seq('[', ']', start_line, start_column, Payload::Vec),
			Some(')') | Some(']') => Err(self.err("unmatched closing delimiter")),
			Some('"') => self.read_string(start_line, start_column),
			Some('#') => self.read_hash(start_line, start_column),
			_ => self.read_atom(start_line, start_column),
		}
	}

	fn read_seq(
		&mut self,
		open: char,
		close: char,
		start_line: u32,
		start_column: u32,
		wrap: impl Fn(Vec<Syntax>) -> Payload,
	) -> Result<Syntax, ReadError> {
		self.advance(); // consume `open`
		let mut children = Vec::new();
		loop {
			self.skip_whitespace();
			match self.peek() {
				None => return Err(self.err(format!("unterminated `{open}`"))),
				Some(c) if c == close => {
					self.advance();
					break;
				}
				_ => children.push(self.read_form()?),
			}
		}
		Ok(Syntax::from_reader(wrap(children), self.loc(start_line, start_column)))
	}

	fn read_string(&mut self, start_line: u32, start_column: u32) -> Result<Syntax, ReadError> {
		self.advance(); // consume opening quote
		let mut text = String::new();
		loop {
			match self.advance() {
				None => return Err(self.err("unterminated string literal")),
				Some('"') => break,
				Some('\\') => match self.advance() {
					Some('n') => text.push('\n'),
					Some('t') => text.push('\t'),
					Some(c) => text.push(c),
					None => return Err(self.err("unterminated string literal")),
				},
				Some(c) => text.push(c),
			}
		}
		Ok(Syntax::from_reader(Payload::Str(Arc::from(text.as_str())), self.loc(start_line, start_column)))
	}

	fn read_hash(&mut self, start_line: u32, start_column: u32) -> Result<Syntax, ReadError> {
		self.advance(); // consume `#`
		match self.advance() {
			Some('t') => Ok(Syntax::from_reader(Payload::Bool(true), self.loc(start_line, start_column))),
			Some('f') => Ok(Syntax::from_reader(Payload::Bool(false), self.loc(start_line, start_column))),
			_ => Err(self.err("expected #t or #f")),
		}
	}

	fn read_atom(&mut self, start_line: u32, start_column: u32) -> Result<Syntax, ReadError> {
		let start = self.pos;
		while let Some(c) = self.peek() {
			if c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '"' | ';') {
				break;
			}
			self.advance();
		}
		if self.pos == start {
			return Err(self.err(format!("unexpected character `{}`", self.peek().unwrap_or(' '))));
		}
		let text: String = self.chars[start..self.pos].iter().collect();
		let loc = self.loc(start_line, start_column);
		if let Ok(n) = text.parse::<u64>() {
			Ok(Syntax::from_reader(Payload::Sig(n), loc))
		} else {
			Ok(Syntax::from_reader(Payload::Id(Symbol::intern(&text)), loc))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_a_literal() {
		let forms = read_all("<test>", "42").unwrap();
		assert_eq!(forms.len(), 1);
		assert!(matches!(forms[0].payload(), Payload::Sig(42)));
	}

	#[test]
	fn reads_nested_lists_and_vectors() {
		let forms = read_all("<test>", "(lambda [x] x)").unwrap();
		assert_eq!(forms.len(), 1);
		assert_eq!(forms[0].children().len(), 3);
		assert!(matches!(forms[0].children()[1].payload(), Payload::Vec(_)));
	}

	#[test]
	fn reports_unterminated_list() {
		assert!(read_all("<test>", "(lambda [x] x").is_err());
	}
}
