use std::iter::Peekable;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::*;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
	#[error("empty line")]
	Empty,
	#[error("missing file name after `{0}`")]
	MissingTarget(Direction),
	#[error("more than one `{0}` redirection")]
	DuplicateRedirect(Direction),
	#[error("missing command")]
	MissingCommand,
	#[error("only a single `|` is supported")]
	TooManyStages,
}

pub type ParseResult<T> = Result<T, ParseError>;

fn delimiter() -> &'static Regex {
	static DELIMITER: OnceLock<Regex> = OnceLock::new();
	DELIMITER.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn is_operator(word: &str) -> bool {
	match word {
		">" | "<" | "|" => true,
		_ => false,
	}
}

struct Parser<I: Iterator> {
	words: Peekable<I>,
}

impl<'a, I: Iterator<Item = &'a str>> Parser<I> {
	fn read_target(&mut self, direction: Direction) -> ParseResult<String> {
		match self.words.peek() {
			Some(word) if !is_operator(word) => {
				let target = word.to_string();
				self.words.next();
				Ok(target)
			},
			_ => Err(ParseError::MissingTarget(direction)),
		}
	}

	fn read_token(&mut self) -> Option<ParseResult<Token>> {
		let word = self.words.next()?;
		let token = match word {
			"<" => self.read_target(Direction::Input).map(|t| Token::Redirect(Direction::Input, t)),
			">" => self.read_target(Direction::Output).map(|t| Token::Redirect(Direction::Output, t)),
			"|" => Ok(Token::Pipe),
			_ => Ok(Token::Word(word.to_string())),
		};
		Some(token)
	}
}

pub fn tokenize(line: &str) -> ParseResult<Vec<Token>> {
	let words = delimiter().split(line).filter(|w| !w.is_empty());
	let mut parser = Parser { words: words.peekable() };
	let mut tokens = vec![];
	while let Some(token) = parser.read_token() {
		tokens.push(token?);
	}
	Ok(tokens)
}

fn assemble(tokens: Vec<Token>) -> ParseResult<Line> {
	if tokens.is_empty() {
		return Err(ParseError::Empty);
	}

	let mut stages: Vec<Vec<String>> = vec![vec![]];
	let mut redirect = RedirectSpec::default();
	for token in tokens {
		match token {
			Token::Word(w) => if let Some(stage) = stages.last_mut() {
				stage.push(w);
			},
			Token::Redirect(direction, target) => {
				let slot = redirect.slot(direction);
				if slot.is_some() {
					return Err(ParseError::DuplicateRedirect(direction));
				}
				*slot = Some(PathBuf::from(target));
			},
			Token::Pipe => {
				if stages.len() == 2 {
					return Err(ParseError::TooManyStages);
				}
				stages.push(vec![]);
			},
		}
	}
	let mut commands = vec![];
	for stage in stages {
		commands.push(CommandSpec::new(stage).ok_or(ParseError::MissingCommand)?);
	}

	let mut commands = commands.into_iter();
	match (commands.next(), commands.next()) {
		(Some(first), None) => Ok(Line::Simple(CommandSpec { redirect: redirect, ..first })),
		(Some(mut left), Some(mut right)) => {
			left.redirect.stdin_path = redirect.stdin_path;
			right.redirect.stdout_path = redirect.stdout_path;
			Ok(Line::Pipe(PipeSpec { left: left, right: right }))
		},
		_ => Err(ParseError::MissingCommand),
	}
}

// the trailing `&` must already be stripped
pub fn parse(line: &str) -> ParseResult<Line> {
	assemble(tokenize(line)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(ws: &[&str]) -> Vec<String> {
		ws.iter().map(|w| w.to_string()).collect()
	}

	#[test]
	fn splits_on_runs_of_whitespace() {
		let tokens = tokenize("  ls \t -l    /tmp ").unwrap();
		assert_eq!(tokens, vec![
			Token::Word("ls".into()),
			Token::Word("-l".into()),
			Token::Word("/tmp".into()),
		]);
	}

	#[test]
	fn tags_operators() {
		let tokens = tokenize("cat < in | sort > out").unwrap();
		assert_eq!(tokens, vec![
			Token::Word("cat".into()),
			Token::Redirect(Direction::Input, "in".into()),
			Token::Pipe,
			Token::Word("sort".into()),
			Token::Redirect(Direction::Output, "out".into()),
		]);
	}

	#[test]
	fn operators_inside_words_are_plain_text() {
		let tokens = tokenize("echo a>b").unwrap();
		assert_eq!(tokens, vec![Token::Word("echo".into()), Token::Word("a>b".into())]);
	}

	#[test]
	fn simple_command_with_both_redirects() {
		let line = parse("wc -l < in.txt > out.txt").unwrap();
		let mut expected = CommandSpec::new(words(&["wc", "-l"])).unwrap();
		expected.redirect.stdin_path = Some("in.txt".into());
		expected.redirect.stdout_path = Some("out.txt".into());
		assert_eq!(line, Line::Simple(expected));
	}

	#[test]
	fn redirect_before_command_name() {
		match parse("> out.txt echo hi").unwrap() {
			Line::Simple(c) => {
				assert_eq!(c.tokens, words(&["echo", "hi"]));
				assert_eq!(c.redirect.stdout_path, Some("out.txt".into()));
			},
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn pipe_binds_redirects_to_outer_ends() {
		match parse("sort < in | uniq -c > out").unwrap() {
			Line::Pipe(p) => {
				assert_eq!(p.left.tokens, words(&["sort"]));
				assert_eq!(p.left.redirect.stdin_path, Some("in".into()));
				assert_eq!(p.left.redirect.stdout_path, None);
				assert_eq!(p.right.tokens, words(&["uniq", "-c"]));
				assert_eq!(p.right.redirect.stdin_path, None);
				assert_eq!(p.right.redirect.stdout_path, Some("out".into()));
			},
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn missing_redirect_target() {
		assert_eq!(parse("echo hi >"), Err(ParseError::MissingTarget(Direction::Output)));
		assert_eq!(parse("cat < | wc"), Err(ParseError::MissingTarget(Direction::Input)));
	}

	#[test]
	fn rejects_malformed_lines() {
		assert_eq!(parse(""), Err(ParseError::Empty));
		assert_eq!(parse(" \t "), Err(ParseError::Empty));
		assert_eq!(parse("> out"), Err(ParseError::MissingCommand));
		assert_eq!(parse("| sort"), Err(ParseError::MissingCommand));
		assert_eq!(parse("ls |"), Err(ParseError::MissingCommand));
		assert_eq!(parse("a | b | c"), Err(ParseError::TooManyStages));
		assert_eq!(parse("a > x > y"), Err(ParseError::DuplicateRedirect(Direction::Output)));
	}
}
