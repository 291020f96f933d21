//! Recursive descent parser for GraphQL query documents.
//!
//! Any grammar violation aborts parsing for the whole document: no partial
//! tree is ever handed to document construction. The error carries the
//! offending token's source location for user-facing reporting.

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::tree::{NodeId, SyntaxKind, SyntaxTree};
use grapnel_core::{SourceLocation, SourceText, Span};
use thiserror::Error;

/// A fatal lexical or grammar error.
#[derive(Debug, Clone, Error)]
pub enum SyntaxError {
    #[error("syntax error at {location}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: SourceLocation,
    },
    #[error("syntax error at {location}: malformed token `{text}`")]
    InvalidToken {
        text: String,
        location: SourceLocation,
    },
    #[error("syntax error at {location}: expected an operation or fragment definition")]
    ExpectedDefinition { location: SourceLocation },
    #[error("syntax error at {location}: nesting exceeds {limit} levels")]
    NestingTooDeep { limit: u32, location: SourceLocation },
}

impl SyntaxError {
    /// The location of the offending token.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        match self {
            Self::UnexpectedToken { location, .. }
            | Self::InvalidToken { location, .. }
            | Self::ExpectedDefinition { location }
            | Self::NestingTooDeep { location, .. } => *location,
        }
    }
}

/// Upper bound on brace and bracket nesting accepted by the parser.
/// The recursive descent never goes deeper than this.
const MAX_NESTING: u32 = 128;

type ParseResult<T> = Result<T, SyntaxError>;

/// Parses a query document into a syntax tree.
pub fn parse(source: &SourceText) -> ParseResult<SyntaxTree> {
    let mut parser = Parser::new(source);
    parser.parse_document()?;
    Ok(parser.tree)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a SourceText,
    current: Token,
    tree: SyntaxTree,
    depth: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a SourceText) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            source,
            current,
            tree: SyntaxTree::new(),
            depth: 0,
        }
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn enter_nested(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::NestingTooDeep {
                limit: MAX_NESTING,
                location: self.current_location(),
            });
        }
        Ok(())
    }

    fn leave_nested(&mut self) {
        self.depth -= 1;
    }

    fn current_location(&self) -> SourceLocation {
        self.source.location(self.current.span.start)
    }

    fn current_text(&self) -> &'a str {
        self.source.slice(self.current.span)
    }

    fn error_expected(&self, expected: impl Into<String>) -> SyntaxError {
        if self.at_kind(TokenKind::Error) {
            return SyntaxError::InvalidToken {
                text: self.current_text().to_string(),
                location: self.current_location(),
            };
        }
        SyntaxError::UnexpectedToken {
            expected: expected.into(),
            found: self.at().to_string(),
            location: self.current_location(),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Span> {
        if self.at_kind(kind) {
            let span = self.current.span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error_expected(kind.to_string()))
        }
    }

    /// Names in argument/value/alias position may be keywords.
    fn expect_name(&mut self) -> ParseResult<Span> {
        if self.at().is_name_like() {
            let span = self.current.span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error_expected("a name"))
        }
    }

    /// Fragment names may be any name except `on`.
    fn expect_fragment_name(&mut self) -> ParseResult<Span> {
        if self.at_kind(TokenKind::On) {
            return Err(self.error_expected("a fragment name"));
        }
        self.expect_name()
    }

    fn parse_document(&mut self) -> ParseResult<()> {
        let mut definitions = Vec::new();

        if self.at_kind(TokenKind::Eof) {
            return Err(SyntaxError::ExpectedDefinition {
                location: self.current_location(),
            });
        }

        while !self.at_kind(TokenKind::Eof) {
            definitions.push(self.parse_definition()?);
        }

        let root = self.tree.add_node(
            SyntaxKind::Document,
            Span::default(),
            Span::default(),
            &definitions,
        );
        self.tree.set_root(root);
        Ok(())
    }

    fn parse_definition(&mut self) -> ParseResult<NodeId> {
        match self.at() {
            TokenKind::Query | TokenKind::Mutation | TokenKind::Subscription | TokenKind::LBrace => {
                self.parse_operation()
            }
            TokenKind::Fragment => self.parse_fragment_definition(),
            _ => Err(SyntaxError::ExpectedDefinition {
                location: self.current_location(),
            }),
        }
    }

    fn parse_operation(&mut self) -> ParseResult<NodeId> {
        let mut verb = Span::default();
        let mut name = Span::default();
        let mut children = Vec::new();

        if !self.at_kind(TokenKind::LBrace) {
            verb = self.current.span;
            self.advance();

            if self.at_kind(TokenKind::Name) {
                name = self.current.span;
                self.advance();
            }

            if self.at_kind(TokenKind::LParen) {
                children.push(self.parse_variable_definitions()?);
            }
        }

        self.parse_directives(&mut children)?;
        children.push(self.parse_selection_set()?);

        Ok(self
            .tree
            .add_node(SyntaxKind::Operation, name, verb, &children))
    }

    fn parse_variable_definitions(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::LParen)?;
        let mut defs = Vec::new();

        while !self.at_kind(TokenKind::RParen) {
            defs.push(self.parse_variable_definition()?);
        }
        if defs.is_empty() {
            return Err(self.error_expected("a variable definition"));
        }
        self.expect(TokenKind::RParen)?;

        Ok(self.tree.add_node(
            SyntaxKind::VariableDefinitions,
            Span::default(),
            Span::default(),
            &defs,
        ))
    }

    fn parse_variable_definition(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Dollar)?;
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon)?;

        let mut children = vec![self.parse_type_reference()?];

        if self.at_kind(TokenKind::Eq) {
            self.advance();
            children.push(self.parse_value(true)?);
        }
        self.parse_directives(&mut children)?;

        Ok(self.tree.add_node(
            SyntaxKind::VariableDefinition,
            name,
            Span::default(),
            &children,
        ))
    }

    fn parse_type_reference(&mut self) -> ParseResult<NodeId> {
        let inner = if self.at_kind(TokenKind::LBracket) {
            self.enter_nested()?;
            self.advance();
            let element = self.parse_type_reference()?;
            self.expect(TokenKind::RBracket)?;
            self.leave_nested();
            self.tree.add_node(
                SyntaxKind::ListType,
                Span::default(),
                Span::default(),
                &[element],
            )
        } else {
            let name = self.expect_name()?;
            self.tree
                .add_node(SyntaxKind::NamedType, name, Span::default(), &[])
        };

        if self.at_kind(TokenKind::Bang) {
            self.advance();
            Ok(self.tree.add_node(
                SyntaxKind::NonNullType,
                Span::default(),
                Span::default(),
                &[inner],
            ))
        } else {
            Ok(inner)
        }
    }

    fn parse_selection_set(&mut self) -> ParseResult<NodeId> {
        self.enter_nested()?;
        self.expect(TokenKind::LBrace)?;
        let mut selections = Vec::new();

        while !self.at_kind(TokenKind::RBrace) {
            selections.push(self.parse_selection()?);
        }
        if selections.is_empty() {
            return Err(self.error_expected("a selection"));
        }
        self.expect(TokenKind::RBrace)?;

        self.leave_nested();
        Ok(self.tree.add_node(
            SyntaxKind::SelectionSet,
            Span::default(),
            Span::default(),
            &selections,
        ))
    }

    fn parse_selection(&mut self) -> ParseResult<NodeId> {
        if self.at_kind(TokenKind::Spread) {
            self.parse_fragment_selection()
        } else if self.at().is_name_like() {
            self.parse_field()
        } else {
            Err(self.error_expected("a field, fragment spread, or inline fragment"))
        }
    }

    fn parse_field(&mut self) -> ParseResult<NodeId> {
        let first = self.expect_name()?;

        let (name, alias) = if self.at_kind(TokenKind::Colon) {
            self.advance();
            (self.expect_name()?, first)
        } else {
            (first, Span::default())
        };

        let mut children = Vec::new();
        if self.at_kind(TokenKind::LParen) {
            children.push(self.parse_arguments()?);
        }
        self.parse_directives(&mut children)?;
        if self.at_kind(TokenKind::LBrace) {
            children.push(self.parse_selection_set()?);
        }

        Ok(self.tree.add_node(SyntaxKind::Field, name, alias, &children))
    }

    fn parse_fragment_selection(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Spread)?;

        // `... on T { }` and bare `...` with directives are inline fragments;
        // `...Name` is a spread.
        if self.at().is_name_like() && !self.at_kind(TokenKind::On) {
            let name = self.expect_fragment_name()?;
            let mut children = Vec::new();
            self.parse_directives(&mut children)?;
            return Ok(self
                .tree
                .add_node(SyntaxKind::FragmentSpread, name, Span::default(), &children));
        }

        let type_condition = if self.at_kind(TokenKind::On) {
            self.advance();
            self.expect(TokenKind::Name)?
        } else {
            Span::default()
        };

        let mut children = Vec::new();
        self.parse_directives(&mut children)?;
        children.push(self.parse_selection_set()?);

        Ok(self.tree.add_node(
            SyntaxKind::InlineFragment,
            Span::default(),
            type_condition,
            &children,
        ))
    }

    fn parse_fragment_definition(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::Fragment)?;
        let name = self.expect_fragment_name()?;
        self.expect(TokenKind::On)?;
        let type_condition = self.expect(TokenKind::Name)?;

        let mut children = Vec::new();
        self.parse_directives(&mut children)?;
        children.push(self.parse_selection_set()?);

        Ok(self.tree.add_node(
            SyntaxKind::FragmentDefinition,
            name,
            type_condition,
            &children,
        ))
    }

    fn parse_arguments(&mut self) -> ParseResult<NodeId> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();

        while !self.at_kind(TokenKind::RParen) {
            args.push(self.parse_argument()?);
        }
        if args.is_empty() {
            return Err(self.error_expected("an argument"));
        }
        self.expect(TokenKind::RParen)?;

        Ok(self
            .tree
            .add_node(SyntaxKind::Arguments, Span::default(), Span::default(), &args))
    }

    fn parse_argument(&mut self) -> ParseResult<NodeId> {
        let name = self.expect_name()?;
        self.expect(TokenKind::Colon)?;
        let value = self.parse_value(false)?;

        Ok(self
            .tree
            .add_node(SyntaxKind::Argument, name, Span::default(), &[value]))
    }

    fn parse_directives(&mut self, out: &mut Vec<NodeId>) -> ParseResult<()> {
        while self.at_kind(TokenKind::At) {
            self.advance();
            let name = self.expect_name()?;
            let mut children = Vec::new();
            if self.at_kind(TokenKind::LParen) {
                children.push(self.parse_arguments()?);
            }
            out.push(
                self.tree
                    .add_node(SyntaxKind::Directive, name, Span::default(), &children),
            );
        }
        Ok(())
    }

    fn parse_value(&mut self, const_context: bool) -> ParseResult<NodeId> {
        let span = self.current.span;
        match self.at() {
            TokenKind::Dollar => {
                if const_context {
                    return Err(self.error_expected("a constant value"));
                }
                self.advance();
                let name = self.expect_name()?;
                Ok(self
                    .tree
                    .add_node(SyntaxKind::Variable, name, Span::default(), &[]))
            }
            TokenKind::IntLiteral => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::IntValue, span, Span::default(), &[]))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::FloatValue, span, Span::default(), &[]))
            }
            TokenKind::StringLiteral | TokenKind::BlockStringLiteral => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::StringValue, span, Span::default(), &[]))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::BooleanValue, span, Span::default(), &[]))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::NullValue, span, Span::default(), &[]))
            }
            TokenKind::Name => {
                self.advance();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::EnumValue, span, Span::default(), &[]))
            }
            TokenKind::LBracket => {
                self.enter_nested()?;
                self.advance();
                let mut items = Vec::new();
                while !self.at_kind(TokenKind::RBracket) {
                    items.push(self.parse_value(const_context)?);
                }
                self.expect(TokenKind::RBracket)?;
                self.leave_nested();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::ListValue, span, Span::default(), &items))
            }
            TokenKind::LBrace => {
                self.enter_nested()?;
                self.advance();
                let mut fields = Vec::new();
                while !self.at_kind(TokenKind::RBrace) {
                    let name = self.expect_name()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_value(const_context)?;
                    fields.push(self.tree.add_node(
                        SyntaxKind::ObjectField,
                        name,
                        Span::default(),
                        &[value],
                    ));
                }
                self.expect(TokenKind::RBrace)?;
                self.leave_nested();
                Ok(self
                    .tree
                    .add_node(SyntaxKind::ObjectValue, span, Span::default(), &fields))
            }
            _ => Err(self.error_expected("a value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> SyntaxTree {
        let source = SourceText::new(input);
        parse(&source).expect("should parse")
    }

    fn parse_err(input: &str) -> SyntaxError {
        let source = SourceText::new(input);
        parse(&source).expect_err("should fail")
    }

    #[test]
    fn test_shorthand_query() {
        let tree = parse_ok("{ user { id name } }");
        assert_eq!(
            tree.structure(),
            "(Document (Operation (SelectionSet (Field (SelectionSet (Field) (Field))))))"
        );
    }

    #[test]
    fn test_named_operation_with_variables() {
        let tree = parse_ok("query GetUser($id: ID!, $n: Int = 3) { user(id: $id) { name } }");
        assert_eq!(
            tree.structure(),
            "(Document (Operation (VariableDefinitions \
             (VariableDefinition (NonNullType (NamedType))) \
             (VariableDefinition (NamedType) (IntValue))) \
             (SelectionSet (Field (Arguments (Argument (Variable))) \
             (SelectionSet (Field))))))"
        );
    }

    #[test]
    fn test_fragments() {
        let tree = parse_ok(
            "query { dog { ...Names ... on Pet { owner } } } fragment Names on Dog { name }",
        );
        assert_eq!(
            tree.structure(),
            "(Document (Operation (SelectionSet (Field (SelectionSet \
             (FragmentSpread) (InlineFragment (SelectionSet (Field))))))) \
             (FragmentDefinition (SelectionSet (Field))))"
        );
    }

    #[test]
    fn test_alias_and_directives() {
        let tree = parse_ok("{ big: field @include(if: true) }");
        assert_eq!(
            tree.structure(),
            "(Document (Operation (SelectionSet (Field (Directive (Arguments (Argument (BooleanValue))))))))"
        );
        // The field node carries both the alias and the name slices.
        let op = tree.children(tree.root()).next().unwrap();
        let set = tree.children(op).next().unwrap();
        let field = tree.children(set).next().unwrap();
        assert!(!tree.node(field).secondary.is_empty());
    }

    #[test]
    fn test_value_kinds() {
        let tree = parse_ok(r#"{ f(a: 1, b: 2.5, c: "x", d: true, e: null, g: RED, h: [1 2], i: {k: 1}) }"#);
        let structure = tree.structure();
        for kind in [
            "IntValue",
            "FloatValue",
            "StringValue",
            "BooleanValue",
            "NullValue",
            "EnumValue",
            "ListValue",
            "ObjectValue",
        ] {
            assert!(structure.contains(kind), "missing {kind} in {structure}");
        }
    }

    #[test]
    fn test_round_trip_structure_is_stable() {
        let input = "query Q { a { b ...F } } fragment F on T { c }";
        let first = parse_ok(input).structure();
        let second = parse_ok(input).structure();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_selection_set_rejected() {
        let err = parse_err("{ }");
        assert!(matches!(err, SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_unterminated_string_reports_location() {
        let err = parse_err("{ f(a: \"oops) }\n");
        let loc = err.location();
        assert_eq!(loc.line, 1);
        assert!(matches!(err, SyntaxError::InvalidToken { .. }));
    }

    #[test]
    fn test_stray_definition_rejected() {
        let err = parse_err("type User { id: ID }");
        assert!(matches!(err, SyntaxError::ExpectedDefinition { .. }));
    }

    #[test]
    fn test_variable_in_default_rejected() {
        let err = parse_err("query Q($a: Int = $b) { f }");
        assert!(matches!(err, SyntaxError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_runaway_nesting_rejected() {
        let mut input = String::new();
        for _ in 0..200 {
            input.push_str("{ f ");
        }
        let err = parse_err(&input);
        assert!(matches!(err, SyntaxError::NestingTooDeep { limit: 128, .. }));
    }

    #[test]
    fn test_deep_but_bounded_query_parses() {
        let mut input = String::new();
        for _ in 0..40 {
            input.push_str("{ f ");
        }
        input.push_str("{ leaf }");
        for _ in 0..40 {
            input.push('}');
        }
        parse_ok(&input);
    }

    #[test]
    fn test_fragment_named_on_rejected() {
        let err = parse_err("fragment on on T { x }");
        assert!(matches!(err, SyntaxError::UnexpectedToken { .. }));
    }
}
