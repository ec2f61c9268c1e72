//! Structural scan of Python source.
//!
//! Parses with the tree-sitter Python grammar and walks the syntax tree,
//! counting the constructs the feature encoder needs. Source the grammar
//! rejects is reported as a [`ScanError`].

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use tree_sitter::{Node, Parser, Tree};

thread_local! {
    /// Tree-sitter parsers are not thread-safe
    static PARSER: RefCell<Parser> = RefCell::new(Parser::new());
}

/// Errors that make source unscannable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The Python grammar could not be loaded into the parser
    #[error("failed to load Python grammar: {0}")]
    Language(String),

    /// The parser gave up without producing a tree
    #[error("parser returned no tree")]
    Parse,

    /// The tree contains error or missing nodes
    #[error("line {line}, column {column}: invalid syntax")]
    Syntax {
        /// 1-based line of the first error
        line: usize,
        /// 1-based column of the first error
        column: usize,
    },
}

/// Counts of selected syntax nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounts {
    /// Function definitions
    pub defs: usize,
    /// `for` statements
    pub fors: usize,
    /// `while` statements
    pub whiles: usize,
    /// `if` / `elif` statements
    pub ifs: usize,
    /// List literals
    pub lists: usize,
    /// Dict literals
    pub dicts: usize,
    /// Set literals
    pub sets: usize,
    /// Tuples, parenthesized or bare
    pub tuples: usize,
    /// Calls
    pub calls: usize,
    /// Binary arithmetic and bitwise operators
    pub binops: usize,
}

/// Structural summary of a piece of source code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Newline-separated lines
    pub lines: usize,
    /// Characters
    pub chars: usize,
    /// Function definitions (sync and async)
    pub functions: usize,
    /// Class definitions
    pub classes: usize,
    /// Import statements
    pub imports: usize,
    /// Decorators
    pub decorators: usize,
    /// Highest cyclomatic complexity of any function (or the module body)
    pub max_complexity: usize,
    /// Deepest loop/conditional nesting
    pub max_nesting: usize,
    /// Mean nesting depth of loop, conditional and `with` statements
    pub avg_nesting: f64,
    /// Whether some function calls itself
    pub recursive: bool,
    /// Node counts
    pub nodes: NodeCounts,
    /// `try` statements
    pub tries: usize,
    /// Lines whose first non-blank character is `#`
    pub comment_lines: usize,
    /// Functions and classes that open with a docstring
    pub docstrings: usize,
    /// Mean length of non-blank lines
    pub avg_line_length: f64,
    /// Longest line
    pub max_line_length: usize,
    /// Longest function, in lines
    pub max_function_length: usize,
    /// Mean function length, in lines
    pub avg_function_length: f64,
    /// List comprehensions
    pub list_comprehensions: usize,
    /// Generator expressions
    pub generator_expressions: usize,
    /// Lambda expressions
    pub lambdas: usize,
}

impl ScanReport {
    /// `for` plus `while` statements.
    pub fn loops(&self) -> usize {
        self.nodes.fors + self.nodes.whiles
    }
}

fn parse(code: &str) -> Result<Tree, ScanError> {
    PARSER.with(|parser| {
        let mut parser = parser.borrow_mut();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ScanError::Language(e.to_string()))?;
        parser.parse(code, None).ok_or(ScanError::Parse)
    })
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// First error or missing node, depth first.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    children(node).into_iter().find_map(first_error)
}

/// Last row that holds part of the node's text.
fn last_row(node: Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    }
}

/// Enclosing function while walking.
#[derive(Debug, Clone, Copy)]
struct Scope<'a> {
    /// Index into the complexity table; 0 is the module body
    unit: usize,
    name: Option<&'a str>,
}

struct Walker<'a> {
    source: &'a str,
    report: ScanReport,
    complexities: Vec<usize>,
    function_lengths: Vec<usize>,
    nesting_depths: Vec<usize>,
}

impl<'a> Walker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            report: ScanReport::default(),
            complexities: vec![1],
            function_lengths: Vec::new(),
            nesting_depths: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> Option<&'a str> {
        node.utf8_text(self.source.as_bytes()).ok()
    }

    fn nest(&mut self, depth: usize) {
        self.report.max_nesting = self.report.max_nesting.max(depth);
        self.nesting_depths.push(depth);
    }

    fn has_docstring(&self, definition: Node<'_>) -> bool {
        let Some(body) = definition.child_by_field_name("body") else {
            return false;
        };
        let mut cursor = body.walk();
        let first = body
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        first.is_some_and(|statement| {
            statement.kind() == "expression_statement"
                && statement.named_child_count() == 1
                && statement
                    .named_child(0)
                    .is_some_and(|expr| matches!(expr.kind(), "string" | "concatenated_string"))
        })
    }

    /// Flag recursion when a function calls its own name, directly or
    /// through `self.` / `cls.`.
    fn note_call(&mut self, call: Node<'_>, scope: Scope<'a>) {
        let (Some(name), Some(callee)) = (scope.name, call.child_by_field_name("function")) else {
            return;
        };
        let direct = match callee.kind() {
            "identifier" => self.text(callee) == Some(name),
            "attribute" => {
                let object = callee.child_by_field_name("object");
                let attribute = callee.child_by_field_name("attribute");
                object.is_some_and(|o| {
                    o.kind() == "identifier" && matches!(self.text(o), Some("self" | "cls"))
                }) && attribute.is_some_and(|a| self.text(a) == Some(name))
            }
            _ => false,
        };
        if direct {
            self.report.recursive = true;
        }
    }

    fn walk_children(&mut self, node: Node<'_>, scope: Scope<'a>, depth: usize) {
        for child in children(node) {
            self.walk(child, scope, depth);
        }
    }

    fn walk(&mut self, node: Node<'_>, scope: Scope<'a>, depth: usize) {
        match node.kind() {
            "function_definition" => {
                self.report.functions += 1;
                self.report.nodes.defs += 1;
                self.function_lengths
                    .push(last_row(node) - node.start_position().row + 1);
                if self.has_docstring(node) {
                    self.report.docstrings += 1;
                }

                self.complexities.push(1);
                let inner = Scope {
                    unit: self.complexities.len() - 1,
                    name: node.child_by_field_name("name").and_then(|n| self.text(n)),
                };
                // Parameters and defaults belong to the enclosing scope.
                let body = node.child_by_field_name("body");
                for child in children(node) {
                    let child_scope = if Some(child) == body { inner } else { scope };
                    self.walk(child, child_scope, depth);
                }
                return;
            }
            "class_definition" => {
                self.report.classes += 1;
                if self.has_docstring(node) {
                    self.report.docstrings += 1;
                }
            }
            "if_statement" => {
                self.report.nodes.ifs += 1;
                self.complexities[scope.unit] += 1;
                self.nest(depth + 1);
                self.walk_children(node, scope, depth + 1);
                return;
            }
            // Children of the `if`, so already one level in.
            "elif_clause" => {
                self.report.nodes.ifs += 1;
                self.complexities[scope.unit] += 1;
                self.nest(depth);
            }
            "for_statement" | "while_statement" => {
                if node.kind() == "for_statement" {
                    self.report.nodes.fors += 1;
                } else {
                    self.report.nodes.whiles += 1;
                }
                self.complexities[scope.unit] += 1;
                self.nest(depth + 1);
                self.walk_children(node, scope, depth + 1);
                return;
            }
            "with_statement" => self.nest(depth + 1),
            "try_statement" => self.report.tries += 1,
            "except_clause" | "except_group_clause" => self.complexities[scope.unit] += 1,
            "boolean_operator" | "conditional_expression" | "for_in_clause" | "if_clause" => {
                self.complexities[scope.unit] += 1
            }
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.report.imports += 1;
                return;
            }
            "decorator" => self.report.decorators += 1,
            "call" => {
                self.report.nodes.calls += 1;
                self.note_call(node, scope);
            }
            "binary_operator" => self.report.nodes.binops += 1,
            "list" => self.report.nodes.lists += 1,
            "dictionary" => self.report.nodes.dicts += 1,
            "set" => self.report.nodes.sets += 1,
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => {
                self.report.nodes.tuples += 1
            }
            "list_comprehension" => self.report.list_comprehensions += 1,
            "generator_expression" => self.report.generator_expressions += 1,
            "lambda" => self.report.lambdas += 1,
            _ => {}
        }
        self.walk_children(node, scope, depth);
    }

    fn finish(self) -> ScanReport {
        let code = self.source;
        let mut report = self.report;
        report.lines = code.split('\n').count();
        report.chars = code.chars().count();
        report.max_complexity = self.complexities.iter().copied().max().unwrap_or(1);

        let lengths: Vec<usize> = code
            .split('\n')
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.chars().count())
            .collect();
        report.max_line_length = lengths.iter().copied().max().unwrap_or(0);
        report.avg_line_length = mean(&lengths);
        report.comment_lines = code
            .split('\n')
            .filter(|l| l.trim_start().starts_with('#'))
            .count();

        report.max_function_length = self.function_lengths.iter().copied().max().unwrap_or(0);
        report.avg_function_length = mean(&self.function_lengths);
        report.avg_nesting = mean(&self.nesting_depths);
        report
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

/// Scan source code into a [`ScanReport`].
pub fn scan(code: &str) -> Result<ScanReport, ScanError> {
    let tree = parse(code)?;
    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(ScanError::Syntax {
            line: at.row + 1,
            column: at.column + 1,
        });
    }

    let mut walker = Walker::new(code);
    walker.walk(root, Scope { unit: 0, name: None }, 0);
    Ok(walker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIB: &str = "\
def fib(n):
    \"\"\"Naive fibonacci.\"\"\"
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)

print(fib(20))
";

    #[test]
    fn test_scan_recursive_function() {
        let report = scan(FIB).unwrap();
        assert_eq!(report.functions, 1);
        assert!(report.recursive);
        assert_eq!(report.docstrings, 1);
        assert_eq!(report.nodes.ifs, 1);
        assert_eq!(report.nodes.calls, 4);
        assert_eq!(report.nodes.binops, 3);
        assert_eq!(report.max_complexity, 2);
        assert_eq!(report.max_nesting, 1);
        assert_eq!(report.max_function_length, 5);
        assert_eq!(report.lines, 8);
    }

    #[test]
    fn test_calls_to_other_functions_are_not_recursion() {
        let code = "def f(x):\n    return g(x)\n\ndef g(x):\n    return x\n\nf(1)\n";
        let report = scan(code).unwrap();
        assert!(!report.recursive);
        assert_eq!(report.functions, 2);
    }

    #[test]
    fn test_method_recursion_through_self() {
        let code = "class A:\n    def walk(self, n):\n        if n:\n            self.walk(n - 1)\n";
        let report = scan(code).unwrap();
        assert!(report.recursive);
        assert_eq!(report.classes, 1);
        assert_eq!(report.docstrings, 0);
    }

    #[test]
    fn test_nested_loops() {
        let code = "\
total = 0
for i in range(10):
    for j in range(10):
        while j > 0:
            j -= 1
            total += i * j
";
        let report = scan(code).unwrap();
        assert_eq!(report.nodes.fors, 2);
        assert_eq!(report.nodes.whiles, 1);
        assert_eq!(report.loops(), 3);
        assert_eq!(report.max_nesting, 3);
        assert!((report.avg_nesting - 2.0).abs() < 1e-9);
        // module body: 1 + for + for + while
        assert_eq!(report.max_complexity, 4);
        assert_eq!(report.nodes.binops, 1);
    }

    #[test]
    fn test_elif_shares_nesting_level() {
        let code = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let report = scan(code).unwrap();
        assert_eq!(report.nodes.ifs, 2);
        assert_eq!(report.max_nesting, 1);
        assert_eq!(report.max_complexity, 3);
    }

    #[test]
    fn test_literals_and_comprehensions() {
        let code = "\
a = [1, 2, 3]
b = {'k': 1}
c = {1, 2}
d = (1, 2)
e = [x * 2 for x in a if x]
f = sum(x for x in a)
g = {}
h = lambda y: y + 1
i, j = 1, 2
k = a[0]
";
        let report = scan(code).unwrap();
        assert_eq!(report.nodes.lists, 1);
        assert_eq!(report.nodes.dicts, 2);
        assert_eq!(report.nodes.sets, 1);
        assert_eq!(report.nodes.tuples, 3);
        assert_eq!(report.list_comprehensions, 1);
        assert_eq!(report.generator_expressions, 1);
        assert_eq!(report.lambdas, 1);
        assert_eq!(report.nodes.calls, 1);
    }

    #[test]
    fn test_imports_decorators_and_comments() {
        let code = "\
# utilities
import math
from functools import lru_cache

@lru_cache(maxsize=None)
def area(r):
    return math.pi * r ** 2
";
        let report = scan(code).unwrap();
        assert_eq!(report.imports, 2);
        assert_eq!(report.decorators, 1);
        assert_eq!(report.comment_lines, 1);
        assert_eq!(report.nodes.calls, 1);
        assert_eq!(report.nodes.binops, 2);
    }

    #[test]
    fn test_inline_bodies() {
        let code = "def f(): return 1\nif True: x = 1; y = 2\nelse: pass\n";
        let report = scan(code).unwrap();
        assert_eq!(report.functions, 1);
        assert_eq!(report.max_function_length, 1);
        assert_eq!(report.nodes.ifs, 1);
    }

    #[test]
    fn test_async_and_match_statements() {
        let code = "\
async def main(items):
    async for item in items:
        match item:
            case 1:
                pass
            case _:
                pass
";
        let report = scan(code).unwrap();
        assert_eq!(report.functions, 1);
        assert_eq!(report.nodes.fors, 1);
    }

    #[test]
    fn test_lambda_inside_condition() {
        let report = scan("if any(map(lambda v: v > 0, xs)):\n    print(xs)\n").unwrap();
        assert_eq!(report.lambdas, 1);
        assert_eq!(report.nodes.ifs, 1);
    }

    #[test]
    fn test_missing_colon_is_syntax_error() {
        let err = scan("def f(x)\n    return x\n").unwrap_err();
        assert!(matches!(err, ScanError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_invalid_statements_are_rejected() {
        let snippets = [
            "def f(:\n    pass\n",
            "x = = 1\n",
            "return = 3\n",
            "x = 1 +\n",
            "for in range(3):\n    pass\n",
            "else:\n    pass\n",
            "import\n",
            "print(1 2)\n",
        ];
        for code in snippets {
            assert!(
                matches!(scan(code), Err(ScanError::Syntax { .. })),
                "accepted invalid code: {:?}",
                code
            );
        }
    }

    #[test]
    fn test_error_location_points_at_bad_line() {
        let err = scan("x = 1\ny = 2\nz = = 3\n").unwrap_err();
        assert!(matches!(err, ScanError::Syntax { line: 3, .. }));
    }
}
