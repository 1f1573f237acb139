//! Canned programs for integration tests: a symbol database plus the parsed
//! tree of each source file, built by hand in the shape the Ruby parser emits.
#![allow(dead_code)]

use callpath::app::engine::Analysis;
use callpath::domain::ast::{Child, Node, NodeKind, SourceSpan, SourceTree};
use callpath::domain::symbols::{
    ConstantRef, DefinitionSite, ModuleKind, ParamKind, Parameter, SymbolTable,
};

pub struct Program {
    pub symbols: SymbolTable,
    pub trees: Vec<SourceTree>,
}

impl Program {
    pub fn analysis(self) -> Analysis {
        Analysis::build(self.symbols, &self.trees).expect("fixture program extracts")
    }
}

// --- AST builders -------------------------------------------------------------

pub fn n(kind: &str, line: u32, children: Vec<Child>) -> Node {
    Node::new(NodeKind::from(kind), children, SourceSpan::line(line))
}

fn body(line: u32, mut statements: Vec<Node>) -> Child {
    match statements.len() {
        0 => Child::Nil,
        1 => statements.remove(0).into(),
        _ => begin(line, statements).into(),
    }
}

pub fn begin(line: u32, statements: Vec<Node>) -> Node {
    n("begin", line, statements.into_iter().map(Child::from).collect())
}

pub fn send(line: u32, receiver: Option<Node>, name: &str, args: Vec<Node>) -> Node {
    let mut children = vec![Child::from(receiver), name.into()];
    children.extend(args.into_iter().map(Child::from));
    n("send", line, children)
}

/// Receiverless call, `name(args)`.
pub fn call(line: u32, name: &str, args: Vec<Node>) -> Node {
    send(line, None, name, args)
}

pub fn konst(line: u32, name: &str) -> Node {
    n("const", line, vec![Child::Nil, name.into()])
}

pub fn int(line: u32, value: i64) -> Node {
    n("int", line, vec![Child::Int(value)])
}

pub fn lvar(line: u32, name: &str) -> Node {
    n("lvar", line, vec![name.into()])
}

pub fn arg(line: u32, name: &str) -> Node {
    n("arg", line, vec![name.into()])
}

pub fn blockarg(line: u32, name: &str) -> Node {
    n("blockarg", line, vec![name.into()])
}

pub fn block_pass(line: u32, var: &str) -> Node {
    n("block_pass", line, vec![lvar(line, var).into()])
}

pub fn splat(line: u32, value: Node) -> Node {
    n("splat", line, vec![value.into()])
}

pub fn array(line: u32) -> Node {
    n("array", line, vec![])
}

pub fn yield_(line: u32) -> Node {
    n("yield", line, vec![])
}

pub fn args(line: u32, params: Vec<Node>) -> Node {
    n("args", line, params.into_iter().map(Child::from).collect())
}

pub fn def(line: u32, name: &str, params: Vec<Node>, statements: Vec<Node>) -> Node {
    n(
        "def",
        line,
        vec![name.into(), args(line, params).into(), body(line, statements)],
    )
}

/// `def self.name`.
pub fn defs(line: u32, name: &str, params: Vec<Node>, statements: Vec<Node>) -> Node {
    n(
        "defs",
        line,
        vec![
            n("self", line, vec![]).into(),
            name.into(),
            args(line, params).into(),
            body(line, statements),
        ],
    )
}

/// `call do |params| statements end`.
pub fn block(line: u32, call: Node, params: Vec<Node>, statements: Vec<Node>) -> Node {
    n(
        "block",
        line,
        vec![call.into(), args(line, params).into(), body(line, statements)],
    )
}

pub fn module(line: u32, name: &str, statements: Vec<Node>) -> Node {
    n(
        "module",
        line,
        vec![konst(line, name).into(), body(line, statements)],
    )
}

pub fn class(line: u32, name: &str, statements: Vec<Node>) -> Node {
    n(
        "class",
        line,
        vec![konst(line, name).into(), Child::Nil, body(line, statements)],
    )
}

pub fn site(file: &str, line: u32) -> Option<DefinitionSite> {
    Some(DefinitionSite::new(file, line))
}

// --- Programs -----------------------------------------------------------------

/// ```ruby
/// def fact(n)        # 1
///   fact(n)          # 2
/// end
///
/// fact(10)           # 5
/// ```
pub fn recursion() -> Program {
    let mut symbols = SymbolTable::new();
    let root = symbols.root();
    symbols.add_method(
        root,
        "fact",
        false,
        vec![Parameter::new(ParamKind::Req, "n")],
        site("test1.rb", 1),
    );

    let tree = begin(
        1,
        vec![
            def(1, "fact", vec![arg(1, "n")], vec![call(2, "fact", vec![lvar(2, "n")])]),
            call(5, "fact", vec![int(5, 10)]),
        ],
    );
    Program {
        symbols,
        trees: vec![SourceTree::new("test1.rb", tree)],
    }
}

/// Two modules defining `test1` with different arities, and entry points that
/// call it with different argument lists.
///
/// ```ruby
/// module Module1         # 1
///   def test1(a, b)      # 2
///   end
/// end
///
/// module Module2         # 6
///   def test1()          # 7
///   end
/// end
///
/// def entry1; test1(); end        # 11
/// def entry2; test1(1, 2); end    # 16
/// def entry3; test1(1); end       # 21
/// def entry4; test1(*[]); end     # 26
/// ```
pub fn arity() -> Program {
    let file = "test2.rb";
    let mut symbols = SymbolTable::new();
    let root = symbols.root();
    let m1 = symbols.add_module(root, "Module1", ModuleKind::Module);
    let m2 = symbols.add_module(root, "Module2", ModuleKind::Module);
    symbols.add_method(
        m1,
        "test1",
        false,
        vec![
            Parameter::new(ParamKind::Req, "a"),
            Parameter::new(ParamKind::Req, "b"),
        ],
        site(file, 2),
    );
    symbols.add_method(m2, "test1", false, vec![], site(file, 7));
    for (name, line) in [("entry1", 11), ("entry2", 16), ("entry3", 21), ("entry4", 26)] {
        symbols.add_method(root, name, false, vec![], site(file, line));
    }

    let tree = begin(
        1,
        vec![
            module(1, "Module1", vec![def(2, "test1", vec![arg(2, "a"), arg(2, "b")], vec![])]),
            module(6, "Module2", vec![def(7, "test1", vec![], vec![])]),
            def(11, "entry1", vec![], vec![call(13, "test1", vec![])]),
            def(16, "entry2", vec![], vec![call(18, "test1", vec![int(18, 1), int(18, 2)])]),
            def(21, "entry3", vec![], vec![call(23, "test1", vec![int(23, 1)])]),
            def(26, "entry4", vec![], vec![call(28, "test1", vec![splat(28, array(28))])]),
        ],
    );
    Program {
        symbols,
        trees: vec![SourceTree::new(file, tree)],
    }
}

/// ```ruby
/// module Module1         # 1
///   def self.f() end     # 2
/// end
///
/// module Module2         # 6
///   def self.f() end     # 7
/// end
///
/// def entry1             # 11
///   Module1.f            # 13
/// end
///
/// def entry2             # 16
///   Module2.f            # 18
/// end
///
/// entry1                 # 21
/// ```
pub fn singleton_dispatch() -> Program {
    let file = "test3.rb";
    let mut symbols = SymbolTable::new();
    let root = symbols.root();
    let m1 = symbols.add_module(root, "Module1", ModuleKind::Module);
    let m2 = symbols.add_module(root, "Module2", ModuleKind::Module);
    symbols.add_method(m1, "f", true, vec![], site(file, 2));
    symbols.add_method(m2, "f", true, vec![], site(file, 7));
    symbols.add_method(root, "entry1", false, vec![], site(file, 11));
    symbols.add_method(root, "entry2", false, vec![], site(file, 16));

    let tree = begin(
        1,
        vec![
            module(1, "Module1", vec![defs(2, "f", vec![], vec![])]),
            module(6, "Module2", vec![defs(7, "f", vec![], vec![])]),
            def(11, "entry1", vec![], vec![send(13, Some(konst(13, "Module1")), "f", vec![])]),
            def(16, "entry2", vec![], vec![send(18, Some(konst(18, "Module2")), "f", vec![])]),
            call(21, "entry1", vec![]),
        ],
    );
    Program {
        symbols,
        trees: vec![SourceTree::new(file, tree)],
    }
}

/// Constants bound to instances narrow the receiver class.
///
/// ```ruby
/// class String;  def f; end; end   # 1, 2
/// class Array;   def f; end; end   # 5, 6
/// class Integer; def f; end; end   # 9, 10
///
/// module A                         # 13
///   X = ""                         # 14
///   def g                          # 15
///     X.f                          # 16
///   end
///
///   module B                       # 18
///     X = []                       # 19
///     def g                        # 20
///       X.f                        # 21
///     end
///   end
/// end
///
/// def entry                        # 26
///   g                              # 27
/// end
///
/// entry                            # 30
/// ```
pub fn instance_constants() -> Program {
    let file = "test5.rb";
    let mut symbols = SymbolTable::new();
    let root = symbols.root();
    let string = symbols.add_module(root, "String", ModuleKind::Class);
    let array_class = symbols.add_module(root, "Array", ModuleKind::Class);
    let integer = symbols.add_module(root, "Integer", ModuleKind::Class);
    symbols.add_method(string, "f", false, vec![], site(file, 2));
    symbols.add_method(array_class, "f", false, vec![], site(file, 6));
    symbols.add_method(integer, "f", false, vec![], site(file, 10));

    let a = symbols.add_module(root, "A", ModuleKind::Module);
    symbols.set_constant(a, "X", ConstantRef::InstanceOf(string));
    symbols.add_method(a, "g", false, vec![], site(file, 15));
    let b = symbols.add_module(a, "B", ModuleKind::Module);
    symbols.set_constant(b, "X", ConstantRef::InstanceOf(array_class));
    symbols.add_method(b, "g", false, vec![], site(file, 20));
    symbols.add_method(root, "entry", false, vec![], site(file, 26));

    let casgn = |line: u32, value: Node| n("casgn", line, vec![Child::Nil, "X".into(), value.into()]);
    let tree = begin(
        1,
        vec![
            class(1, "String", vec![def(2, "f", vec![], vec![])]),
            class(5, "Array", vec![def(6, "f", vec![], vec![])]),
            class(9, "Integer", vec![def(10, "f", vec![], vec![])]),
            module(
                13,
                "A",
                vec![
                    casgn(14, n("str", 14, vec!["".into()])),
                    def(15, "g", vec![], vec![send(16, Some(konst(16, "X")), "f", vec![])]),
                    module(
                        18,
                        "B",
                        vec![
                            casgn(19, array(19)),
                            def(20, "g", vec![], vec![send(21, Some(konst(21, "X")), "f", vec![])]),
                        ],
                    ),
                ],
            ),
            def(26, "entry", vec![], vec![call(27, "g", vec![])]),
            call(30, "entry", vec![]),
        ],
    );
    Program {
        symbols,
        trees: vec![SourceTree::new(file, tree)],
    }
}

/// Blocks, yields and block forwarding.
///
/// ```ruby
/// def f                       # 1
///   yield if block_given?     # 2
/// end
///
/// def g                       # 5
/// end
///
/// f do                        # 8
///   g                         # 9
/// end
///
/// def h(&block)               # 12
///   f &block                  # 13
/// end
///
/// def i()                     # 16
///   block = proc {}           # 17
///   f &block                  # 18
/// end
///
/// h do                        # 21
///   g                         # 22
/// end
///
/// f                           # 25
///
/// def test1                   # 27
///   [].each do |_|            # 28
///     f do |_|                # 29
///       yield                 # 30
///     end
///   end
/// end
///
/// test1 do                    # 35
///   i                         # 36
/// end
///
/// test1 do                    # 39
///   p 1                       # 40
/// end
/// ```
///
/// `Array#each` is in the database without a definition site, as builtins are.
pub fn blocks() -> Program {
    let file = "test6.rb";
    let mut symbols = SymbolTable::new();
    let root = symbols.root();
    symbols.add_method(root, "f", false, vec![], site(file, 1));
    symbols.add_method(root, "g", false, vec![], site(file, 5));
    symbols.add_method(
        root,
        "h",
        false,
        vec![Parameter::new(ParamKind::Block, "block")],
        site(file, 12),
    );
    symbols.add_method(root, "i", false, vec![], site(file, 16));
    symbols.add_method(root, "test1", false, vec![], site(file, 27));
    let array_class = symbols.add_module(root, "Array", ModuleKind::Class);
    symbols.add_method(array_class, "each", false, vec![], None);

    let tree = begin(
        1,
        vec![
            def(
                1,
                "f",
                vec![],
                vec![n(
                    "if",
                    2,
                    vec![call(2, "block_given?", vec![]).into(), yield_(2).into(), Child::Nil],
                )],
            ),
            def(5, "g", vec![], vec![]),
            block(8, call(8, "f", vec![]), vec![], vec![call(9, "g", vec![])]),
            def(12, "h", vec![blockarg(12, "block")], vec![call(13, "f", vec![block_pass(13, "block")])]),
            def(
                16,
                "i",
                vec![],
                vec![
                    n(
                        "lvasgn",
                        17,
                        vec!["block".into(), block(17, call(17, "proc", vec![]), vec![], vec![]).into()],
                    ),
                    call(18, "f", vec![block_pass(18, "block")]),
                ],
            ),
            block(21, call(21, "h", vec![]), vec![], vec![call(22, "g", vec![])]),
            call(25, "f", vec![]),
            def(
                27,
                "test1",
                vec![],
                vec![block(
                    28,
                    send(28, Some(array(28)), "each", vec![]),
                    vec![arg(28, "_")],
                    vec![block(29, call(29, "f", vec![]), vec![arg(29, "_")], vec![yield_(30)])],
                )],
            ),
            block(35, call(35, "test1", vec![]), vec![], vec![call(36, "i", vec![])]),
            block(39, call(39, "test1", vec![]), vec![], vec![call(40, "p", vec![int(40, 1)])]),
        ],
    );
    Program {
        symbols,
        trees: vec![SourceTree::new(file, tree)],
    }
}

/// Symbol database of [`recursion`] in its on-disk JSON form.
pub const RECURSION_DATABASE_JSON: &str = r#"{
  "root": 0,
  "modules": [{ "name": "Object", "instance_methods": [0] }],
  "methods": [
    {
      "name": "fact",
      "owner": 0,
      "parameters": [{ "kind": "req", "name": "n" }],
      "location": { "file": "test1.rb", "line": 1 }
    }
  ]
}"#;
