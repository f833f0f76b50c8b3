//! Callbacks through which a pass delivers its results.

use jsbind_binding::{Binding, ResolvedAst};

/// Receiver of a pass's results.
///
/// For one unit, `accept_ast` comes before the `accept_binding` calls of the
/// keys that unit declares. Across units the order is the processing order,
/// not the submission order.
pub trait AstRequestor {
    fn accept_ast(&mut self, ast: ResolvedAst);

    /// `binding` is `None` when the key does not resolve.
    fn accept_binding(&mut self, key: &str, binding: Option<Binding>);
}

/// Keeps everything it is given, in delivery order.
#[derive(Debug, Default)]
pub struct CollectingRequestor {
    pub asts: Vec<ResolvedAst>,
    pub bindings: Vec<(String, Option<Binding>)>,
}

impl CollectingRequestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ast(&self, file_name: &str) -> Option<&ResolvedAst> {
        self.asts.iter().find(|ast| &**ast.file_name() == file_name)
    }

    /// The answer delivered for `key`; `Some(None)` when it did not resolve.
    pub fn binding(&self, key: &str) -> Option<Option<&Binding>> {
        self.bindings
            .iter()
            .find(|(delivered, _)| delivered == key)
            .map(|(_, binding)| binding.as_ref())
    }
}

impl AstRequestor for CollectingRequestor {
    fn accept_ast(&mut self, ast: ResolvedAst) {
        self.asts.push(ast);
    }

    fn accept_binding(&mut self, key: &str, binding: Option<Binding>) {
        self.bindings.push((key.to_string(), binding));
    }
}
