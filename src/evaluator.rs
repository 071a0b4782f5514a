use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::Error;
use crate::ast::Value;

/// An interned variable: the stable node every textual occurrence of one
/// name parses to, plus the binding cell `=` writes.
///
/// The cell starts empty; reading an unbound variable is an error.
/// Assignment replaces the cell contents in place, so every holder of the
/// node observes the new binding immediately.
pub struct Variable {
    name: String,
    binding: RefCell<Option<Value>>,
}

impl Variable {
    fn new(name: &str) -> Self {
        Variable {
            name: name.to_owned(),
            binding: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current binding, if any assignment has run yet
    pub fn fetch(&self) -> Option<Value> {
        self.binding.borrow().clone()
    }

    pub fn assign(&self, value: Value) {
        *self.binding.borrow_mut() = Some(value);
    }
}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The binding is omitted: a block bound to a variable it mentions
        // would recurse forever
        write!(f, "Variable({})", self.name)
    }
}

/// The process-wide variable table. Knight has a single global scope, so
/// this is a flat map from name to interned node.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, Rc<Variable>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            variables: HashMap::new(),
        }
    }

    /// The interned node for `name`, created unbound on first sight.
    /// Subsequent lookups of the same name return the same node.
    pub fn lookup_or_intern(&mut self, name: &str) -> Rc<Variable> {
        if let Some(var) = self.variables.get(name) {
            return Rc::clone(var);
        }
        let var = Rc::new(Variable::new(name));
        self.variables.insert(name.to_owned(), Rc::clone(&var));
        var
    }

    /// All variables and their bindings, sorted by name
    /// Returns a Vec of (name, binding) pairs; unbound variables show None
    pub fn get_all_bindings(&self) -> Vec<(String, Option<Value>)> {
        let mut result: Vec<_> = self
            .variables
            .values()
            .map(|var| (var.name().to_owned(), var.fetch()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Evaluate a value tree (public API)
///
/// Literals and lists are inert and return themselves. A variable returns
/// its current binding. A function node invokes its registered operation,
/// which receives the unevaluated argument subtrees and runs them itself;
/// that is what lets `IF`, `WHILE`, `&` and `BLOCK` control evaluation.
pub fn eval(expr: &Value, env: &mut Environment) -> Result<Value, Error> {
    match expr {
        Value::Integer(_)
        | Value::String(_)
        | Value::Boolean(_)
        | Value::Null
        | Value::List(_) => Ok(expr.clone()),

        Value::Variable(var) => var
            .fetch()
            .ok_or_else(|| Error::UnboundVariable(var.name().to_owned())),

        Value::Function { op, args } => (op.func)(args, env),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::parser::parse_program;

    #[test]
    fn test_interning_is_per_name() {
        let mut env = Environment::new();
        let a1 = env.lookup_or_intern("a");
        let a2 = env.lookup_or_intern("a");
        let b = env.lookup_or_intern("b");

        assert!(Rc::ptr_eq(&a1, &a2));
        assert!(!Rc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_inert_values_evaluate_to_themselves() {
        let mut env = Environment::new();
        let samples = vec![
            val(42),
            val("text"),
            val(true),
            Value::Null,
            val(vec![val(1), val("x")]),
        ];

        for value in samples {
            assert_eq!(eval(&value, &mut env).unwrap(), value);
        }
    }

    #[test]
    fn test_unbound_variable_read_fails() {
        let mut env = Environment::new();
        let var = Value::Variable(env.lookup_or_intern("nowhere"));

        match eval(&var, &mut env).unwrap_err() {
            Error::UnboundVariable(name) => assert_eq!(name, "nowhere"),
            other => panic!("expected UnboundVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_assignment_is_visible_through_the_interned_node() {
        let mut env = Environment::new();
        let var = env.lookup_or_intern("x");
        assert!(var.fetch().is_none());

        var.assign(val(10));
        assert_eq!(var.fetch(), Some(val(10)));

        // The node obtained later is the same cell
        let again = Value::Variable(env.lookup_or_intern("x"));
        assert_eq!(eval(&again, &mut env).unwrap(), val(10));
    }

    #[test]
    fn test_function_nodes_run_their_operation() {
        let mut env = Environment::new();
        let program = parse_program("+ 1 2", &mut env).unwrap();
        assert_eq!(eval(&program, &mut env).unwrap(), val(3));
    }

    #[test]
    fn test_environment_listing_is_sorted() {
        let mut env = Environment::new();
        env.lookup_or_intern("zeta");
        env.lookup_or_intern("alpha").assign(val(1));

        let bindings = env.get_all_bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].0, "alpha");
        assert_eq!(bindings[0].1, Some(val(1)));
        assert_eq!(bindings[1].0, "zeta");
        assert_eq!(bindings[1].1, None);
    }
}
