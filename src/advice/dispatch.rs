//! Call classification.
//!
//! Every call on an observed session is described by an [`Invocation`]:
//! the operation name plus its arguments. [`classify`] decides whether the
//! call is observed and, if so, normalizes its arguments into a [`Statement`].

use crate::interfaces::Result;
use crate::observation::OperationKind;
use crate::statement::{Argument, Statement};

/// An intercepted session call.
#[derive(Debug, Clone)]
pub struct Invocation {
    operation: String,
    arguments: Vec<Argument>,
}

impl Invocation {
    pub fn new(operation: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }

    /// Invocation of an observed operation with a single statement argument.
    pub fn of(kind: OperationKind, statement: Statement) -> Self {
        Self::new(kind.name(), vec![Argument::Statement(statement)])
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn into_arguments(self) -> Vec<Argument> {
        self.arguments
    }

    /// Normalize the arguments into a statement.
    pub fn into_statement(self) -> Result<Statement> {
        Statement::from_arguments(self.arguments)
    }
}

/// How an invocation is handled.
#[derive(Debug)]
pub enum Dispatch {
    /// Forward untouched.
    Passthrough(Invocation),
    /// Observe `statement` as an operation of `kind`.
    Observe {
        kind: OperationKind,
        statement: Statement,
    },
}

/// Classify an invocation.
///
/// Observed operations with no arguments pass through. Observed operations
/// whose arguments do not form a statement fail with
/// [`SessionError::UnsupportedArguments`](crate::interfaces::SessionError).
pub fn classify(invocation: Invocation) -> Result<Dispatch> {
    let kind = match OperationKind::from_name(invocation.operation()) {
        Some(kind) if !invocation.arguments.is_empty() => kind,
        _ => return Ok(Dispatch::Passthrough(invocation)),
    };

    let statement = invocation.into_statement()?;
    Ok(Dispatch::Observe { kind, statement })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::SessionError;
    use crate::statement::{BindValues, Value};

    #[test]
    fn test_unknown_operation_passes_through() {
        let invocation = Invocation::new("check_schema_agreement", vec![]);
        match classify(invocation).unwrap() {
            Dispatch::Passthrough(invocation) => {
                assert_eq!(invocation.operation(), "check_schema_agreement");
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation_keeps_arguments() {
        let invocation = Invocation::new(
            "execute_reactive",
            vec!["SELECT 1".into(), Argument::Value(Value::Int(3))],
        );
        match classify(invocation).unwrap() {
            Dispatch::Passthrough(invocation) => {
                let arguments = invocation.into_arguments();
                assert_eq!(arguments.len(), 2);
                assert!(matches!(&arguments[0], Argument::Text(q) if q == "SELECT 1"));
                assert!(matches!(&arguments[1], Argument::Value(Value::Int(3))));
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_observed_operation_without_arguments_passes_through() {
        for kind in OperationKind::ALL {
            let dispatch = classify(Invocation::new(kind.name(), vec![])).unwrap();
            assert!(matches!(dispatch, Dispatch::Passthrough(_)));
        }
    }

    #[test]
    fn test_observed_operation_builds_statement() {
        let invocation = Invocation::new(
            "prepare",
            vec![
                "INSERT INTO t (id) VALUES (?)".into(),
                Argument::Values(vec![Value::Int(1)]),
            ],
        );
        match classify(invocation).unwrap() {
            Dispatch::Observe { kind, statement } => {
                assert_eq!(kind, OperationKind::Prepare);
                assert_eq!(
                    statement.values(),
                    &BindValues::Positional(vec![Value::Int(1)])
                );
            }
            other => panic!("expected observe, got {:?}", other),
        }
    }

    #[test]
    fn test_observed_operation_with_bad_arguments_fails() {
        let invocation = Invocation::new("execute_async", vec![Argument::Value(Value::Null)]);
        assert!(matches!(
            classify(invocation),
            Err(SessionError::UnsupportedArguments { .. })
        ));
    }
}
