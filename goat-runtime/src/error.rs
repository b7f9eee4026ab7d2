use std::fmt;

use crate::object::ObjectKind;
use crate::universe::Universe;
use crate::value::Value;

/// The result of a runtime operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents a runtime exception.
///
/// Raised synchronously at the violation point, and left to the evaluator to propagate.
/// Once materialized through `Error::into_value`, an exception is an ordinary object
/// that user code can catch and inspect.
#[derive(Debug, Clone)]
pub enum Error {
    /// A capability was invoked on an object that lacks it.
    OperationNotSupported(String),
    /// A built-in received a wrongly shaped or typed argument.
    IllegalArgument(String),
    /// A lookup missed across the whole prototype chain, with the looked-up name (if known).
    ReferenceError(Option<String>),
    /// A value thrown by user code.
    Thrown(Value),
}

impl Error {
    /// The name of the exception's prototype.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::OperationNotSupported(_) => "OperationNotSupported",
            Error::IllegalArgument(_) => "IllegalArgument",
            Error::ReferenceError(_) => "ReferenceError",
            Error::Thrown(_) => "Thrown",
        }
    }

    /// The message carried by the exception.
    pub fn message(&self) -> String {
        match self {
            Error::OperationNotSupported(message) | Error::IllegalArgument(message) => {
                message.clone()
            }
            Error::ReferenceError(Some(name)) => format!("'{}' is not defined", name),
            Error::ReferenceError(None) => String::from("undefined reference"),
            Error::Thrown(value) => value.to_string(),
        }
    }

    /// Turns this exception into a runtime object, whose prototype is the matching exception prototype.
    pub fn into_value(self, universe: &Universe) -> Value {
        let prototype = match &self {
            Error::OperationNotSupported(_) => &universe.core.operation_not_supported,
            Error::IllegalArgument(_) => &universe.core.illegal_argument,
            Error::ReferenceError(_) => &universe.core.reference_error,
            Error::Thrown(value) => return value.clone(),
        };
        let exception = universe.allocate(
            ObjectKind::Exception(self.to_string().into_boxed_str()),
            vec![prototype.clone()],
        );
        let message = universe.new_string(self.message());
        exception.set_attribute_unchecked(universe.key("message"), message);
        Value::from(exception)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Thrown(value) => write!(f, "{}", value),
            _ => write!(f, "{}: {}", self.kind_name(), self.message()),
        }
    }
}

impl std::error::Error for Error {}
