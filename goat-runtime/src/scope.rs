use crate::attributes::Key;
use crate::error::{Error, Result};
use crate::object::ObjectKind;
use crate::universe::Universe;
use crate::value::Value;
use crate::ObjectRef;

/// Lexical environments, built on top of prototypes.
///
/// Declarations write to the innermost scope's own attributes, while reads fall through
/// the prototype chain, which gives lexical shadowing from ordinary attribute lookup.
pub trait Scope {
    /// Creates a scope whose sole prototype is this one (block entry).
    fn clone_scope(&self, universe: &Universe) -> ObjectRef;

    /// Creates a composite scope, made of an explicit receiver and this scope as lexical parent.
    fn clone_scope_with(&self, universe: &Universe, receiver: &ObjectRef) -> ObjectRef;

    /// Binds a variable in this very scope.
    fn declare(&self, key: Key, value: Value) -> Result<()>;

    /// Reads a variable, through the whole scope chain.
    fn lookup(&self, key: &Key) -> Result<Value>;

    /// Writes an already declared variable, in the scope (or receiver) that binds it.
    fn assign(&self, key: Key, value: Value) -> Result<()>;
}

impl Scope for ObjectRef {
    fn clone_scope(&self, universe: &Universe) -> ObjectRef {
        universe.allocate(ObjectKind::Scope, vec![self.clone()])
    }

    fn clone_scope_with(&self, universe: &Universe, receiver: &ObjectRef) -> ObjectRef {
        universe.allocate(ObjectKind::Scope, vec![receiver.clone(), self.clone()])
    }

    fn declare(&self, key: Key, value: Value) -> Result<()> {
        self.set_attribute(key, value)
    }

    fn lookup(&self, key: &Key) -> Result<Value> {
        self.get_attribute(key)
            .ok_or_else(|| Error::ReferenceError(key.as_str().map(String::from)))
    }

    fn assign(&self, key: Key, value: Value) -> Result<()> {
        if self.has_own_attribute(&key) {
            return self.set_attribute(key, value);
        }
        let owner = self
            .resolution_order()
            .into_iter()
            .find(|ancestor| ancestor.has_own_attribute(&key));
        match owner {
            Some(owner) => owner.set_attribute(key, value),
            None => Err(Error::ReferenceError(key.as_str().map(String::from))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Payload;

    #[test]
    fn clones_chain_to_their_parent() {
        let universe = Universe::new();
        let parent = universe.core.root_scope.clone_scope(&universe);
        let child = parent.clone_scope(&universe);

        let prototypes = child.prototypes();
        assert_eq!(prototypes.len(), 1);
        assert!(prototypes[0].ptr_eq(&parent));
        assert!(child.is_instance_of(&universe.core.root_scope));
        assert!(child.is_instance_of(&universe.core.object));
    }

    #[test]
    fn assignment_targets_the_binding_scope() {
        let universe = Universe::new();
        let parent = universe.core.root_scope.clone_scope(&universe);
        let child = parent.clone_scope(&universe);

        parent.declare(universe.key("x"), universe.integer(1)).unwrap();
        child.assign(universe.key("x"), universe.integer(2)).unwrap();

        assert!(!child.has_own_attribute(&universe.key("x")));
        assert_eq!(
            parent.lookup(&universe.key("x")).unwrap().payload(),
            Payload::Integer(2)
        );

        let err = child.assign(universe.key("y"), universe.integer(3)).unwrap_err();
        assert_eq!(err.to_string(), "ReferenceError: 'y' is not defined");
    }

    #[test]
    fn built_ins_cannot_be_reassigned() {
        let universe = Universe::new();
        let scope = universe.core.root_scope.clone_scope(&universe);

        let err = scope
            .assign(universe.key("Object"), universe.integer(0))
            .unwrap_err();
        assert_eq!(err.kind_name(), "OperationNotSupported");

        // shadowing them is fine though.
        scope.declare(universe.key("Object"), universe.integer(0)).unwrap();
        assert_eq!(
            scope.lookup(&universe.key("Object")).unwrap().payload(),
            Payload::Integer(0)
        );
    }

    #[test]
    fn receiver_attributes_come_before_the_lexical_parent() {
        let universe = Universe::new();
        let parent = universe.core.root_scope.clone_scope(&universe);
        parent.declare(universe.key("x"), universe.integer(1)).unwrap();
        parent.declare(universe.key("y"), universe.integer(2)).unwrap();

        let receiver = universe.new_object();
        receiver
            .set_attribute(universe.key("x"), universe.integer(10))
            .unwrap();

        let activation = parent.clone_scope_with(&universe, &receiver);
        assert!(activation.is_composite());
        assert_eq!(
            activation.lookup(&universe.key("x")).unwrap().payload(),
            Payload::Integer(10)
        );
        assert_eq!(
            activation.lookup(&universe.key("y")).unwrap().payload(),
            Payload::Integer(2)
        );

        // writes through a receiver binding land on the receiver.
        activation
            .assign(universe.key("x"), universe.integer(11))
            .unwrap();
        assert_eq!(
            receiver.get_own_attribute(&universe.key("x")).unwrap().payload(),
            Payload::Integer(11)
        );
    }
}
