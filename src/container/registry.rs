//! Managed object registry.
//!
//! Holds the container's addressable objects and dispatches remote
//! invocations against them. Handlers run outside the registry lock so
//! a long-running operation (notably the shutdown sequence) cannot
//! block concurrent metadata queries.

use crate::config::types::{Result, RigError};
use crate::mgmt::protocol::{ObjectInfo, OperationInfo, ParamInfo};
use crate::mgmt::query::ObjectName;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type OperationHandler = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A managed object under construction: metadata plus the handlers
/// backing its operations.
pub struct ManagedObject {
    name: String,
    type_name: String,
    operations: Vec<OperationInfo>,
    handlers: HashMap<(String, usize), OperationHandler>,
}

impl ManagedObject {
    pub fn new(name: &ObjectName) -> Self {
        ManagedObject {
            name: name.to_string(),
            type_name: name.type_name().to_string(),
            operations: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Add an operation. `params` lists `(name, declared_type)` pairs;
    /// operations are distinguished by name and arity.
    pub fn with_operation(
        mut self,
        operation: &str,
        params: &[(&str, &str)],
        handler: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.operations.push(OperationInfo {
            name: operation.to_string(),
            params: params
                .iter()
                .map(|(name, param_type)| ParamInfo {
                    name: name.to_string(),
                    param_type: param_type.to_string(),
                })
                .collect(),
        });
        self.handlers
            .insert((operation.to_string(), params.len()), Box::new(handler));
        self
    }

    fn info(&self) -> ObjectInfo {
        ObjectInfo {
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            operations: self.operations.clone(),
        }
    }
}

#[derive(Default)]
pub struct ObjectRegistry {
    objects: Mutex<HashMap<String, Arc<ManagedObject>>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry::default()
    }

    pub fn register(&self, object: ManagedObject) -> Result<()> {
        let mut objects = self.objects.lock().expect("registry lock poisoned");
        let name = object.name.clone();
        if objects.contains_key(&name) {
            return Err(RigError::Config(format!(
                "managed object [{}] already registered",
                name
            )));
        }
        log::info!("Registering managed object [{}]", name);
        objects.insert(name, Arc::new(object));
        Ok(())
    }

    pub fn unregister(&self, name: &str) {
        let mut objects = self.objects.lock().expect("registry lock poisoned");
        if objects.remove(name).is_some() {
            log::info!("Unregistered managed object [{}]", name);
        }
    }

    pub fn list(&self) -> Vec<ObjectInfo> {
        let objects = self.objects.lock().expect("registry lock poisoned");
        let mut infos: Vec<ObjectInfo> = objects.values().map(|o| o.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn describe(&self, name: &str) -> Option<ObjectInfo> {
        let objects = self.objects.lock().expect("registry lock poisoned");
        objects.get(name).map(|o| o.info())
    }

    /// Dispatch an invocation, matching the operation by name and
    /// parameter arity. The handler runs after the lock is released.
    pub fn invoke(&self, name: &str, operation: &str, params: &[Value]) -> Result<Value> {
        let object = {
            let objects = self.objects.lock().expect("registry lock poisoned");
            objects
                .get(name)
                .cloned()
                .ok_or_else(|| RigError::ObjectNotFound(name.to_string()))?
        };

        let handler = object
            .handlers
            .get(&(operation.to_string(), params.len()))
            .ok_or_else(|| RigError::OperationNotFound {
                object: name.to_string(),
                operation: operation.to_string(),
                arity: params.len(),
            })?;

        log::debug!("Invoking [{}] on [{}]", operation, name);
        handler(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_object() -> ManagedObject {
        ManagedObject::new(&ObjectName::new("rigbox", "Echo")).with_operation(
            "echo",
            &[("message", "string")],
            |params| Ok(params[0].clone()),
        )
    }

    #[test]
    fn test_register_and_describe() {
        let registry = ObjectRegistry::new();
        registry.register(echo_object()).unwrap();

        let info = registry.describe("rigbox:type=Echo").unwrap();
        assert_eq!(info.type_name, "Echo");
        assert_eq!(info.operations.len(), 1);
        assert_eq!(info.operations[0].signature(), vec!["string"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = ObjectRegistry::new();
        registry.register(echo_object()).unwrap();
        assert!(registry.register(echo_object()).is_err());
    }

    #[test]
    fn test_invoke_dispatches_to_handler() {
        let registry = ObjectRegistry::new();
        registry.register(echo_object()).unwrap();

        let result = registry
            .invoke("rigbox:type=Echo", "echo", &[json!("hello")])
            .unwrap();
        assert_eq!(result, json!("hello"));
    }

    #[test]
    fn test_invoke_with_wrong_arity_is_operation_not_found() {
        let registry = ObjectRegistry::new();
        registry.register(echo_object()).unwrap();

        let result = registry.invoke("rigbox:type=Echo", "echo", &[]);
        assert!(matches!(
            result,
            Err(RigError::OperationNotFound { arity: 0, .. })
        ));
    }

    #[test]
    fn test_invoke_on_unknown_object() {
        let registry = ObjectRegistry::new();
        let result = registry.invoke("rigbox:type=Missing", "noop", &[]);
        assert!(matches!(result, Err(RigError::ObjectNotFound(_))));
    }
}
