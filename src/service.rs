// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Named singleton services, reachable by name from the inspector (§6.6).

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{EcsError, Result};

/// Implemented by services that want to expose a handful of callable methods to the inspector,
/// without requiring every consumer to downcast to the concrete type.
pub trait InvocableService: Send + Sync {
    fn invoke(&self, method: &str, args: Value) -> Result<Value>;
}

struct Entry {
    owner: String,
    service: Box<dyn Any + Send + Sync>,
    invocable: Option<Box<dyn Fn(&(dyn Any + Send + Sync), &str, Value) -> Result<Value> + Send + Sync>>,
}

#[derive(Debug, Clone)]
pub struct ServiceSummary {
    pub name: String,
    pub owner: String,
}

/// Plugin-populated registry of named singletons (§6.6).
#[derive(Default)]
pub struct ServiceTable {
    entries: HashMap<String, Entry>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain singleton, not reachable through `invoke`.
    pub fn register<T: Any + Send + Sync>(&mut self, name: impl Into<String>, owner: impl Into<String>, service: T) {
        self.entries.insert(
            name.into(),
            Entry {
                owner: owner.into(),
                service: Box::new(service),
                invocable: None,
            },
        );
    }

    /// Registers a singleton that also implements `InvocableService`, making it reachable
    /// through `invoke`.
    pub fn register_invocable<T: Any + InvocableService>(
        &mut self,
        name: impl Into<String>,
        owner: impl Into<String>,
        service: T,
    ) {
        self.entries.insert(
            name.into(),
            Entry {
                owner: owner.into(),
                service: Box::new(service),
                invocable: Some(Box::new(|any, method, args| {
                    any.downcast_ref::<T>()
                        .expect("service type matches its registration")
                        .invoke(method, args)
                })),
            },
        );
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.service.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)?.service.downcast_mut::<T>()
    }

    pub fn invoke(&self, name: &str, method: &str, args: Value) -> Result<Value> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EcsError::InvalidArgument(format!("unknown service `{name}`")))?;
        let dispatch = entry
            .invocable
            .as_ref()
            .ok_or_else(|| EcsError::InvalidArgument(format!("service `{name}` is not invocable")))?;
        dispatch(entry.service.as_ref(), method, args)
    }

    pub fn list_services(&self) -> Vec<ServiceSummary> {
        let mut list: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| ServiceSummary {
                name: name.clone(),
                owner: entry.owner.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }
}
