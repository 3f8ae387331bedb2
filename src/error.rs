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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone)]
pub enum EcsError {
    /// Generation mismatch; caller holds a dead handle.
    StaleEntity,

    /// Component name not registered and not a known dynamic definition.
    UnknownComponentType(String),

    /// Dynamic component name collision.
    DuplicateName(String),

    /// Supplied payload cannot be coerced to the component's shape.
    TypeMismatch(String),

    /// Mutation attempted during active iteration of the affected rows.
    ConcurrentMutation,

    /// Entity id space or component type space saturated.
    CapacityExhausted {
        attempted: usize,
        capacity: usize,
    },

    /// Out-of-range driver inputs (negative dt, frames outside [1, 10_000], ...).
    InvalidArgument(String),

    /// System dependency cycle detected by the optional parallel-feasibility analysis.
    SystemCycleDetected,

    /// System not found by name.
    SystemNotFound(String),

    /// Serialization of the world into the neutral document failed.
    Serialization(String),

    /// Deserialization of the world from the neutral document failed.
    Deserialization(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::StaleEntity => write!(f, "entity handle is stale (generation mismatch)"),
            EcsError::UnknownComponentType(name) => {
                write!(f, "unknown component type: {name}")
            }
            EcsError::DuplicateName(name) => write!(f, "duplicate dynamic component name: {name}"),
            EcsError::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            EcsError::ConcurrentMutation => {
                write!(f, "mutation attempted during active iteration of the same rows")
            }
            EcsError::CapacityExhausted { attempted, capacity } => write!(
                f,
                "capacity exhausted: attempted {attempted}, capacity {capacity}"
            ),
            EcsError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EcsError::SystemCycleDetected => write!(f, "system dependency cycle detected"),
            EcsError::SystemNotFound(name) => write!(f, "system not found: {name}"),
            EcsError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            EcsError::Deserialization(msg) => write!(f, "deserialization error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
