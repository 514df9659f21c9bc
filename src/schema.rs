//! Schema Layer — validates skill inputs/outputs against declared
//! JSON-Schema-like descriptors and exposes them for discovery.
//!
//! Schemas are carried as raw [`serde_json::Value`] rather than a typed
//! Rust shape, because skill authors declare them as data (JSON Schema
//! documents), not as compile-time types. Validation is delegated to
//! `jsonschema`, which both validates and enumerates issues.

use jsonschema::Validator;
use serde_json::Value;

use crate::error::Issue;

/// A compiled schema descriptor.
///
/// Compilation happens once, at [`Schema::compile`] time (typically when
/// a skill is registered), not on every `validate` call.
pub struct Schema {
    raw: Value,
    validator: Validator,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").field("raw", &self.raw).finish()
    }
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        // Re-compile from the raw descriptor; `jsonschema::Validator` is
        // not `Clone`. The descriptor already compiled once, so this
        // cannot fail.
        Self::compile(self.raw.clone()).expect("schema re-compiled from a previously-valid descriptor")
    }
}

impl Schema {
    /// Compile a JSON-Schema-like descriptor.
    ///
    /// Returns an error if the descriptor itself is not a valid JSON
    /// Schema document (this is a setup-time error, distinct from a
    /// validation failure of a *value* against the schema).
    pub fn compile(raw: Value) -> Result<Self, String> {
        let validator = jsonschema::validator_for(&raw).map_err(|e| e.to_string())?;
        Ok(Self { raw, validator })
    }

    /// Validate `value` against this schema.
    ///
    /// Returns the value unchanged on success (the contract allows a
    /// validator to canonicalize, but this implementation has no
    /// canonicalization step beyond what JSON Schema's `default`
    /// keyword already performs via `jsonschema`) or a list of issues.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Issue>> {
        let issues: Vec<Issue> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                Issue::new(
                    e.instance_path.to_string(),
                    e.kind.to_string(),
                    e.to_string(),
                )
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Render this schema as a portable JSON-Schema-like object for
    /// discovery (agent card, `/entrypoints`).
    ///
    /// The descriptor is already JSON-Schema shaped, so this is the
    /// identity function — kept as a named method because the contract
    /// calls for one, and a future schema representation (e.g. a
    /// compact internal form) would need this seam.
    pub fn to_portable(&self) -> Value {
        self.raw.clone()
    }
}
