//! Field schemas and type-aware comparison.
//!
//! A [`FieldSchema`] describes one configuration field: its document
//! name, its remote wire name, its declared type, and its flags. The
//! schema knows how to decide whether a local (desired) value differs
//! from a remote (actual) value, coercing both sides to the declared
//! type first.

use crate::error::Error;
use crate::value::Value;

/// Declared type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    /// Write-once credential. Never compared by plain equality against
    /// a remote that masks stored secrets.
    Secret,
    /// Unordered set of strings; order is not semantically meaningful.
    StringSet,
    /// Ordered list of strings; order is semantically meaningful.
    StringList,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "string",
            Self::Secret => "secret",
            Self::StringSet => "set",
            Self::StringList => "list",
        }
    }
}

/// Default value for a field, materialized when the document omits it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'static str),
    EmptySet,
    EmptyList,
}

impl FieldDefault {
    pub fn materialize(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(b),
            Self::Int(i) => Value::Int(i),
            Self::Float(f) => Value::Float(f),
            Self::Text(s) => Value::Text(s.to_string()),
            Self::EmptySet => Value::StringSet(Default::default()),
            Self::EmptyList => Value::StringList(Vec::new()),
        }
    }
}

/// Outcome of comparing a local value against a remote value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Unchanged,
    /// The remote must be updated to this (canonicalized) value.
    Changed(Value),
}

impl FieldChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Schema descriptor for one configuration field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Name in the desired-state document.
    pub name: &'static str,
    /// Name in the remote API representation.
    pub wire: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    /// Must be present in the document (no default applies).
    pub required: bool,
    /// Local `null` and remote absence are equivalent; a local `null`
    /// against a remote value requests an unset.
    pub nullable: bool,
    /// Secret fields only: always push the local value, even when the
    /// remote claims to hold one.
    pub force_update: bool,
    /// Lives in the remote resource's `fields` array rather than as a
    /// top-level attribute.
    pub wire_field: bool,
}

impl FieldSchema {
    pub fn new(name: &'static str, wire: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire,
            kind,
            default: FieldDefault::Null,
            required: false,
            nullable: false,
            force_update: false,
            wire_field: false,
        }
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn force_update(mut self) -> Self {
        self.force_update = true;
        self
    }

    /// Mark this field as living in the remote `fields` array.
    pub fn in_fields(mut self) -> Self {
        self.wire_field = true;
        self
    }

    pub fn is_secret(&self) -> bool {
        self.kind == FieldKind::Secret
    }

    /// Compare a local (desired) value against a remote (actual) value.
    ///
    /// Pure; no side effects. Fails with [`Error::TypeMismatch`] when
    /// the two representations cannot be coerced to the declared type.
    pub fn compare(&self, local: &Value, remote: &Value) -> Result<FieldChange, Error> {
        if self.is_secret() {
            return Ok(self.compare_secret(local, remote));
        }

        // Null handling is explicit: for nullable fields local null and
        // remote absence are the same state, and a local null against a
        // remote value requests an unset. Non-nullable fields are always
        // materialized from defaults at parse time, so a local null there
        // means "leave the remote value alone".
        match (local.is_null(), remote.is_null()) {
            (true, true) => return Ok(FieldChange::Unchanged),
            (true, false) => {
                return Ok(if self.nullable {
                    FieldChange::Changed(Value::Null)
                } else {
                    FieldChange::Unchanged
                });
            }
            (false, true) => {
                let local = self.coerce(local)?;
                // An absent collection and an empty collection are the
                // same remote state.
                let empty = matches!(&local, Value::StringSet(s) if s.is_empty())
                    || matches!(&local, Value::StringList(l) if l.is_empty());
                return Ok(if empty {
                    FieldChange::Unchanged
                } else {
                    FieldChange::Changed(local)
                });
            }
            (false, false) => {}
        }

        let local = self.coerce(local)?;
        let remote = self.coerce(remote)?;
        Ok(if local == remote {
            FieldChange::Unchanged
        } else {
            FieldChange::Changed(local)
        })
    }

    /// Secret comparison. The remote never reveals a stored secret, so
    /// equality is decided structurally:
    ///
    /// - blank local (null, empty, or the mask itself): nothing to
    ///   manage, unchanged;
    /// - blank remote: the secret has never been set, push it;
    /// - masked remote: the secret is stored but unreadable, assume
    ///   converged unless `force_update` is set;
    /// - revealed remote: ordinary string equality.
    fn compare_secret(&self, local: &Value, remote: &Value) -> FieldChange {
        let Some(local_text) = local.as_text() else {
            return FieldChange::Unchanged;
        };
        if local.is_blank() {
            return FieldChange::Unchanged;
        }
        if self.force_update {
            return FieldChange::Changed(Value::Text(local_text));
        }
        match remote.as_text() {
            None => FieldChange::Changed(Value::Text(local_text)),
            Some(remote_text) => {
                if remote_text.is_empty() {
                    FieldChange::Changed(Value::Text(local_text))
                } else if remote.is_blank() || remote_text == local_text {
                    FieldChange::Unchanged
                } else {
                    FieldChange::Changed(Value::Text(local_text))
                }
            }
        }
    }

    /// Coerce a value to this field's canonical representation.
    ///
    /// Also used by document parsing to validate values upstream of
    /// planning, so type errors surface against the document rather
    /// than against the remote.
    pub fn coerce(&self, value: &Value) -> Result<Value, Error> {
        let coerced = match self.kind {
            FieldKind::Bool => value.as_bool().map(Value::Bool),
            FieldKind::Int => value.as_i64().map(Value::Int),
            FieldKind::Float => value.as_f64().map(Value::Float),
            FieldKind::Text | FieldKind::Secret => value.as_text().map(Value::Text),
            FieldKind::StringSet => value.as_string_set().map(Value::StringSet),
            FieldKind::StringList => value.as_string_list().map(Value::StringList),
        };
        coerced.ok_or_else(|| Error::TypeMismatch {
            field: self.name.to_string(),
            expected: self.kind.name(),
            actual: value.type_name(),
        })
    }

    /// Render a value for logs and plan output, masking secrets.
    pub fn display(&self, value: &Value) -> String {
        if self.is_secret() && !value.is_blank() {
            crate::value::SECRET_PLACEHOLDER.to_string()
        } else {
            value.to_string()
        }
    }
}
