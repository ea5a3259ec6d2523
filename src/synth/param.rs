/*
Parameter Model
===============

Every backend publishes its editable settings as a catalog of entries. Each
entry pairs a spec (dotted name, label, domain) with a typed getter and
setter on the backend itself:

    catalog.range("envelope.attack", "Attack (s)", 0.0, 2.0,
        |b| b.envelope().attack,
        |b, v| { let mut env = b.envelope(); env.attack = v; b.set_envelope(env) });

Values are always read through the getter, never cached, so anything that
changes the backend behind the catalog's back (a patch load, say) shows up
on the next read.

Range values are clamped to [min, max]. Non-finite numbers, a number for a
discrete entry, a choice for a range entry, and a choice outside the domain
are rejected with `InvalidParameterValue` and leave the backend untouched.
*/

use std::fmt;

use super::SynthError;

/// A parameter value as callers pass it in and read it back.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Choice(String),
    Number(f32),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Choice(_) => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(s) => Some(s),
            ParamValue::Number(_) => None,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Choice(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Choice(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Choice(s) => f.write_str(s),
            ParamValue::Number(v) => write!(f, "{v}"),
        }
    }
}

/// How a UI should present a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Discrete,
    Range,
}

/// Legal values. The variant fixes the control kind, so a discrete control
/// can never carry a numeric range or the other way round.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Finite ordered list of choices
    Discrete(Vec<String>),
    /// Inclusive numeric range, `min <= max`
    Range { min: f32, max: f32 },
}

impl Domain {
    pub fn control(&self) -> Control {
        match self {
            Domain::Discrete(_) => Control::Discrete,
            Domain::Range { .. } => Control::Range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Dotted path into the backend settings, e.g. `oscillator.type`
    pub name: String,
    pub description: String,
    pub domain: Domain,
}

impl ParamSpec {
    pub fn control(&self) -> Control {
        self.domain.control()
    }
}

/// A parameter as read at one moment: its spec plus the live value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub spec: ParamSpec,
    pub value: ParamValue,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn control(&self) -> Control {
        self.spec.control()
    }
}

enum Access<B> {
    Range {
        get: fn(&B) -> f32,
        set: fn(&mut B, f32),
    },
    Choice {
        get: fn(&B) -> String,
        set: fn(&mut B, &str) -> Result<(), SynthError>,
    },
}

struct Entry<B> {
    spec: ParamSpec,
    access: Access<B>,
}

impl<B> Entry<B> {
    fn read(&self, backend: &B) -> ParamValue {
        match &self.access {
            Access::Range { get, .. } => ParamValue::Number(get(backend)),
            Access::Choice { get, .. } => ParamValue::Choice(get(backend)),
        }
    }
}

/// The editable settings of one backend type `B`.
pub struct ParamCatalog<B> {
    entries: Vec<Entry<B>>,
}

impl<B> Default for ParamCatalog<B> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<B> ParamCatalog<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous parameter.
    ///
    /// # Panics
    /// If `min > max` or either bound is not finite.
    pub fn range(
        mut self,
        name: &str,
        description: &str,
        min: f32,
        max: f32,
        get: fn(&B) -> f32,
        set: fn(&mut B, f32),
    ) -> Self {
        assert!(
            min.is_finite() && max.is_finite() && min <= max,
            "range parameter {name:?} needs finite min <= max, got {min}..{max}"
        );
        self.entries.push(Entry {
            spec: ParamSpec {
                name: name.to_string(),
                description: description.to_string(),
                domain: Domain::Range { min, max },
            },
            access: Access::Range { get, set },
        });
        self
    }

    /// Add a discrete parameter. `set` only sees values from `values`.
    pub fn choice(
        mut self,
        name: &str,
        description: &str,
        values: Vec<String>,
        get: fn(&B) -> String,
        set: fn(&mut B, &str) -> Result<(), SynthError>,
    ) -> Self {
        self.entries.push(Entry {
            spec: ParamSpec {
                name: name.to_string(),
                description: description.to_string(),
                domain: Domain::Discrete(values),
            },
            access: Access::Choice { get, set },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn specs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.entries.iter().map(|e| &e.spec)
    }

    fn entry(&self, name: &str) -> Result<&Entry<B>, SynthError> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| SynthError::UnknownParameter {
                name: name.to_string(),
            })
    }

    /// Every parameter with its current value.
    pub fn read(&self, backend: &B) -> Vec<Parameter> {
        self.entries
            .iter()
            .map(|e| Parameter {
                spec: e.spec.clone(),
                value: e.read(backend),
            })
            .collect()
    }

    /// One parameter with its current value.
    pub fn value(&self, backend: &B, name: &str) -> Result<Parameter, SynthError> {
        let entry = self.entry(name)?;
        Ok(Parameter {
            spec: entry.spec.clone(),
            value: entry.read(backend),
        })
    }

    /// Validate `value` and write it through the setter. Returns the value
    /// actually applied (after clamping).
    pub fn apply(&self, backend: &mut B, name: &str, value: ParamValue) -> Result<ParamValue, SynthError> {
        let entry = self.entry(name)?;
        let invalid = || SynthError::InvalidParameterValue {
            name: name.to_string(),
            value: value.to_string(),
        };

        match (&entry.access, &entry.spec.domain, &value) {
            (Access::Range { set, .. }, Domain::Range { min, max }, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(invalid());
                }
                let clamped = v.clamp(*min, *max);
                set(backend, clamped);
                Ok(ParamValue::Number(clamped))
            }
            (Access::Choice { set, .. }, Domain::Discrete(values), ParamValue::Choice(choice)) => {
                if !values.iter().any(|v| v == choice) {
                    return Err(invalid());
                }
                set(backend, choice)?;
                Ok(value.clone())
            }
            _ => Err(invalid()),
        }
    }
}
