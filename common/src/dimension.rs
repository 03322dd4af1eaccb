//! Dimension assignments identify a single experiment: one value for every
//! configured dimension. Their keys group rows, and since dimension values
//! end up in file names they are restricted to `[A-Za-z0-9/_-]`.

use std::{fmt, rc::Rc};

use itertools::Itertools;

use crate::error::{Error, Result};

const KEY_SEPARATOR: &str = ",";

fn is_permitted_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
}

/// Ordered list of dimension names. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    names: Rc<[String]>,
}

impl Dimensions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::<String>::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The same dimensions with the one at `index` left out.
    pub fn without(&self, index: usize) -> Self {
        Self::new(
            self.names
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, name)| name.clone()),
        )
    }

    pub fn assignment(&self) -> DimensionAssignment {
        DimensionAssignment {
            dimensions: self.clone(),
            values: vec![None; self.len()],
        }
    }

    /// Reverses [`DimensionAssignment::key`].
    pub fn parse_key(&self, key: &DimensionKey) -> Result<DimensionAssignment> {
        let mut assignment = self.assignment();
        if self.is_empty() && key.0.is_empty() {
            return Ok(assignment);
        }

        let parts: Vec<&str> = key.0.split(KEY_SEPARATOR).collect();
        if parts.len() != self.len() {
            return Err(Error::KeyMismatch {
                key: key.0.clone(),
                parts: parts.len(),
                expected: self.len(),
            });
        }
        for (name, value) in self.names.iter().zip(parts) {
            assignment.assign(name, value)?;
        }
        Ok(assignment)
    }
}

/// Grouping key of a fully assigned [`DimensionAssignment`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DimensionKey(String);

impl DimensionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionAssignment {
    dimensions: Dimensions,
    values: Vec<Option<String>>,
}

impl DimensionAssignment {
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn assign(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if !is_permitted_value(&value) {
            return Err(Error::InvalidDimensionValue(value));
        }
        let index = self
            .dimensions
            .position(name)
            .ok_or_else(|| Error::UnknownDimension(name.to_owned()))?;
        self.values[index] = Some(value);
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.dimensions
            .position(name)
            .and_then(|i| self.values[i].as_deref())
    }

    /// `(name, value)` pairs in dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.dimensions
            .names()
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn key(&self) -> Result<DimensionKey> {
        let values = self
            .iter()
            .map(|(name, value)| value.ok_or_else(|| Error::Unassigned(name.to_owned())))
            .collect::<Result<Vec<_>>>()?;
        Ok(DimensionKey(values.join(KEY_SEPARATOR)))
    }

    /// `name=value, name=value`, used for chart titles.
    pub fn combined(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}={}", value.unwrap_or_default()))
            .join(", ")
    }

    /// [`Self::combined`] without `,` and `/` so it can be used as a file name.
    pub fn combined_path(&self) -> String {
        self.combined().replace([',', '/'], "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimensions() -> Dimensions {
        Dimensions::new(["machine", "use_buffer", "connection_type"])
    }

    fn assignment(values: [&str; 3]) -> DimensionAssignment {
        let dims = dimensions();
        let mut assignment = dims.assignment();
        for (name, value) in dims.names().iter().zip(values) {
            assignment.assign(name, value).unwrap();
        }
        assignment
    }

    #[test]
    fn rejects_unsafe_values() {
        let mut assignment = dimensions().assignment();
        for value in ["", "a b", "a,b", "../x;", "é"] {
            assert!(
                matches!(
                    assignment.assign("machine", value),
                    Err(Error::InvalidDimensionValue(_))
                ),
                "value {value:?}"
            );
        }
        assignment.assign("machine", "file_/dev/zero-1").unwrap();
    }

    #[test]
    fn rejects_unknown_dimension() {
        let mut assignment = dimensions().assignment();
        assert!(matches!(
            assignment.assign("colour", "red"),
            Err(Error::UnknownDimension(name)) if name == "colour"
        ));
    }

    #[test]
    fn key_requires_every_value() {
        let mut assignment = dimensions().assignment();
        assignment.assign("machine", "m1").unwrap();
        assert!(matches!(
            assignment.key(),
            Err(Error::Unassigned(name)) if name == "use_buffer"
        ));
    }

    #[test]
    fn identical_values_give_identical_keys() {
        let a = assignment(["m1", "true", "unix"]);
        let b = assignment(["m1", "true", "unix"]);
        let c = assignment(["m1", "false", "unix"]);
        assert_eq!(a.key().unwrap(), b.key().unwrap());
        assert_ne!(a.key().unwrap(), c.key().unwrap());
        assert_eq!(a.key().unwrap().as_str(), "m1,true,unix");
    }

    #[test]
    fn key_round_trip() {
        let dims = dimensions();
        for values in [
            ["m1", "true", "unix"],
            ["intel_i5", "false", "file_/dev/zero"],
            ["a-b", "0", "TCP"],
        ] {
            let original = assignment(values);
            let parsed = dims.parse_key(&original.key().unwrap()).unwrap();
            assert_eq!(parsed, original);
        }
    }

    #[test]
    fn parse_key_wrong_arity() {
        let err = Dimensions::new(["a", "b"])
            .parse_key(&assignment(["m1", "true", "unix"]).key().unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::KeyMismatch {
                parts: 3,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn empty_dimensions() {
        let dims = Dimensions::new(Vec::<String>::new());
        let key = dims.assignment().key().unwrap();
        assert_eq!(key.as_str(), "");
        assert_eq!(dims.parse_key(&key).unwrap(), dims.assignment());
    }

    #[test]
    fn combined_rendering() {
        let assignment = assignment(["m1", "true", "file_/dev/zero"]);
        assert_eq!(
            assignment.combined(),
            "machine=m1, use_buffer=true, connection_type=file_/dev/zero"
        );
        assert_eq!(
            assignment.combined_path(),
            "machine=m1_ use_buffer=true_ connection_type=file__dev_zero"
        );
        assert_eq!(assignment.value("use_buffer"), Some("true"));
    }

    #[test]
    fn without_drops_one_name() {
        let dims = dimensions().without(1);
        assert_eq!(dims.names(), ["machine", "connection_type"]);
    }
}
