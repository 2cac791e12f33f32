//! Parameter space definitions and Cartesian grid expansion.

use gs_types::{ConfigurationError, ParameterValue};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single parameter dimension: a name and its ordered candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAxis {
    pub name: String,
    /// Candidate values in sweep order. A single value means "fixed".
    pub values: Vec<ParameterValue>,
}

impl ParameterAxis {
    pub fn is_fixed(&self) -> bool {
        self.values.len() == 1
    }
}

/// The full parameter space, in declaration order.
///
/// Declaration order matters: grid expansion is an odometer in which the
/// last-declared parameter varies fastest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSpace {
    parameters: Vec<ParameterAxis>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Add (or replace) a parameter with the given candidate values.
    pub fn add<V>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ParameterValue>,
    {
        self.insert(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Add a parameter with exactly one candidate value.
    pub fn add_fixed(self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.add(name, [value.into()])
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<ParameterValue>) {
        let name = name.into();
        match self.parameters.iter_mut().find(|axis| axis.name == name) {
            Some(axis) => axis.values = values,
            None => self.parameters.push(ParameterAxis { name, values }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[ParameterValue]> {
        self.parameters
            .iter()
            .find(|axis| axis.name == name)
            .map(|axis| axis.values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn axes(&self) -> &[ParameterAxis] {
        &self.parameters
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|axis| axis.name.as_str())
    }

    /// Names of the parameters that actually vary (more than one candidate).
    pub fn swept_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|axis| axis.values.len() > 1)
            .map(|axis| axis.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Total number of grid points, or `None` if the product overflows.
    pub fn grid_size(&self) -> Option<usize> {
        let mut total: usize = 1;
        for axis in &self.parameters {
            total = total.checked_mul(axis.values.len())?;
        }
        Some(total)
    }

    /// Lazily expand the Cartesian product. Calling this again restarts the
    /// expansion from the first grid point.
    pub fn grid(&self) -> GridIter<'_> {
        GridIter::new(self)
    }
}

impl<'a> IntoIterator for &'a ParameterSpace {
    type Item = GridPoint;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.grid()
    }
}

impl Serialize for ParameterSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parameters.len()))?;
        for axis in &self.parameters {
            map.serialize_entry(&axis.name, &axis.values)?;
        }
        map.end()
    }
}

/// Either a list of candidates or a bare scalar (shorthand for a fixed value).
#[derive(Deserialize)]
#[serde(untagged)]
enum Candidates {
    Many(Vec<ParameterValue>),
    One(ParameterValue),
}

impl<'de> Deserialize<'de> for ParameterSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpaceVisitor;

        impl<'de> Visitor<'de> for SpaceVisitor {
            type Value = ParameterSpace;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to candidate value lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut space = ParameterSpace::new();
                while let Some((name, candidates)) = map.next_entry::<String, Candidates>()? {
                    if space.contains(&name) {
                        return Err(de::Error::custom(format!("duplicate parameter '{name}'")));
                    }
                    let values = match candidates {
                        Candidates::Many(values) => values,
                        Candidates::One(value) => vec![value],
                    };
                    space.parameters.push(ParameterAxis { name, values });
                }
                Ok(space)
            }
        }

        deserializer.deserialize_map(SpaceVisitor)
    }
}

// ---------------------------------------------------------------------------
// Grid points
// ---------------------------------------------------------------------------

/// One concrete assignment of a value to every parameter in the space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridPoint {
    entries: Vec<(String, ParameterValue)>,
}

impl GridPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ParameterValue)> for GridPoint {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for GridPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Odometer over a [`ParameterSpace`]; the last axis varies fastest.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    space: &'a ParameterSpace,
    indices: Vec<usize>,
    remaining: usize,
}

impl<'a> GridIter<'a> {
    fn new(space: &'a ParameterSpace) -> Self {
        Self {
            space,
            indices: vec![0; space.parameters.len()],
            remaining: space.grid_size().unwrap_or(usize::MAX),
        }
    }
}

impl Iterator for GridIter<'_> {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.remaining == 0 {
            return None;
        }

        let point = self
            .space
            .parameters
            .iter()
            .zip(&self.indices)
            .map(|(axis, &i)| (axis.name.clone(), axis.values[i].clone()))
            .collect();

        for (slot, axis) in self.indices.iter_mut().zip(&self.space.parameters).rev() {
            *slot += 1;
            if *slot < axis.values.len() {
                break;
            }
            *slot = 0;
        }
        self.remaining -= 1;

        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

// ---------------------------------------------------------------------------
// Auxiliary values
// ---------------------------------------------------------------------------

/// Values available to templates and naming patterns that are not part of a
/// grid point's identity: fixed values and linked (derived) parameters.
///
/// Lookup order is grid point, then links, then fixed values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuxiliaryValues {
    fixed: Vec<(String, ParameterValue)>,
    links: Vec<(String, String)>,
}

impl AuxiliaryValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.fixed.push((name.into(), value.into()));
        self
    }

    /// Make `alias` resolve to whatever value `target` has in each grid point.
    pub fn with_link(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.links.push((alias.into(), target.into()));
        self
    }

    pub fn lookup<'a>(&'a self, point: &'a GridPoint, name: &str) -> Option<&'a ParameterValue> {
        point
            .get(name)
            .or_else(|| {
                self.links
                    .iter()
                    .find(|(alias, _)| alias == name)
                    .and_then(|(_, target)| point.get(target))
            })
            .or_else(|| {
                self.fixed
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value)
            })
    }

    /// Check links against the space they will be resolved in.
    pub fn validate(&self, space: &ParameterSpace) -> Result<(), ConfigurationError> {
        for (alias, target) in &self.links {
            if space.contains(alias) {
                return Err(ConfigurationError::InvalidParameter {
                    name: alias.clone(),
                    message: "a linked parameter cannot also be swept".to_string(),
                });
            }
            if !space.contains(target) {
                return Err(ConfigurationError::InvalidParameter {
                    name: alias.clone(),
                    message: format!("linked to unknown parameter '{target}'"),
                });
            }
        }
        Ok(())
    }

    /// Fixed values shadowed by a parameter of the same name.
    pub fn shadowed_by<'a>(&'a self, space: &'a ParameterSpace) -> impl Iterator<Item = &'a str> {
        self.fixed
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(move |name| space.contains(name))
    }
}
