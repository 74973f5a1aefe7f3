//! Cached entity definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sex of a student, serialized as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Man,
    Woman,
}

impl Sex {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Man => "man",
            Sex::Woman => "woman",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student record as returned by the record source.
///
/// Students carry no identity field; two records are equal when all of
/// their fields are equal. Fields are private so a record cannot change
/// once it has been built.
///
/// # Example
///
/// ```
/// use herdcache_core::{Sex, Student};
///
/// let student = Student::new("zhangsan1", 23, Sex::Man);
/// assert_eq!(student.name(), "zhangsan1");
/// assert_eq!(student.age(), 23);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Student {
    name: String,
    age: u32,
    sex: Sex,
}

impl Student {
    /// Creates a new student record.
    pub fn new(name: impl Into<String>, age: u32, sex: Sex) -> Self {
        Self {
            name: name.into(),
            age,
            sex,
        }
    }

    /// Returns the student name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the student age.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Returns the student sex.
    pub fn sex(&self) -> Sex {
        self.sex
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.name, self.age, self.sex)
    }
}
