//! String identifiers shared across the CIE and academic modules.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Department owning components, rule configurations, and batches.
    DepartmentId
);
identifier!(
    /// Enrolled student.
    StudentId
);
identifier!(
    /// Faculty/subject/student-set pairing that scopes assessment records.
    TeachingAssignmentId
);
identifier!(
    /// Gradable item definition.
    ComponentId
);
identifier!(
    /// Enrollment cohort.
    BatchId
);
identifier!(
    /// Section within a batch.
    SectionId
);
