use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! backend_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

backend_id!(
    /// Test identifier assigned by the tests backend.
    TestId
);
backend_id!(QuestionId);
backend_id!(AnswerId);
backend_id!(
    /// Employee reference; employees are owned by the external backend.
    EmployeeId
);
backend_id!(ResultId);
