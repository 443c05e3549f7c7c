mod download;
pub use download::*;

use serde::Serialize;
use std::ops::Deref;

// TaskId
//
// `source + "_" + id`. Not injective when either part contains an underscore
// ("a_b" + "c" and "a" + "b_c" collide); kept for compatibility with clients
// that already poll by this id.
#[derive(Eq, PartialEq, Clone, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(source: &str, id: &str) -> Self {
        TaskId(format!("{}_{}", source, id))
    }
}

impl Deref for TaskId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
