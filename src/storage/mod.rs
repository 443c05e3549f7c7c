mod catalog;

pub(crate) use catalog::*;
