pub(crate) mod course_outcomes;
pub(crate) mod papers;
pub(crate) mod questions;
pub(crate) mod templates;
pub(crate) mod topics;
pub(crate) mod units;
