pub(crate) mod attempt;
pub(crate) mod exam;
pub(crate) mod report;
