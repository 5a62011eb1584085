pub(crate) mod availability;
pub(crate) mod exam_loader;
pub(crate) mod report;
pub(crate) mod scoring;
