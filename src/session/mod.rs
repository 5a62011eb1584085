pub(crate) mod controller;
pub(crate) mod proctor;
pub(crate) mod runtime;
pub(crate) mod timer;
