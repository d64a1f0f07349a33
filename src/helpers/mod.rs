//! Low-level helpers shared by the decoders and the engine.
pub(crate) mod string;
pub(crate) mod xml;
pub(crate) mod zip;
