//! 消融实验.

pub mod cleaning;
pub mod qa_imt;
