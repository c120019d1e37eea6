pub mod collaborators;
pub mod conflict;
pub mod lifecycle;
pub mod validation;
