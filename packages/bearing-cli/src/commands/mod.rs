pub mod analyze;
pub mod design;
pub mod validate;
