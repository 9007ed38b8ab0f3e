pub mod agency;
pub mod employee;
pub mod entity;
pub mod fields;
pub mod payroll;
pub mod summary;
pub mod title;
