pub mod branch;
pub mod document;
pub mod employee;
pub mod user;

pub use branch::Branch;
pub use document::{document_columns, Document, OwnerKind};
pub use employee::Employee;
pub use user::User;
