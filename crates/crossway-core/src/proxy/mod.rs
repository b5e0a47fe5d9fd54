//! Guest-visible handles for foreign classes and objects

pub mod class;
pub mod object;
pub mod table;

pub use class::{GuestMethod, ProxyClass};
pub use object::ProxyObject;
pub use table::ClassTable;
