pub mod modifier_names;

pub use modifier_names::ModifierNames;
