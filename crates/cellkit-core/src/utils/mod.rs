pub mod cell_ref;
pub mod constants;
