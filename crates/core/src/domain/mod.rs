pub mod campaign;
pub mod money;
pub mod product;
