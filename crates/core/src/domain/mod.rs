pub mod contact;
pub mod product;
pub mod quote;
