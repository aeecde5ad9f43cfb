pub mod font;
pub mod paginate;
pub mod wrap;
