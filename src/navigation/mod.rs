pub mod lsq;
pub mod matrix;
pub mod solutions;
