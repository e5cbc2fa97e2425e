pub mod face;
pub mod storage;
