pub mod ev;
pub mod export;
pub mod npy;
