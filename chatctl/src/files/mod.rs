//! File attachment lifecycle: staging, storage strategies, metadata records
//! and the service tying them together.

pub mod id;
pub mod openai;
pub mod records;
pub mod service;
pub mod staged;
pub mod storage;
