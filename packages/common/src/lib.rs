//! Blob storage shared by the depot server and its tooling.

pub mod storage;
