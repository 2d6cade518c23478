pub mod recency_list;
pub mod robin_hood;

pub use recency_list::{NodeId, RecencyList};
pub use robin_hood::{IndexError, RobinHoodIndex, hash_key};
